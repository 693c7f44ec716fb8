//! Configuration types for Trellis.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error types for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error validating configuration.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_yaml::Error),
}

/// Mode the application runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Production.
    Prod,
    /// Automated tests.
    Test,
    /// Local development.
    #[default]
    Dev,
}

impl RuntimeMode {
    /// Whether running in production.
    #[must_use]
    pub const fn is_prod(self) -> bool {
        matches!(self, Self::Prod)
    }

    /// Whether running under tests.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }

    /// Whether running in development.
    #[must_use]
    pub const fn is_dev(self) -> bool {
        matches!(self, Self::Dev)
    }
}

/// Trellis project configuration.
///
/// Stored in `.trellis/config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdapterConfig {
    /// Configuration version.
    #[serde(default = "default_config_version")]
    pub version: String,

    /// Runtime mode.
    #[serde(default)]
    pub mode: RuntimeMode,

    /// View settings.
    #[serde(default)]
    #[validate(nested)]
    pub views: ViewsConfig,

    /// Internationalization settings.
    #[serde(default)]
    #[validate(nested)]
    pub i18n: I18nConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_config_version() -> String {
    "1.0".to_string()
}

/// View settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ViewsConfig {
    /// Directory holding view templates.
    #[serde(default = "default_views_dir")]
    pub directory: String,

    /// File suffix of view templates.
    #[serde(default = "default_file_suffix")]
    #[validate(custom(function = "validate_file_suffix"))]
    pub file_suffix: String,

    /// Namespace used to discover error page overrides.
    #[serde(default = "default_namespace")]
    #[validate(length(min = 1))]
    pub namespace: String,

    /// Recompile views before every render. Only honored in dev mode.
    #[serde(default)]
    pub reload: Option<bool>,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            directory: default_views_dir(),
            file_suffix: default_file_suffix(),
            namespace: default_namespace(),
            reload: None,
        }
    }
}

fn default_views_dir() -> String {
    "templates".to_string()
}

fn default_file_suffix() -> String {
    ".trellis.html".to_string()
}

fn default_namespace() -> String {
    "views".to_string()
}

fn validate_file_suffix(suffix: &str) -> std::result::Result<(), ValidationError> {
    if suffix.len() > 1 && suffix.starts_with('.') {
        Ok(())
    } else {
        Err(ValidationError::new("file_suffix"))
    }
}

/// Internationalization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct I18nConfig {
    /// Supported language tags.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Language used when the request asks for none of the supported ones.
    #[serde(default = "default_language")]
    #[validate(length(min = 1))]
    pub default_language: String,

    /// YAML message bundle, keyed by language then message key.
    #[serde(default)]
    pub messages: Option<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            default_language: default_language(),
            messages: None,
        }
    }
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_language() -> String {
    "en".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AdapterConfig {
    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[tracing::instrument(skip(path))]
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    #[tracing::instrument(skip(self, path))]
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;

        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Create a default configuration.
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            version: default_config_version(),
            mode: RuntimeMode::default(),
            views: ViewsConfig::default(),
            i18n: I18nConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Whether views are recompiled before each render.
    ///
    /// Reloading defaults to on in dev mode and is never enabled otherwise.
    #[must_use]
    pub fn reload_enabled(&self) -> bool {
        self.mode.is_dev() && self.views.reload.unwrap_or(true)
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
