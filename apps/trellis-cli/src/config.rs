//! Configuration management for Trellis CLI.
//!
//! This module locates a project's `.trellis/config.yml` and turns it into
//! the collaborators a render needs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};
use trellis_core::Collaborators;
use trellis_core::config::{AdapterConfig, ConfigError};
use trellis_core::context::ASSETS_CONTROLLER;
use trellis_core::standalone::{ConfiguredLocales, EnglishRelativeTime, MessageBundle, StaticRouter};

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigLoadError>;

/// Error types for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Error loading configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ConfigError),

    /// Invalid project path.
    #[error("Invalid project path: {0}")]
    InvalidPath(PathBuf),

    /// Not a Trellis project (no .trellis directory).
    #[error("Not a Trellis project: {0} (missing .trellis directory)")]
    NotTrellisProject(PathBuf),
}

/// Configuration manager for Trellis CLI.
#[derive(Debug)]
pub struct ConfigManager {
    /// Project path.
    project_path: PathBuf,
    /// Loaded configuration.
    config: AdapterConfig,
}

impl ConfigManager {
    /// Get the configuration file path for a project.
    #[must_use]
    pub fn config_file_path(project_path: &Path) -> PathBuf {
        project_path.join(".trellis").join("config.yml")
    }

    /// Check if a directory is a Trellis project.
    #[must_use]
    pub fn is_trellis_project(project_path: &Path) -> bool {
        project_path.join(".trellis").is_dir()
    }

    /// Load configuration from a project directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    #[instrument(skip(project_path))]
    pub fn load(project_path: &Path) -> Result<Self> {
        if !project_path.exists() {
            return Err(ConfigLoadError::InvalidPath(project_path.to_path_buf()));
        }

        if !Self::is_trellis_project(project_path) {
            return Err(ConfigLoadError::NotTrellisProject(
                project_path.to_path_buf(),
            ));
        }

        let config_path = Self::config_file_path(project_path);
        if !config_path.exists() {
            return Err(ConfigLoadError::NotFound(config_path));
        }

        debug!("Loading configuration from {}", config_path.display());
        let config = AdapterConfig::load_from_file(&config_path)?;

        Ok(Self {
            project_path: project_path.to_path_buf(),
            config,
        })
    }

    /// Get the project path.
    #[must_use]
    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Get the views directory path.
    #[must_use]
    pub fn views_dir(&self) -> PathBuf {
        self.project_path.join(&self.config.views.directory)
    }

    /// Get the message bundle path, if one is configured.
    #[must_use]
    pub fn messages_path(&self) -> Option<PathBuf> {
        self.config
            .i18n
            .messages
            .as_ref()
            .map(|messages| self.project_path.join(messages))
    }

    /// Build the collaborators for a request mounted at `context_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured message bundle cannot be loaded.
    pub fn collaborators(&self, context_path: &str) -> Result<Collaborators> {
        let messages = match self.messages_path() {
            Some(path) => MessageBundle::load_from_file(&path)?,
            None => MessageBundle::new(),
        };
        let router = StaticRouter::new()
            .with_context_path(context_path)
            .route(ASSETS_CONTROLLER, "serveStatic", "/assets/{fileName: .*}")
            .route(ASSETS_CONTROLLER, "serveWebJars", "/webjars/{fileName: .*}");

        Ok(Collaborators {
            router: Arc::new(router),
            messages: Arc::new(messages),
            locales: Arc::new(ConfiguredLocales::new(
                self.config.i18n.languages.clone(),
                self.config.i18n.default_language.clone(),
            )),
            relative_time: Arc::new(EnglishRelativeTime),
            mode: self.config.mode,
        })
    }
}
