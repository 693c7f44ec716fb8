//! Error types for Trellis Core.
//!
//! Engines report failures as [`EngineError`]; the render pipeline normalizes
//! every one of them into a single [`RenderingFailure`] before handing it to
//! the framework's error handling.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error used as the underlying cause of a failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// One diagnostic produced while compiling templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostic {
    /// Human readable description.
    pub message: String,
    /// Template source file the diagnostic belongs to.
    pub template_file: PathBuf,
    /// Line within the template source, when the compiler could map it.
    pub template_line: Option<usize>,
    /// Compiled artifact the diagnostic was reported against.
    pub artifact: String,
    /// Line within the compiled artifact.
    pub artifact_line: Option<usize>,
}

impl fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.template_line {
            Some(line) => write!(
                f,
                "{} ({}:{})",
                self.message,
                self.template_file.display(),
                line
            ),
            None => write!(f, "{} ({})", self.message, self.artifact),
        }
    }
}

/// Failures raised by a template engine or by the propagation protocol.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Template source could not be parsed.
    #[error("{message}")]
    Parse {
        /// Parser message.
        message: String,
        /// Path of the template source.
        template_path: String,
        /// Line reported by the parser.
        line: Option<usize>,
        /// Underlying parser error.
        #[source]
        source: Option<BoxError>,
    },

    /// Templates failed to compile.
    #[error("{}", describe_diagnostics(.diagnostics))]
    Compile {
        /// All diagnostics, in the order they were reported.
        diagnostics: Vec<CompileDiagnostic>,
    },

    /// Valid template logic failed while executing.
    #[error("{message}")]
    Render {
        /// Error message.
        message: String,
        /// Directory or package the template lives in.
        template_path: String,
        /// Template name.
        template_name: String,
        /// Source line of the failing statement.
        line: Option<usize>,
        /// Underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// A caller broke the rendering contract.
    #[error("{0}")]
    Contract(String),

    /// The response sink could not be written.
    #[error("Failed to write rendered output: {0}")]
    Transport(#[source] std::io::Error),
}

impl EngineError {
    /// Create a contract violation.
    #[must_use]
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract(message.into())
    }
}

fn describe_diagnostics(diagnostics: &[CompileDiagnostic]) -> String {
    match diagnostics {
        [] => "Template compilation failed".to_string(),
        [first] => first.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Classification of a [`RenderingFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Template source malformed.
    Parse,
    /// Compilation of template logic failed.
    Compile,
    /// Execution of compiled template logic failed.
    Render,
    /// Unsupported renderable or missing context.
    ContractViolation,
    /// The response could not be written.
    Transport,
}

impl FailureKind {
    /// Title used when presenting the failure.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Parse => "Template parsing exception",
            Self::Compile => "Template compile exception",
            Self::Render => "Template rendering exception",
            Self::ContractViolation => "Template contract violation",
            Self::Transport => "Response write exception",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Normalized rendering error handed to the framework.
#[derive(Debug, Error)]
#[error("{}: {message}{}", .kind.title(), location(.source_path, .line))]
pub struct RenderingFailure {
    kind: FailureKind,
    message: String,
    source_path: Option<String>,
    line: Option<usize>,
    template: Option<String>,
    #[source]
    cause: Option<BoxError>,
}

fn location(source_path: &Option<String>, line: &Option<usize>) -> String {
    match (source_path, line) {
        (Some(path), Some(line)) => format!(" from {path} @line {line}"),
        (Some(path), None) => format!(" from {path}"),
        (None, _) => String::new(),
    }
}

impl RenderingFailure {
    /// Create a failure without location information.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source_path: None,
            line: None,
            template: None,
            cause: None,
        }
    }

    /// Attach the source artifact and line.
    #[must_use]
    pub fn at(mut self, source_path: impl Into<String>, line: Option<usize>) -> Self {
        self.source_path = Some(source_path.into());
        self.line = line;
        self
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn caused_by(mut self, cause: BoxError) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Record the template name the result resolved to.
    #[must_use]
    pub fn with_template(mut self, template: Option<String>) -> Self {
        self.template = template;
        self
    }

    /// Failure classification.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Title matching the classification.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Template or compiled artifact the failure points at.
    #[must_use]
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// 1-based line, if known.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        self.line
    }

    /// 1-based line, or `-1` when unknown.
    #[must_use]
    pub fn line_number(&self) -> i64 {
        self.line
            .and_then(|line| i64::try_from(line).ok())
            .unwrap_or(-1)
    }

    /// Template name recorded on the result, if any.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }
}

impl From<EngineError> for RenderingFailure {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Parse {
                message,
                template_path,
                line,
                source,
            } => {
                let failure = Self::new(FailureKind::Parse, message).at(template_path, line);
                match source {
                    Some(source) => failure.caused_by(source),
                    None => failure,
                }
            }
            EngineError::Compile { diagnostics } => {
                let message = describe_diagnostics(&diagnostics);
                let failure = Self::new(FailureKind::Compile, message);
                // only the first diagnostic is surfaced
                match diagnostics.into_iter().next() {
                    Some(first) if first.template_line.is_some() => failure.at(
                        first.template_file.display().to_string(),
                        first.template_line,
                    ),
                    Some(first) => failure.at(first.artifact, first.artifact_line),
                    None => failure,
                }
            }
            EngineError::Render {
                message,
                template_path,
                template_name,
                line,
                source,
            } => {
                let source_path = if template_path.is_empty() {
                    template_name
                } else {
                    format!("{template_path}/{template_name}")
                };
                let failure = Self::new(FailureKind::Render, message).at(source_path, line);
                match source {
                    Some(source) => failure.caused_by(source),
                    None => failure,
                }
            }
            EngineError::Contract(message) => Self::new(FailureKind::ContractViolation, message),
            EngineError::Transport(err) => {
                Self::new(FailureKind::Transport, err.to_string()).caused_by(Box::new(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(template_line: Option<usize>) -> CompileDiagnostic {
        CompileDiagnostic {
            message: "unexpected end of block".to_string(),
            template_file: PathBuf::from("/app/views/index.trellis.html"),
            template_line,
            artifact: "views/index.trellis.html#compiled".to_string(),
            artifact_line: Some(42),
        }
    }

    #[test]
    fn test_parse_failure_keeps_template_location() {
        let failure = RenderingFailure::from(EngineError::Parse {
            message: "unexpected token".to_string(),
            template_path: "views/index.trellis.html".to_string(),
            line: Some(3),
            source: None,
        });
        assert_eq!(failure.kind(), FailureKind::Parse);
        assert_eq!(failure.source_path(), Some("views/index.trellis.html"));
        assert_eq!(failure.line_number(), 3);
    }

    #[test]
    fn test_compile_failure_prefers_template_line() {
        let failure = RenderingFailure::from(EngineError::Compile {
            diagnostics: vec![diagnostic(Some(7)), diagnostic(None)],
        });
        assert_eq!(failure.kind(), FailureKind::Compile);
        assert_eq!(failure.source_path(), Some("/app/views/index.trellis.html"));
        assert_eq!(failure.line(), Some(7));
        assert!(failure.message().contains("and 1 more"));
    }

    #[test]
    fn test_compile_failure_falls_back_to_artifact() {
        let failure = RenderingFailure::from(EngineError::Compile {
            diagnostics: vec![diagnostic(None)],
        });
        assert_eq!(
            failure.source_path(),
            Some("views/index.trellis.html#compiled")
        );
        assert_eq!(failure.line(), Some(42));
    }

    #[test]
    fn test_render_failure_joins_path_and_name() {
        let failure = RenderingFailure::from(EngineError::Render {
            message: "undefined value".to_string(),
            template_path: "views".to_string(),
            template_name: "index.trellis.html".to_string(),
            line: Some(12),
            source: None,
        });
        assert_eq!(failure.source_path(), Some("views/index.trellis.html"));
        assert_eq!(
            failure.to_string(),
            "Template rendering exception: undefined value from views/index.trellis.html @line 12"
        );
    }

    #[test]
    fn test_unknown_line_sentinel() {
        let failure = RenderingFailure::from(EngineError::contract("no context"));
        assert_eq!(failure.kind(), FailureKind::ContractViolation);
        assert_eq!(failure.line_number(), -1);
        assert_eq!(failure.to_string(), "Template contract violation: no context");
    }
}
