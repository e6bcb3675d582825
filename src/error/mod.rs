use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;
pub mod validation;

pub use codes::{describe_error_code, ErrorCode};
pub use validation::{
    collect_into, validated, ComposeValidation, ValidationError, ValidationErrors, ValidationKind,
};

/// The unified error type for sm-composer
#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation failed with {count} issue(s):\n{errors}", count = .errors.len())]
    Validation { code: u16, errors: ValidationErrors },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Schedule error: {message}")]
    Schedule {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ComposerError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a configuration error with specific code and path
    pub fn config_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Wrap accumulated validation issues
    pub fn validation(errors: ValidationErrors) -> Self {
        Self::Validation {
            code: ErrorCode::VALIDATION_FAILED,
            errors,
        }
    }

    /// Create a storage error with default code
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            code: ErrorCode::STORAGE_GENERIC,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// A document that could not be serialized for output
    pub fn serialization(
        what: &str,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::storage_with_code(
            ErrorCode::STORAGE_SERIALIZATION_ERROR,
            format!("Cannot serialize {}: {}", what, err),
            None,
        )
        .with_source(err)
    }

    pub fn schedule(code: u16, message: impl Into<String>) -> Self {
        Self::Schedule {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Schedule { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::Validation { .. } => {}
        }
        self
    }

    /// Attach the file the error concerns
    pub fn with_path(mut self, new_path: impl Into<PathBuf>) -> Self {
        match &mut self {
            Self::Config { path, .. } | Self::Storage { path, .. } => {
                *path = Some(new_path.into());
            }
            _ => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Storage { message, .. }
            | Self::Schedule { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
            Self::Validation { .. } => {}
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Storage { .. } => 4,
            Self::Schedule { .. } => 5,
            Self::Validation { .. } => 8,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Validation { code, .. }
            | Self::Storage { code, .. }
            | Self::Schedule { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Validation issues carried by this error, if any
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, path, .. } => {
                if let Some(p) = path {
                    format!("Configuration problem in {}: {}", p.display(), message)
                } else {
                    format!("Configuration problem: {}", message)
                }
            }
            Self::Validation { errors, .. } => {
                format!(
                    "Configuration is invalid ({} issue(s)):\n{}",
                    errors.len(),
                    errors
                )
            }
            Self::Storage { message, path, .. } => {
                if let Some(p) = path {
                    format!("Storage error at {}: {}", p.display(), message)
                } else {
                    format!("Storage error: {}", message)
                }
            }
            Self::Schedule { message, .. } => format!("Schedule error: {}", message),
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut msg = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            msg.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        msg
    }
}

/// Type alias for Results using ComposerError
pub type Result<T> = std::result::Result<T, ComposerError>;

// Conversion from common error types

impl From<ValidationErrors> for ComposerError {
    fn from(errors: ValidationErrors) -> Self {
        ComposerError::validation(errors)
    }
}

impl From<std::io::Error> for ComposerError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => {
                (ErrorCode::STORAGE_PERMISSION_DENIED, "Permission denied")
            }
            ErrorKind::AlreadyExists => (ErrorCode::STORAGE_ALREADY_EXISTS, "Already exists"),
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        ComposerError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<serde_yaml::Error> for ComposerError {
    fn from(err: serde_yaml::Error) -> Self {
        ComposerError::config_with_code(
            ErrorCode::CONFIG_INVALID_YAML,
            format!("Invalid YAML: {}", err),
            None,
        )
        .with_source(err)
    }
}

impl From<serde_json::Error> for ComposerError {
    fn from(err: serde_json::Error) -> Self {
        ComposerError::config_with_code(
            ErrorCode::CONFIG_INVALID_JSON,
            format!("Invalid JSON: {}", err),
            None,
        )
        .with_source(err)
    }
}

impl From<toml::de::Error> for ComposerError {
    fn from(err: toml::de::Error) -> Self {
        ComposerError::config_with_code(
            ErrorCode::CONFIG_INVALID_TOML,
            format!("Invalid TOML: {}", err),
            None,
        )
        .with_source(err)
    }
}
