use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrismicError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Normalization failed at '{path}': {message}")]
    NormalizationError { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PrismicError {
    pub fn normalization(path: &[String], message: impl Into<String>) -> Self {
        PrismicError::NormalizationError {
            path: path.join("."),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PrismicError::HttpError(_) => ErrorCategory::Network,
            PrismicError::IoError(_) => ErrorCategory::Io,
            PrismicError::ConfigError { .. }
            | PrismicError::InvalidConfigValueError { .. }
            | PrismicError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PrismicError::SerializationError(_)
            | PrismicError::SchemaError { .. }
            | PrismicError::NormalizationError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PrismicError::HttpError(_) => ErrorSeverity::Medium,
            PrismicError::IoError(_) => ErrorSeverity::Critical,
            PrismicError::ConfigError { .. }
            | PrismicError::InvalidConfigValueError { .. }
            | PrismicError::MissingConfigError { .. } => ErrorSeverity::High,
            PrismicError::SerializationError(_)
            | PrismicError::SchemaError { .. }
            | PrismicError::NormalizationError { .. } => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PrismicError::HttpError(e) => format!("Could not download a remote asset: {}", e),
            PrismicError::IoError(e) => format!("File system error: {}", e),
            PrismicError::SerializationError(e) => format!("Invalid JSON input: {}", e),
            PrismicError::ConfigError { message } => format!("Bad configuration: {}", message),
            PrismicError::InvalidConfigValueError { field, reason, .. } => {
                format!("Option '{}' is invalid: {}", field, reason)
            }
            PrismicError::MissingConfigError { field } => {
                format!("Option '{}' is required", field)
            }
            PrismicError::SchemaError { message } => format!("Bad custom type schema: {}", message),
            PrismicError::NormalizationError { path, message } => {
                format!("Field '{}' could not be normalized: {}", path, message)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network access to the Prismic CDN and retry",
            ErrorCategory::Io => "Check that input files exist and the output directory is writable",
            ErrorCategory::Configuration => "Fix the plugin options in the TOML configuration file",
            ErrorCategory::Data => {
                "Make sure the documents and schemas were exported from the same repository"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PrismicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_error_joins_path() {
        let path = vec!["page".to_string(), "data".to_string(), "title".to_string()];
        let err = PrismicError::normalization(&path, "expected an array");
        assert_eq!(
            err.to_string(),
            "Normalization failed at 'page.data.title': expected an array"
        );
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = PrismicError::MissingConfigError {
            field: "plugin.repository_name".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("plugin.repository_name"));
    }
}
