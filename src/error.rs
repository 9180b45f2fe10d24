use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
///
/// None of these abort a generation pass. Extraction failures disable the
/// offending plugin; configuration and I/O failures surface at the CLI boundary.
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    ConfigError(String),
    PluginError { plugin: String, message: String },
    ExtractionError(String),
    SerializationError(String),
}

impl Error {
    /// Shorthand used by extractors that reject an entry point.
    pub fn extraction(message: impl Into<String>) -> Self {
        Error::ExtractionError(message.into())
    }

    /// Shorthand used by plugins failing during registration.
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PluginError {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "parse error in {}: {}", file.display(), message)
            }
            Error::ConfigError(msg) => write!(f, "invalid configuration: {}", msg),
            Error::PluginError { plugin, message } => {
                write!(f, "plugin '{}' failed: {}", plugin, message)
            }
            Error::ExtractionError(msg) => write!(f, "extraction failed: {}", msg),
            Error::SerializationError(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML: {}", err))
    }
}

impl From<syn::Error> for Error {
    fn from(err: syn::Error) -> Self {
        Error::ParseError {
            file: PathBuf::from("<unknown>"),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plugin_error() {
        let err = Error::plugin("capture", "store unavailable");
        assert_eq!(err.to_string(), "plugin 'capture' failed: store unavailable");
    }

    #[test]
    fn test_io_error_has_source() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("I/O error"));
    }
}
