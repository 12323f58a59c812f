//! Error handling for the library's fallible edges.
//!
//! The settle-all core itself never fails: per-item failures are values. This
//! error type covers everything around it, such as loading configuration,
//! reading input files, and the HTTP fetch transform.

use std::fmt;
use std::time::Duration;

/// Main error type for settle-all operations outside the core map.
#[derive(Debug, Clone)]
pub enum SettleError {
    /// URL that cannot be requested
    InvalidUrl { url: String, reason: String },

    /// Network-related errors (connection, DNS, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// Server answered with a non-success status
    HttpStatus { url: String, status: u16 },

    /// JSON parsing errors
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Requested field is absent from a JSON document
    MissingField { url: String, field: String },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading input lists or config
    FileError { path: String, message: String },

    /// Timeout errors when operations take too long
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl SettleError {
    /// Create a new invalid URL error.
    pub fn invalid_url<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn http_status<U: Into<String>>(url: U, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    pub fn missing_field<U: Into<String>, F: Into<String>>(url: U, field: F) -> Self {
        Self::MissingField {
            url: url.into(),
            field: field.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short category name used when summarizing many rejections.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::NetworkError { .. } => "network",
            Self::HttpStatus { .. } => "http",
            Self::ParseError { .. } => "parse",
            Self::MissingField { .. } => "missing-field",
            _ => "other",
        }
    }
}

impl fmt::Display for SettleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url, reason } => {
                write!(f, "Invalid URL '{}': {}", url, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::HttpStatus { url, status } => {
                write!(f, "HTTP {} from '{}'", status, url)
            }
            Self::ParseError { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::MissingField { url, field } => {
                write!(f, "Field '{}' missing in response from '{}'", field, url)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for SettleError {}

// Implement From conversions for common error types
#[cfg(feature = "fetch")]
impl From<reqwest::Error> for SettleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if let Some(status) = err.status() {
            Self::http_status(
                err.url().map(|u| u.to_string()).unwrap_or_default(),
                status.as_u16(),
            )
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for SettleError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<std::io::Error> for SettleError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
