//! Error types for oc-images-core

use thiserror::Error;

/// Result type alias using oc-images-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for oc-images
///
/// Errors are `Clone` because memoized fetches store their outcome and hand
/// it to every caller that awaited the same fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Conflicting or missing inputs, detected before any backend call
    #[error("Usage error: {message}")]
    Usage { message: String },

    /// Assembly token that none of the assembly patterns recognise
    #[error("Unrecognized assembly '{token}'. Expected forms like 4.17.3, 4.18-rc.2, 4.17-art123 or 4.18-stream")]
    UnknownAssembly { token: String },

    /// The inspection backend failed (non-zero exit or spawn failure)
    #[error("Backend command `{command}` failed: {message}")]
    Backend { command: String, message: String },

    /// The backend answered with JSON lacking an expected key
    #[error("Malformed response from {context}: {message}")]
    MalformedResponse { context: String, message: String },

    /// Configuration could not be read or parsed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create an unknown assembly error
    pub fn unknown_assembly(token: impl Into<String>) -> Self {
        Self::UnknownAssembly {
            token: token.into(),
        }
    }

    /// Create a backend error for the given command line
    pub fn backend(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error was raised before any backend call was attempted
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. } | Self::UnknownAssembly { .. })
    }
}
