use thiserror::Error;

/// Error taxonomy for the NUT client and the front ends.
///
/// Daemon-reported `ERR` codes map 1:1 onto dedicated variants so the REST
/// layer can translate them into HTTP status codes; codes this client does
/// not recognize fall back to [`ExporterError::Daemon`].
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("NUT connection failed: {0}")]
    ConnectionFailed(String),

    #[error("NUT {0} timed out")]
    Timeout(&'static str),

    #[error("malformed NUT response: {0}")]
    MalformedResponse(String),

    #[error("unknown UPS device: {0}")]
    DeviceNotFound(String),

    #[error("variable not supported: {0}")]
    VariableNotFound(String),

    #[error("access denied by NUT daemon: {0}")]
    AccessDenied(String),

    #[error("NUT daemon error: {code}")]
    Daemon { code: String },

    #[error("unknown NUT server: {0}")]
    ServerNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// True for failures where a fresh connection may succeed (single
    /// transparent retry in the client); daemon-reported errors and framing
    /// violations are not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExporterError::ConnectionFailed(_) | ExporterError::Timeout(_)
        )
    }
}

/// Non-fatal value-parsing issue attached to an individual [`Variable`].
///
/// The raw string the daemon sent is always preserved so callers can still
/// display it; a bad value never aborts the query it arrived in.
///
/// [`Variable`]: crate::nut::types::Variable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueIssue {
    #[error("value {raw:?} is not a number")]
    InvalidNumber { raw: String },

    #[error("value {raw:?} is not among the declared enum values")]
    UnexpectedEnumValue { raw: String },
}

pub type Result<T> = std::result::Result<T, ExporterError>;
