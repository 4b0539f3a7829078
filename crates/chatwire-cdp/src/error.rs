//! Error types for the CDP layer.

use std::time::Duration;

use thiserror::Error;

/// Errors from the DevTools transport and Chrome process management.
#[derive(Error, Debug)]
pub enum CdpError {
    #[error("Failed to connect to DevTools at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("DevTools returned error {code}: {message}")]
    Devtools { code: i64, message: String },

    #[error("Command '{method}' timed out after {waited:?}")]
    CommandTimeout { method: String, waited: Duration },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JavaScript exception: {0}")]
    JsException(String),

    #[error("Chrome launch failed: {0}")]
    Launch(String),

    #[error("DevTools endpoint not ready after {waited:?}")]
    EndpointTimeout { waited: Duration },
}

impl From<CdpError> for chatwire_core::Error {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Launch(msg) => chatwire_core::Error::Chrome(msg),
            CdpError::EndpointTimeout { .. } => chatwire_core::Error::Chrome(err.to_string()),
            other => chatwire_core::Error::Browser(other.to_string()),
        }
    }
}
