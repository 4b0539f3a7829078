//! Error types for ChatWire.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A DOM element lookup came up empty where one was required.
    ///
    /// Distinct from "element found but its text is empty": callers can tell
    /// a failed capture apart from a genuinely blank answer.
    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    /// The authenticated-ready element never became usable within the budget.
    #[error("Login did not reach ready state within {waited:?}")]
    LoginTimeout { waited: Duration },

    /// An expected login form field was absent from the identity-provider page.
    #[error("Login form field missing: {field}")]
    LoginFieldMissing { field: String },

    /// The response never stabilized (or never appeared) within the deadline.
    #[error("Response did not stabilize within {waited:?}")]
    ResponseTimeout { waited: Duration },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Chrome process error: {0}")]
    Chrome(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
