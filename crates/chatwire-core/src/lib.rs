//! Shared configuration, credentials, and error taxonomy for ChatWire.

pub mod config;
pub mod error;

pub use config::{Credentials, SessionConfig, WaitStrategy};
pub use error::{Error, Result};
