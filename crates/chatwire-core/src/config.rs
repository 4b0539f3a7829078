//! Session configuration and credentials.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Account credentials for the interactive login fallback.
///
/// Held in process memory only; never serialized or persisted.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials from `CHATWIRE_EMAIL` / `CHATWIRE_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let email = std::env::var("CHATWIRE_EMAIL")
            .map_err(|_| Error::Config("CHATWIRE_EMAIL is not set".into()))?;
        let password = std::env::var("CHATWIRE_PASSWORD")
            .map_err(|_| Error::Config("CHATWIRE_PASSWORD is not set".into()))?;
        Ok(Self { email, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response-completion detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WaitStrategy {
    /// Poll while the streaming-indicator element is present; read once gone.
    StreamingIndicator,
    /// Accept the response once its text is unchanged across consecutive reads.
    #[default]
    Debounce,
}

/// Persisted session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Run Chrome without a visible window.
    #[serde(default = "default_true")]
    pub headless: bool,
    /// DevTools debugging port Chrome is launched with.
    #[serde(default = "default_port")]
    pub debug_port: u16,
    /// Browser window size, to avoid rendering quirks in headless mode.
    #[serde(default = "default_window_size")]
    pub window_size: (u32, u32),
    /// Where the cookie file lives. Defaults to the platform temp dir.
    #[serde(default = "default_cookie_path")]
    pub cookie_path: PathBuf,
    /// Budget for the login-ready detector, in seconds.
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,
    /// How response completion is detected.
    #[serde(default)]
    pub wait_strategy: WaitStrategy,
    /// Upper bound on waiting for a response, in seconds.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
    /// Interval between response reads, in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub response_poll_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    9222
}
fn default_window_size() -> (u32, u32) {
    (1920, 1080)
}
fn default_cookie_path() -> PathBuf {
    std::env::temp_dir().join("chatwire-cookies.json")
}
fn default_login_timeout() -> u64 {
    30
}
fn default_response_timeout() -> u64 {
    180
}
fn default_poll_ms() -> u64 {
    500
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            debug_port: 9222,
            window_size: (1920, 1080),
            cookie_path: default_cookie_path(),
            login_timeout_secs: 30,
            wait_strategy: WaitStrategy::Debounce,
            response_timeout_secs: 180,
            response_poll_ms: 500,
        }
    }
}

impl SessionConfig {
    /// Load config from a JSON file, or return defaults if absent/corrupt.
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
