//! Chrome process lifecycle and DevTools target discovery.
//!
//! Launches a Chrome/Chromium binary with a dedicated automation profile and
//! `--remote-debugging-port`, waits for the DevTools HTTP endpoint to come
//! up, and opens a page target whose WebSocket URL the CDP client connects
//! to. The child process is killed on [`ChromeProcess::close`] or drop.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::Deserialize;

use crate::error::CdpError;

/// How long to wait for the DevTools HTTP endpoint after spawning.
const ENDPOINT_WAIT: Duration = Duration::from_secs(10);
const ENDPOINT_POLL: Duration = Duration::from_millis(500);

/// Launch options for the Chrome child process.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub debug_port: u16,
    pub window_size: (u32, u32),
    /// Profile directory; a dedicated one, never the user's main profile.
    pub user_data_dir: PathBuf,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            debug_port: 9222,
            window_size: (1920, 1080),
            user_data_dir: std::env::temp_dir().join("chatwire-profile"),
        }
    }
}

/// Candidate binary locations, checked in order.
const CHROME_CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Locate a Chrome binary. `CHATWIRE_CHROME` overrides the search.
pub fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHATWIRE_CHROME") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }
    CHROME_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Build the Chrome command-line arguments for the given options.
pub fn build_chrome_args(options: &ChromeOptions) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", options.debug_port),
        format!("--user-data-dir={}", options.user_data_dir.display()),
        format!(
            "--window-size={},{}",
            options.window_size.0, options.window_size.1
        ),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--lang=en-US,en".to_string(),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
    }
    args.push("about:blank".to_string());
    args
}

#[derive(Debug, Deserialize)]
struct TargetInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
}

/// A spawned Chrome child with its DevTools endpoint.
pub struct ChromeProcess {
    child: Child,
    port: u16,
}

impl ChromeProcess {
    /// Spawn Chrome and wait for its DevTools endpoint to answer.
    pub async fn launch(options: &ChromeOptions) -> Result<Self, CdpError> {
        let binary = find_chrome_binary()
            .ok_or_else(|| CdpError::Launch("no Chrome/Chromium binary found".into()))?;

        std::fs::create_dir_all(&options.user_data_dir)
            .map_err(|e| CdpError::Launch(format!("cannot create profile dir: {e}")))?;

        tracing::info!(
            binary = %binary.display(),
            port = options.debug_port,
            headless = options.headless,
            "launching Chrome"
        );

        let child = Command::new(&binary)
            .args(build_chrome_args(options))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CdpError::Launch(format!("spawn failed: {e}")))?;

        let process = Self {
            child,
            port: options.debug_port,
        };
        process.wait_for_endpoint().await?;
        Ok(process)
    }

    /// Poll `/json/version` until the endpoint answers or the wait expires.
    async fn wait_for_endpoint(&self) -> Result<(), CdpError> {
        let url = format!("http://127.0.0.1:{}/json/version", self.port);
        let deadline = tokio::time::Instant::now() + ENDPOINT_WAIT;
        loop {
            if let Ok(resp) = reqwest::get(&url).await {
                if resp.status().is_success() {
                    tracing::debug!(port = self.port, "DevTools endpoint is up");
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(CdpError::EndpointTimeout {
                    waited: ENDPOINT_WAIT,
                });
            }
            tokio::time::sleep(ENDPOINT_POLL).await;
        }
    }

    /// Open a fresh page target and return its WebSocket debugger URL.
    ///
    /// Newer Chrome wants `PUT /json/new`; older builds only take `GET`.
    /// Falls back to the first existing page target if neither works.
    pub async fn new_page_ws_url(&self) -> Result<String, CdpError> {
        let base = format!("http://127.0.0.1:{}", self.port);
        let client = reqwest::Client::new();

        let new_url = format!("{base}/json/new?about:blank");
        for request in [client.put(&new_url), client.get(&new_url)] {
            if let Ok(resp) = request.send().await {
                if resp.status().is_success() {
                    if let Ok(target) = resp.json::<TargetInfo>().await {
                        if let Some(ws) = target.web_socket_debugger_url {
                            return Ok(ws);
                        }
                    }
                }
            }
        }

        let list: Vec<TargetInfo> = client
            .get(format!("{base}/json"))
            .send()
            .await
            .map_err(|e| CdpError::Protocol(format!("target list failed: {e}")))?
            .json()
            .await
            .map_err(|e| CdpError::Protocol(format!("target list unparseable: {e}")))?;

        list.into_iter()
            .filter(|t| t.kind == "page")
            .find_map(|t| t.web_socket_debugger_url)
            .ok_or_else(|| CdpError::Protocol("no page target available".into()))
    }

    /// Kill the Chrome child process.
    pub fn close(&mut self) {
        tracing::info!("shutting down Chrome");
        if let Err(e) = self.child.kill() {
            tracing::warn!(error = %e, "failed to kill Chrome child");
        }
        let _ = self.child.wait();
    }
}

impl Drop for ChromeProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
