//! Chrome lifecycle and DevTools plumbing for ChatWire.
//!
//! Split in three:
//!
//! - [`chrome`]: spawn a Chrome binary with `--remote-debugging-port`, wait
//!   for the DevTools HTTP endpoint, open a page target.
//! - [`client`]: the WebSocket JSON-RPC client for one target.
//! - [`page`]: the [`Page`] capability trait session code depends on, plus
//!   the CDP-backed implementation.

pub mod chrome;
pub mod client;
pub mod error;
pub mod page;

pub use chrome::{ChromeOptions, ChromeProcess};
pub use client::CdpClient;
pub use error::CdpError;
pub use page::{Cookie, CdpPage, Page};
