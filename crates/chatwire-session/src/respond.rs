//! Response-completion detection.
//!
//! Two ways to know the assistant is done: poll a streaming-indicator
//! element, or debounce the rendered text. Both live behind
//! [`ResponseWait`] and are selected by configuration. Both carry a
//! deadline; a response that never stabilizes is a
//! [`Error::ResponseTimeout`], not an infinite loop or a silent empty
//! string.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use chatwire_cdp::Page;
use chatwire_core::{Error, Result, SessionConfig, WaitStrategy};

use crate::contract::PageContract;

/// Capability: block until the assistant's reply is complete, return its text.
#[async_trait]
pub trait ResponseWait: Send + Sync {
    async fn await_response(&self, page: &dyn Page, contract: &PageContract) -> Result<String>;
}

/// Build the configured strategy.
pub fn strategy_for(config: &SessionConfig) -> Box<dyn ResponseWait> {
    let poll = Duration::from_millis(config.response_poll_ms);
    let deadline = Duration::from_secs(config.response_timeout_secs);
    match config.wait_strategy {
        WaitStrategy::StreamingIndicator => Box::new(StreamingIndicatorWait {
            poll_interval: poll,
            deadline,
        }),
        WaitStrategy::Debounce => Box::new(DebounceWait {
            poll_interval: poll,
            stable_reads: 2,
            deadline,
        }),
    }
}

/// Poll while the streaming-indicator element is present; once it is gone,
/// read the last assistant message immediately.
///
/// Fast, but trusts the indicator selector: if the page stops rendering it,
/// this reads the reply mid-stream. The debounce strategy is the robust one.
pub struct StreamingIndicatorWait {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

#[async_trait]
impl ResponseWait for StreamingIndicatorWait {
    async fn await_response(&self, page: &dyn Page, contract: &PageContract) -> Result<String> {
        let started = tokio::time::Instant::now();
        while page.exists(&contract.streaming_indicator).await? {
            if started.elapsed() >= self.deadline {
                return Err(Error::ResponseTimeout {
                    waited: self.deadline,
                });
            }
            trace!("response still streaming");
            tokio::time::sleep(self.poll_interval).await;
        }

        match page.text_of_last(&contract.assistant_message).await? {
            Some(text) => Ok(text),
            None => Err(Error::ElementNotFound {
                selector: contract.assistant_message.clone(),
            }),
        }
    }
}

/// Re-read the last assistant message until it is identical and non-empty
/// across consecutive reads.
pub struct DebounceWait {
    pub poll_interval: Duration,
    /// Consecutive identical reads required after the first sighting.
    pub stable_reads: u32,
    pub deadline: Duration,
}

#[async_trait]
impl ResponseWait for DebounceWait {
    async fn await_response(&self, page: &dyn Page, contract: &PageContract) -> Result<String> {
        let started = tokio::time::Instant::now();
        let mut last = String::new();
        let mut stable = 0u32;

        loop {
            if started.elapsed() >= self.deadline {
                return Err(Error::ResponseTimeout {
                    waited: self.deadline,
                });
            }

            if let Some(text) = page.text_of_last(&contract.assistant_message).await? {
                let text = text.trim().to_string();
                if text == last && !text.is_empty() {
                    stable += 1;
                } else {
                    stable = 0;
                }
                last = text;
                if stable >= self.stable_reads {
                    debug!(chars = last.len(), "response stabilized");
                    return Ok(last);
                }
            }
            // No assistant message yet: keep waiting under the same deadline.

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
