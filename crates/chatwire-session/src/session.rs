//! One authenticated browser session: connect, ask, close.
//!
//! A session owns exactly one Chrome child and one page for the process's
//! lifetime. Everything runs sequentially on the caller's task; there is no
//! pooling and no reconnect-on-crash.

use std::time::Duration;

use tracing::{debug, info};

use chatwire_cdp::{CdpClient, CdpPage, ChromeOptions, ChromeProcess, Page};
use chatwire_core::{Credentials, Error, Result, SessionConfig};

use crate::contract::PageContract;
use crate::cookie_store::CookieStore;
use crate::login::{self, LoginMethod};
use crate::respond::{strategy_for, ResponseWait};

const SEND_POLL: Duration = Duration::from_millis(500);
const SEND_WAIT_POLLS: u32 = 20;

/// Find whichever send-control selector the current markup uses, waiting
/// briefly for it to materialize after the prompt text lands.
async fn wait_for_send_control(page: &dyn Page, contract: &PageContract) -> Result<String> {
    for _ in 0..SEND_WAIT_POLLS {
        for selector in [&contract.send_button, &contract.send_button_fallback] {
            if page.exists(selector).await? {
                return Ok(selector.clone());
            }
        }
        tokio::time::sleep(SEND_POLL).await;
    }
    Err(Error::ElementNotFound {
        selector: contract.send_button.clone(),
    })
}

/// Put a prompt into the composer and trigger the send control.
pub async fn submit_prompt(page: &dyn Page, contract: &PageContract, prompt: &str) -> Result<()> {
    if !page.click(&contract.prompt_box).await? {
        return Err(Error::ElementNotFound {
            selector: contract.prompt_box.clone(),
        });
    }
    page.clear(&contract.prompt_box).await?;
    if !page.type_text(&contract.prompt_box, prompt).await? {
        return Err(Error::ElementNotFound {
            selector: contract.prompt_box.clone(),
        });
    }

    let send = wait_for_send_control(page, contract).await?;
    if !page.click(&send).await? {
        return Err(Error::ElementNotFound { selector: send });
    }
    debug!(chars = prompt.len(), "prompt submitted");
    Ok(())
}

/// One full round trip: submit, then wait out the response per strategy.
pub async fn run_prompt_cycle(
    page: &dyn Page,
    contract: &PageContract,
    waiter: &dyn ResponseWait,
    prompt: &str,
) -> Result<String> {
    submit_prompt(page, contract, prompt).await?;
    waiter.await_response(page, contract).await
}

/// An authenticated chat session over one Chrome instance.
pub struct ChatSession {
    chrome: ChromeProcess,
    page: CdpPage,
    contract: PageContract,
    waiter: Box<dyn ResponseWait>,
    login_method: LoginMethod,
}

impl ChatSession {
    /// Launch Chrome, log in (cookies first, interactive fallback), and
    /// return a session ready to take prompts. Login failure is fatal.
    pub async fn connect(config: &SessionConfig, credentials: &Credentials) -> Result<Self> {
        let chrome = ChromeProcess::launch(&ChromeOptions {
            headless: config.headless,
            debug_port: config.debug_port,
            window_size: config.window_size,
            ..ChromeOptions::default()
        })
        .await?;

        let ws_url = chrome.new_page_ws_url().await?;
        let client = CdpClient::connect(&ws_url).await?;
        let page = CdpPage::new(client);

        let contract = PageContract::from_env();
        let store = CookieStore::new(config.cookie_path.clone());
        let budget = Duration::from_secs(config.login_timeout_secs);

        let login_method = login::login(&page, &contract, credentials, &store, budget).await?;
        info!(?login_method, "session authenticated");

        Ok(Self {
            chrome,
            page,
            contract,
            waiter: strategy_for(config),
            login_method,
        })
    }

    /// How this session authenticated.
    pub fn login_method(&self) -> LoginMethod {
        self.login_method
    }

    /// Submit one prompt and return the assistant's stabilized response.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        run_prompt_cycle(&self.page, &self.contract, self.waiter.as_ref(), prompt).await
    }

    /// Shut the browser down. Also happens on drop.
    pub fn close(&mut self) {
        self.chrome.close();
    }
}
