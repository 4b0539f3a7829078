//! Login flow: cookie replay first, interactive identity-provider flow as
//! the fallback.
//!
//! Cookie failures are soft (per-cookie skips, then the ready detector
//! decides); interactive-flow failures are fatal to the session.

use std::time::Duration;

use tracing::{debug, info, warn};

use chatwire_cdp::{Cookie, Page};
use chatwire_core::{Credentials, Error, Result};

use crate::contract::PageContract;
use crate::cookie_store::CookieStore;

const READY_POLL: Duration = Duration::from_secs(1);
const FIELD_WAIT: Duration = Duration::from_secs(30);
/// How much page source to dump when a login field is missing.
const DIAGNOSTIC_DUMP_LEN: usize = 1500;

/// How a session ended up authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    /// Stored cookies were enough; the login form was never touched.
    CookieReplay,
    /// Full interactive email/password flow.
    Interactive,
}

/// Poll until the prompt box is present and enabled, clicking through any
/// onboarding dialog on the way. One poll per second, up to `budget`.
///
/// Returns the number of polls consumed. There are exactly two outcomes:
/// ready, or [`Error::LoginTimeout`] once the budget is spent.
pub async fn wait_until_ready(
    page: &dyn Page,
    contract: &PageContract,
    budget: Duration,
) -> Result<u32> {
    let polls = budget.as_secs().max(1) as u32;
    for poll in 0..polls {
        for dialog_button in [&contract.onboarding_next, &contract.onboarding_done] {
            if page.exists(dialog_button).await? {
                debug!(selector = %dialog_button, "dismissing onboarding dialog");
                let _ = page.click(dialog_button).await?;
            }
        }

        if page.is_enabled(&contract.prompt_box).await? == Some(true) {
            debug!(poll, "prompt box ready");
            return Ok(poll);
        }

        tokio::time::sleep(READY_POLL).await;
    }
    Err(Error::LoginTimeout { waited: budget })
}

/// Replay stored cookies and check whether they still authenticate.
///
/// Individual cookie rejections are skipped; only the ready detector
/// decides whether the replay worked.
pub async fn try_cookie_login(
    page: &dyn Page,
    contract: &PageContract,
    cookies: &[Cookie],
    budget: Duration,
) -> Result<bool> {
    info!(count = cookies.len(), "attempting cookie login");
    page.goto(&contract.replay_url).await?;

    for cookie in cookies {
        match page.set_cookie(cookie).await {
            Ok(true) => {}
            Ok(false) => debug!(name = %cookie.name, "cookie rejected by browser"),
            Err(e) => debug!(name = %cookie.name, error = %e, "cookie insert failed"),
        }
    }

    page.goto(&contract.base_url).await?;
    match wait_until_ready(page, contract, budget).await {
        Ok(_) => Ok(true),
        Err(Error::LoginTimeout { .. }) => {
            info!("cookie login did not reach ready state");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Wait for a selector to show up, polling once per second.
async fn wait_for_selector(page: &dyn Page, selector: &str, budget: Duration) -> Result<bool> {
    let polls = budget.as_secs().max(1);
    for _ in 0..polls {
        if page.exists(selector).await? {
            return Ok(true);
        }
        tokio::time::sleep(READY_POLL).await;
    }
    Ok(false)
}

/// Fail with a diagnostic dump of the page head, so a markup rotation on
/// the identity provider shows up in the log.
async fn missing_field(page: &dyn Page, field: &str) -> Error {
    match page.html_head(DIAGNOSTIC_DUMP_LEN).await {
        Ok(html) => warn!(field, page_head = %html, "login form field not found"),
        Err(e) => warn!(field, error = %e, "login form field not found; page dump failed"),
    }
    Error::LoginFieldMissing {
        field: field.to_string(),
    }
}

/// Full interactive login: click through to the identity provider, fill
/// email and password, then wait for the authenticated-ready state and
/// persist the fresh cookie set.
pub async fn interactive_login(
    page: &dyn Page,
    contract: &PageContract,
    credentials: &Credentials,
    store: &CookieStore,
    budget: Duration,
) -> Result<()> {
    info!("starting interactive login");
    page.goto(&contract.base_url).await?;

    if !page.click(&contract.login_button).await? {
        return Err(Error::ElementNotFound {
            selector: contract.login_button.clone(),
        });
    }

    // Wait out the redirect to the identity provider.
    let redirect_deadline = tokio::time::Instant::now() + FIELD_WAIT;
    loop {
        let url = page.url().await?;
        if url.contains(&contract.auth_host) {
            debug!(url = %url, "identity-provider redirect reached");
            break;
        }
        if tokio::time::Instant::now() >= redirect_deadline {
            return Err(Error::LoginTimeout { waited: FIELD_WAIT });
        }
        tokio::time::sleep(READY_POLL).await;
    }

    if !wait_for_selector(page, &contract.email_input, FIELD_WAIT).await? {
        return Err(missing_field(page, "email").await);
    }
    page.type_text(&contract.email_input, &credentials.email)
        .await?;
    page.click(&contract.continue_button).await?;

    if !wait_for_selector(page, &contract.password_input, FIELD_WAIT).await? {
        return Err(missing_field(page, "password").await);
    }
    page.type_text(&contract.password_input, &credentials.password)
        .await?;
    page.click(&contract.continue_button).await?;

    wait_until_ready(page, contract, budget).await?;

    let cookies = page.cookies().await?;
    if let Err(e) = store.save(&cookies) {
        warn!(error = %e, "could not persist cookies; next run will log in again");
    }
    page.goto(&contract.base_url).await?;
    info!("interactive login succeeded");
    Ok(())
}

/// Login entry point: cookie replay when a cookie file exists, interactive
/// fallback exactly once when replay does not reach the ready state.
pub async fn login(
    page: &dyn Page,
    contract: &PageContract,
    credentials: &Credentials,
    store: &CookieStore,
    budget: Duration,
) -> Result<LoginMethod> {
    if let Some(cookies) = store.load() {
        if try_cookie_login(page, contract, &cookies, budget).await? {
            info!("cookie login succeeded");
            return Ok(LoginMethod::CookieReplay);
        }
    }
    interactive_login(page, contract, credentials, store, budget).await?;
    Ok(LoginMethod::Interactive)
}
