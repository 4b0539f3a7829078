//! Page driver: the capability trait session code works against, and its
//! CDP-backed implementation.
//!
//! Element lookups distinguish absence (`Ok(false)` / `Ok(None)`) from
//! transport failures (`Err`). DOM interaction happens through JavaScript
//! probes evaluated in the page context; `insertText` is used for typing so
//! the page's framework sees a real input event, not a bare value write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chatwire_core::Result;

use crate::client::CdpClient;
use crate::error::CdpError;

/// A browser cookie record, in the DevTools camelCase shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".into()
}

/// Everything the session layer needs from a rendered page.
///
/// The mock page used in tests implements this trait; [`CdpPage`] is the
/// real thing.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the document to finish loading.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Current `location.href`.
    async fn url(&self) -> Result<String>;

    /// Whether any element matches the selector.
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Enabled state of the first match; `None` when nothing matches.
    async fn is_enabled(&self, selector: &str) -> Result<Option<bool>>;

    /// Click the first match. `false` when nothing matches.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Empty out the first match's content. `false` when nothing matches.
    async fn clear(&self, selector: &str) -> Result<bool>;

    /// Type text into the first match. `false` when nothing matches.
    async fn type_text(&self, selector: &str, text: &str) -> Result<bool>;

    /// Trimmed text of the LAST match; `None` when nothing matches.
    async fn text_of_last(&self, selector: &str) -> Result<Option<String>>;

    /// Leading slice of the page HTML, for diagnostics.
    async fn html_head(&self, max_len: usize) -> Result<String>;

    /// All cookies visible to the browser.
    async fn cookies(&self) -> Result<Vec<Cookie>>;

    /// Insert one cookie. `false` when the browser rejects it.
    async fn set_cookie(&self, cookie: &Cookie) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// JavaScript probe builders
// ---------------------------------------------------------------------------

fn js_quote(s: &str) -> String {
    // serde_json string encoding is valid JS string syntax.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

pub fn js_exists(selector: &str) -> String {
    format!("!!document.querySelector({})", js_quote(selector))
}

pub fn js_is_enabled(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
         if (!el) return null; \
         return !el.disabled && el.getAttribute('aria-disabled') !== 'true'; }})()",
        js_quote(selector)
    )
}

pub fn js_click(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
         if (!el) return false; el.click(); return true; }})()",
        js_quote(selector)
    )
}

pub fn js_clear(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
         if (!el) return false; \
         if ('value' in el) el.value = ''; \
         if (el.isContentEditable) el.innerHTML = ''; \
         return true; }})()",
        js_quote(selector)
    )
}

pub fn js_type_text(selector: &str, text: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (!el) return false; \
         el.focus(); \
         document.execCommand('insertText', false, {text}); \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         return true; }})()",
        sel = js_quote(selector),
        text = js_quote(text),
    )
}

pub fn js_text_of_last(selector: &str) -> String {
    format!(
        "(() => {{ const els = document.querySelectorAll({}); \
         if (!els.length) return null; \
         return els[els.length - 1].innerText.trim(); }})()",
        js_quote(selector)
    )
}

// ---------------------------------------------------------------------------
// CdpPage
// ---------------------------------------------------------------------------

/// [`Page`] implementation over a live CDP client.
pub struct CdpPage {
    client: CdpClient,
}

impl CdpPage {
    /// Wrap a connected client. The commands the probes use (`Page.navigate`,
    /// `Runtime.evaluate`, `Network.getCookies`/`setCookie`) work without
    /// enabling their domains, so no domain is subscribed and Chrome sends
    /// no event traffic over the socket.
    pub fn new(client: CdpClient) -> Self {
        Self { client }
    }

    /// Evaluate an expression in the page context, by value.
    async fn eval(&self, expression: &str) -> std::result::Result<Value, CdpError> {
        let reply = self
            .client
            .call(
                "Runtime.evaluate",
                serde_json::json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = reply.get("exceptionDetails") {
            let message = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(Value::as_str)
                .or_else(|| details.get("text").and_then(Value::as_str))
                .unwrap_or("unknown exception")
                .to_string();
            return Err(CdpError::JsException(message));
        }

        Ok(reply
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn eval_bool(&self, expression: &str) -> Result<bool> {
        let value = self.eval(expression).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn goto(&self, url: &str) -> Result<()> {
        let reply = self
            .client
            .call("Page.navigate", serde_json::json!({ "url": url }))
            .await
            .map_err(chatwire_core::Error::from)?;
        if let Some(err) = reply.get("errorText").and_then(Value::as_str) {
            return Err(chatwire_core::Error::Browser(format!(
                "navigation to {url} failed: {err}"
            )));
        }

        // Loading usually finishes within a few readyState polls; the login
        // and response detectors do their own element-level waiting on top.
        for _ in 0..50 {
            let state = self.eval("document.readyState").await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        let value = self.eval("window.location.href").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.eval_bool(&js_exists(selector)).await
    }

    async fn is_enabled(&self, selector: &str) -> Result<Option<bool>> {
        let value = self.eval(&js_is_enabled(selector)).await?;
        Ok(value.as_bool())
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.eval_bool(&js_click(selector)).await
    }

    async fn clear(&self, selector: &str) -> Result<bool> {
        self.eval_bool(&js_clear(selector)).await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<bool> {
        self.eval_bool(&js_type_text(selector, text)).await
    }

    async fn text_of_last(&self, selector: &str) -> Result<Option<String>> {
        let value = self.eval(&js_text_of_last(selector)).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn html_head(&self, max_len: usize) -> Result<String> {
        let expr = format!("document.documentElement.outerHTML.slice(0, {max_len})");
        let value = self.eval(&expr).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let reply = self
            .client
            .call("Network.getCookies", serde_json::json!({}))
            .await
            .map_err(chatwire_core::Error::from)?;
        let cookies = reply
            .get("cookies")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        Ok(cookies)
    }

    async fn set_cookie(&self, cookie: &Cookie) -> Result<bool> {
        let params = serde_json::to_value(cookie)?;
        let reply = self
            .client
            .call("Network.setCookie", params)
            .await
            .map_err(chatwire_core::Error::from)?;
        Ok(reply
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}
