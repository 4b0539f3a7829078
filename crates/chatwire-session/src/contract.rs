//! The target site's DOM contract.
//!
//! Every selector and URL the automation depends on lives here. The site's
//! markup is externally controlled and changes without notice; treating it
//! as one overridable data value means a markup rotation is a config edit,
//! not a code change. `CHATWIRE_CONTRACT` can point at a JSON file that
//! replaces any subset of the defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContract {
    /// The chat UI itself.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Lightweight page on the same origin, used to plant cookies before
    /// loading the real UI.
    #[serde(default = "d_replay_url")]
    pub replay_url: String,
    /// Host fragment that marks the identity-provider redirect.
    #[serde(default = "d_auth_host")]
    pub auth_host: String,

    #[serde(default = "d_login_button")]
    pub login_button: String,
    #[serde(default = "d_email_input")]
    pub email_input: String,
    #[serde(default = "d_password_input")]
    pub password_input: String,
    #[serde(default = "d_continue_button")]
    pub continue_button: String,

    /// Onboarding dialog buttons that may appear after login; clicked
    /// through when present, ignored when absent.
    #[serde(default = "d_onboarding_next")]
    pub onboarding_next: String,
    #[serde(default = "d_onboarding_done")]
    pub onboarding_done: String,

    #[serde(default = "d_prompt_box")]
    pub prompt_box: String,
    #[serde(default = "d_send_button")]
    pub send_button: String,
    /// Older markup used an aria-label instead of a testid.
    #[serde(default = "d_send_button_fallback")]
    pub send_button_fallback: String,

    #[serde(default = "d_assistant_message")]
    pub assistant_message: String,
    #[serde(default = "d_streaming_indicator")]
    pub streaming_indicator: String,
}

fn d_base_url() -> String {
    "https://chat.openai.com/".into()
}
fn d_replay_url() -> String {
    "https://chat.openai.com/robots.txt".into()
}
fn d_auth_host() -> String {
    "auth.openai.com".into()
}
fn d_login_button() -> String {
    "button[data-testid='login-button']".into()
}
fn d_email_input() -> String {
    "input[type='email']".into()
}
fn d_password_input() -> String {
    "input[type='password']".into()
}
fn d_continue_button() -> String {
    "button[type='submit']".into()
}
fn d_onboarding_next() -> String {
    "div[role='dialog'] button[data-testid='onboarding-next']".into()
}
fn d_onboarding_done() -> String {
    "div[role='dialog'] button[data-testid='onboarding-done']".into()
}
fn d_prompt_box() -> String {
    "div#prompt-textarea[contenteditable='true']".into()
}
fn d_send_button() -> String {
    "button[data-testid='send-button']".into()
}
fn d_send_button_fallback() -> String {
    "button[aria-label='Send prompt']".into()
}
fn d_assistant_message() -> String {
    "div[data-message-author-role='assistant'] div.markdown.prose".into()
}
fn d_streaming_indicator() -> String {
    "div[class*='result-streaming']".into()
}

impl Default for PageContract {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty contract deserializes to defaults")
    }
}

impl PageContract {
    /// Default contract, or the file named by `CHATWIRE_CONTRACT` if set.
    pub fn from_env() -> Self {
        match std::env::var("CHATWIRE_CONTRACT") {
            Ok(path) => match std::fs::read_to_string(&path) {
                Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                    tracing::warn!(path, error = %e, "bad contract file, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!(path, error = %e, "unreadable contract file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contract() {
        let contract = PageContract::default();
        assert_eq!(contract.prompt_box, "div#prompt-textarea[contenteditable='true']");
        assert!(contract.replay_url.ends_with("robots.txt"));
        assert_eq!(contract.auth_host, "auth.openai.com");
    }

    #[test]
    fn test_partial_override_keeps_rest() {
        let contract: PageContract =
            serde_json::from_str(r##"{"prompt_box": "#new-composer"}"##).unwrap();
        assert_eq!(contract.prompt_box, "#new-composer");
        assert_eq!(contract.send_button, "button[data-testid='send-button']");
    }
}
