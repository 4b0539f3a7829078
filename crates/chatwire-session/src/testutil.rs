//! Scripted in-memory [`Page`] for exercising the polling loops without a
//! browser.
//!
//! Each selector gets an observation script: a sequence of states advanced
//! once per read (`exists` / `is_enabled` / `text_of_last`), sticky on the
//! last entry. Clicks and typing peek at the current state and are recorded
//! for assertions.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use chatwire_cdp::{Cookie, Page};
use chatwire_core::Result;

#[derive(Clone, Default)]
struct Script<T: Clone> {
    states: Vec<T>,
    idx: usize,
}

impl<T: Clone> Script<T> {
    fn new(states: &[T]) -> Self {
        Self {
            states: states.to_vec(),
            idx: 0,
        }
    }

    /// Current state, advancing to the next; the last entry repeats forever.
    fn next(&mut self) -> Option<T> {
        let state = self
            .states
            .get(self.idx)
            .or_else(|| self.states.last())
            .cloned();
        if self.idx + 1 < self.states.len() {
            self.idx += 1;
        }
        state
    }

    fn peek(&self) -> Option<T> {
        self.states
            .get(self.idx)
            .or_else(|| self.states.last())
            .cloned()
    }
}

#[derive(Default)]
struct MockState {
    url: String,
    navigations: Vec<String>,
    exists_scripts: HashMap<String, Script<bool>>,
    enabled_scripts: HashMap<String, Script<Option<bool>>>,
    text_scripts: HashMap<String, Script<Option<String>>>,
    /// selector -> (trigger selector, required click count)
    enable_rules: HashMap<String, (String, usize)>,
    click_url_rules: HashMap<String, String>,
    queries: HashMap<String, usize>,
    clicks: HashMap<String, usize>,
    typed: HashMap<String, Vec<String>>,
    cleared: Vec<String>,
    browser_cookies: Vec<Cookie>,
    inserted_cookies: Vec<Cookie>,
    rejected_names: HashSet<String>,
}

pub struct MockPage {
    state: Mutex<MockState>,
}

impl MockPage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    // -- scripting ----------------------------------------------------------

    pub fn script_exists(&self, selector: &str, states: &[bool]) {
        self.state
            .lock()
            .unwrap()
            .exists_scripts
            .insert(selector.to_string(), Script::new(states));
    }

    pub fn script_enabled(&self, selector: &str, states: &[Option<bool>]) {
        self.state
            .lock()
            .unwrap()
            .enabled_scripts
            .insert(selector.to_string(), Script::new(states));
    }

    pub fn script_text(&self, selector: &str, states: &[Option<&str>]) {
        let states: Vec<Option<String>> =
            states.iter().map(|s| s.map(str::to_string)).collect();
        self.state
            .lock()
            .unwrap()
            .text_scripts
            .insert(selector.to_string(), Script::new(&states));
    }

    /// `selector` reads as enabled once `trigger` has been clicked `count`
    /// times.
    pub fn enable_after_click(&self, selector: &str, trigger: &str, count: usize) {
        self.state
            .lock()
            .unwrap()
            .enable_rules
            .insert(selector.to_string(), (trigger.to_string(), count));
    }

    /// Clicking `selector` moves the page to `url`.
    pub fn on_click_set_url(&self, selector: &str, url: &str) {
        self.state
            .lock()
            .unwrap()
            .click_url_rules
            .insert(selector.to_string(), url.to_string());
    }

    pub fn set_browser_cookies(&self, cookies: Vec<Cookie>) {
        self.state.lock().unwrap().browser_cookies = cookies;
    }

    pub fn reject_cookie(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_names
            .insert(name.to_string());
    }

    // -- assertions ---------------------------------------------------------

    pub fn times_queried(&self, selector: &str) -> usize {
        *self
            .state
            .lock()
            .unwrap()
            .queries
            .get(selector)
            .unwrap_or(&0)
    }

    pub fn clicks(&self, selector: &str) -> usize {
        *self
            .state
            .lock()
            .unwrap()
            .clicks
            .get(selector)
            .unwrap_or(&0)
    }

    pub fn typed_into(&self, selector: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .typed
            .get(selector)
            .cloned()
            .unwrap_or_default()
    }

    pub fn cleared(&self, selector: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .cleared
            .iter()
            .any(|s| s == selector)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn inserted_cookies(&self) -> Vec<Cookie> {
        self.state.lock().unwrap().inserted_cookies.clone()
    }

    // -- internals ----------------------------------------------------------

    fn record_query(state: &mut MockState, selector: &str) {
        *state.queries.entry(selector.to_string()).or_insert(0) += 1;
    }

    fn rule_enabled(state: &MockState, selector: &str) -> Option<bool> {
        let (trigger, count) = state.enable_rules.get(selector)?;
        let clicked = state.clicks.get(trigger).copied().unwrap_or(0);
        if clicked >= *count {
            Some(true)
        } else {
            None
        }
    }

    /// Whether the page knows this selector at all: scripted or rule-bound.
    /// Interactions (click/clear/type) key off this rather than the current
    /// observation state, since observations advance the scripts.
    fn known(state: &MockState, selector: &str) -> bool {
        state.exists_scripts.contains_key(selector)
            || state.enabled_scripts.contains_key(selector)
            || state.text_scripts.contains_key(selector)
            || state.enable_rules.contains_key(selector)
    }

    /// Whether a selector currently matches anything, without advancing.
    fn currently_present(state: &MockState, selector: &str) -> bool {
        if Self::rule_enabled(state, selector).is_some() {
            return true;
        }
        if let Some(script) = state.exists_scripts.get(selector) {
            return script.peek().unwrap_or(false);
        }
        if let Some(script) = state.enabled_scripts.get(selector) {
            return script.peek().flatten().is_some();
        }
        if let Some(script) = state.text_scripts.get(selector) {
            return script.peek().flatten().is_some();
        }
        false
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Self::record_query(&mut state, selector);
        if let Some(script) = state.exists_scripts.get_mut(selector) {
            return Ok(script.next().unwrap_or(false));
        }
        Ok(Self::currently_present(&state, selector))
    }

    async fn is_enabled(&self, selector: &str) -> Result<Option<bool>> {
        let mut state = self.state.lock().unwrap();
        Self::record_query(&mut state, selector);
        if let Some(enabled) = Self::rule_enabled(&state, selector) {
            return Ok(Some(enabled));
        }
        if let Some(script) = state.enabled_scripts.get_mut(selector) {
            return Ok(script.next().flatten());
        }
        Ok(None)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if !Self::known(&state, selector) && !Self::currently_present(&state, selector) {
            return Ok(false);
        }
        *state.clicks.entry(selector.to_string()).or_insert(0) += 1;
        if let Some(url) = state.click_url_rules.get(selector).cloned() {
            state.url = url;
        }
        Ok(true)
    }

    async fn clear(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if !Self::known(&state, selector) && !Self::currently_present(&state, selector) {
            return Ok(false);
        }
        state.cleared.push(selector.to_string());
        Ok(true)
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if !Self::known(&state, selector) && !Self::currently_present(&state, selector) {
            return Ok(false);
        }
        state
            .typed
            .entry(selector.to_string())
            .or_default()
            .push(text.to_string());
        Ok(true)
    }

    async fn text_of_last(&self, selector: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        Self::record_query(&mut state, selector);
        if let Some(script) = state.text_scripts.get_mut(selector) {
            return Ok(script.next().flatten());
        }
        Ok(None)
    }

    async fn html_head(&self, max_len: usize) -> Result<String> {
        let html = "<html><head><title>mock</title></head><body>mock page</body></html>";
        Ok(html.chars().take(max_len).collect())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.state.lock().unwrap().browser_cookies.clone())
    }

    async fn set_cookie(&self, cookie: &Cookie) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.rejected_names.contains(&cookie.name) {
            return Ok(false);
        }
        state.inserted_cookies.push(cookie.clone());
        Ok(true)
    }
}
