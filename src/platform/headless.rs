//! In-memory engine backend.
//!
//! Keeps a history stack and a native cookie store without rendering
//! anything. Every call is recorded so hosts and tests can assert on what
//! the control asked the engine to do. Native callbacks are not fired
//! automatically: drive them through the `native_*` methods of the control.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use url::Url;

use super::{NativeEngine, ScriptCallback};
use crate::cookies::{Cookie, CookieJar, CookieSource};
use crate::error::EngineError;
use crate::options::WebViewSettings;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    LoadUrl(String),
    LoadData { base_url: String, mime_type: String },
    GoBack,
    GoForward,
    Reload,
    StopLoading,
    EvaluateScript(String),
    SetCookie { domain: String, cookie: String },
}

#[derive(Default)]
pub struct HeadlessEngine {
    history: RefCell<Vec<String>>,
    index: Cell<Option<usize>>,
    store: RefCell<CookieJar>,
    script_results: RefCell<HashMap<String, String>>,
    abandon_scripts: Cell<bool>,
    load_failure: RefCell<Option<String>>,
    settings: Cell<Option<WebViewSettings>>,
    calls: RefCell<Vec<EngineCall>>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `urls` already in history, positioned on the last one.
    pub fn with_history<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let engine = Self::new();
        for url in urls {
            engine.push_history(url.into());
        }
        engine
    }

    /// Result returned for `script`. Unknown scripts evaluate to `"null"`.
    pub fn set_script_result(&self, script: &str, result: &str) {
        self.script_results
            .borrow_mut()
            .insert(script.to_string(), result.to_string());
    }

    /// Drop script callbacks without calling them.
    pub fn abandon_scripts(&self, abandon: bool) {
        self.abandon_scripts.set(abandon);
    }

    /// Make subsequent navigation commands fail with `reason`.
    pub fn fail_loads(&self, reason: Option<&str>) {
        *self.load_failure.borrow_mut() = reason.map(str::to_string);
    }

    /// Put a cookie straight into the native store, as a `Set-Cookie`
    /// header or page script would.
    pub fn set_native_cookie(&self, mut cookie: Cookie) {
        cookie.source = CookieSource::Native;
        self.store.borrow_mut().add(cookie);
    }

    pub fn native_cookie(&self, domain: &str, name: &str) -> Option<Cookie> {
        self.store.borrow().get(domain, name).cloned()
    }

    pub fn native_cookie_count(&self) -> usize {
        let mut store = self.store.borrow_mut();
        store.purge_expired();
        store.len()
    }

    pub fn settings(&self) -> Option<WebViewSettings> {
        self.settings.get()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// URLs passed to `load_url`, in order.
    pub fn loaded_urls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::LoadUrl(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: EngineCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check_failure(&self) -> Result<(), EngineError> {
        match self.load_failure.borrow().as_deref() {
            Some(reason) => Err(EngineError::from_reason(reason)),
            None => Ok(()),
        }
    }

    fn push_history(&self, url: String) {
        let mut history = self.history.borrow_mut();
        let next = self.index.get().map_or(0, |i| i + 1);
        history.truncate(next);
        history.push(url);
        self.index.set(Some(next));
    }
}

impl NativeEngine for HeadlessEngine {
    fn load_url(&self, url: &str) -> Result<(), EngineError> {
        self.record(EngineCall::LoadUrl(url.to_string()));
        self.check_failure()?;
        if !url.starts_with("javascript:") {
            self.push_history(url.to_string());
        }
        Ok(())
    }

    fn load_data(
        &self,
        _html: &str,
        base_url: &str,
        mime_type: &str,
        _encoding: &str,
    ) -> Result<(), EngineError> {
        self.record(EngineCall::LoadData {
            base_url: base_url.to_string(),
            mime_type: mime_type.to_string(),
        });
        self.check_failure()?;
        self.push_history(base_url.to_string());
        Ok(())
    }

    fn go_back(&self) -> Result<(), EngineError> {
        self.record(EngineCall::GoBack);
        self.check_failure()?;
        if let Some(i) = self.index.get().filter(|&i| i > 0) {
            self.index.set(Some(i - 1));
        }
        Ok(())
    }

    fn go_forward(&self) -> Result<(), EngineError> {
        self.record(EngineCall::GoForward);
        self.check_failure()?;
        if self.can_go_forward() {
            self.index.set(self.index.get().map(|i| i + 1));
        }
        Ok(())
    }

    fn reload(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Reload);
        self.check_failure()
    }

    fn stop_loading(&self) {
        self.record(EngineCall::StopLoading);
    }

    fn can_go_back(&self) -> bool {
        self.index.get().is_some_and(|i| i > 0)
    }

    fn can_go_forward(&self) -> bool {
        let len = self.history.borrow().len();
        self.index.get().is_some_and(|i| i + 1 < len)
    }

    fn current_url(&self) -> Option<String> {
        let i = self.index.get()?;
        self.history.borrow().get(i).cloned()
    }

    fn evaluate_script(&self, script: &str, on_result: ScriptCallback) {
        self.record(EngineCall::EvaluateScript(script.to_string()));
        if self.abandon_scripts.get() {
            return;
        }
        let result = self
            .script_results
            .borrow()
            .get(script)
            .cloned()
            .unwrap_or_else(|| "null".to_string());
        on_result(result);
    }

    fn cookies_for_url(&self, url: &str) -> Vec<String> {
        let Ok(parsed) = Url::parse(url) else {
            return Vec::new();
        };
        self.store
            .borrow()
            .cookies_for(&parsed)
            .into_iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect()
    }

    fn set_cookie(&self, domain: &str, cookie: &str) {
        self.record(EngineCall::SetCookie {
            domain: domain.to_string(),
            cookie: cookie.to_string(),
        });
        if let Some(mut parsed) = Cookie::parse(cookie, domain) {
            parsed.source = CookieSource::Native;
            self.store.borrow_mut().add(parsed);
        }
    }

    fn apply_settings(&self, settings: &WebViewSettings) {
        self.settings.set(Some(*settings));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history() {
        let engine = HeadlessEngine::new();
        assert!(!engine.can_go_back());
        assert_eq!(engine.current_url(), None);

        engine.load_url("https://a.test/").unwrap();
        engine.load_url("https://b.test/").unwrap();
        engine.load_url("https://c.test/").unwrap();
        assert!(engine.can_go_back());
        assert!(!engine.can_go_forward());

        engine.go_back().unwrap();
        assert_eq!(engine.current_url().as_deref(), Some("https://b.test/"));
        assert!(engine.can_go_forward());

        // A new load drops the forward entries.
        engine.load_url("https://d.test/").unwrap();
        assert!(!engine.can_go_forward());
        assert_eq!(engine.current_url().as_deref(), Some("https://d.test/"));
    }

    #[test]
    fn test_javascript_urls_do_not_touch_history() {
        let engine = HeadlessEngine::with_history(["https://a.test/"]);
        engine.load_url("javascript:void(0)").unwrap();
        assert_eq!(engine.current_url().as_deref(), Some("https://a.test/"));
        assert_eq!(engine.loaded_urls(), vec!["javascript:void(0)".to_string()]);
    }

    #[test]
    fn test_cookie_store() {
        let engine = HeadlessEngine::new();
        engine.set_cookie("x.test", "a=1; Path=/");
        assert_eq!(engine.cookies_for_url("https://x.test/"), vec!["a=1".to_string()]);
        assert!(engine.cookies_for_url("https://y.test/").is_empty());

        engine.set_cookie("x.test", &Cookie::expiry_string("a"));
        assert!(engine.cookies_for_url("https://x.test/").is_empty());
        assert_eq!(engine.native_cookie_count(), 0);
    }

    #[test]
    fn test_script_results() {
        let engine = HeadlessEngine::new();
        engine.set_script_result("1 + 1", "2");

        let out = std::rc::Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        engine.evaluate_script("1 + 1", Box::new(move |r| sink.borrow_mut().push(r)));
        let sink = out.clone();
        engine.evaluate_script("unknown()", Box::new(move |r| sink.borrow_mut().push(r)));
        assert_eq!(*out.borrow(), vec!["2".to_string(), "null".to_string()]);
    }

    #[test]
    fn test_load_failure() {
        let engine = HeadlessEngine::new();
        engine.fail_loads(Some("offline"));
        let err = engine.load_url("https://a.test/").unwrap_err();
        assert_eq!(err.reason(), "offline");
        assert_eq!(engine.current_url(), None);
    }
}
