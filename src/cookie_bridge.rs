//! Keeps the host's cookie jar and the engine's native cookie store in step.
//!
//! The jar is authoritative on write: pushing expires native cookies the jar
//! does not know. The only import path from native to jar is the one-time
//! preload on the first visit to a host, plus value refreshes for cookies
//! the jar already holds.

use std::cell::RefCell;
use std::collections::HashSet;

use tracing::debug;
use url::Url;

use crate::cookies::{Cookie, CookieSource, SharedCookieJar};
use crate::platform::NativeEngine;

/// Longest URL prefix handed to the URL parser.
pub const MAX_COOKIE_URL_LEN: usize = 2000;

/// Parse `url` for cookie purposes. Overlong input is truncated to
/// [`MAX_COOKIE_URL_LEN`] characters first. Returns `None` for relative or
/// malformed URLs and URLs without a host.
pub fn resolve_cookie_uri(url: &str) -> Option<Url> {
    let bounded = match url.char_indices().nth(MAX_COOKIE_URL_LEN) {
        Some((cut, _)) => &url[..cut],
        None => url,
    };
    let parsed = Url::parse(bounded).ok()?;
    match parsed.host_str() {
        Some(host) if !host.trim().is_empty() => Some(parsed),
        _ => None,
    }
}

#[derive(Default)]
pub struct CookieBridge {
    jar: RefCell<Option<SharedCookieJar>>,
    preloaded: RefCell<HashSet<String>>,
}

impl CookieBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_jar(&self, jar: Option<SharedCookieJar>) {
        *self.jar.borrow_mut() = jar;
    }

    /// Current jar handle. Re-read at the start of every operation so the
    /// host can swap jars between navigations.
    pub fn jar(&self) -> Option<SharedCookieJar> {
        self.jar.borrow().clone()
    }

    pub fn is_preloaded(&self, host: &str) -> bool {
        self.preloaded.borrow().contains(host)
    }

    /// Push the jar into the native store for `url`'s host.
    pub fn push_jar_to_native<E: NativeEngine + ?Sized>(&self, engine: &E, url: &str) {
        self.sync_jar_to_native(engine, url);
    }

    /// After a navigation completes: refresh the jar from the native store,
    /// then push the result back so both sides agree.
    pub fn pull_native_to_jar<E: NativeEngine + ?Sized>(&self, engine: &E, url: &str) {
        self.reconcile_native_back_into_jar(engine, url);
        self.sync_jar_to_native(engine, url);
    }

    /// Cookies the native store holds for `url`'s host, regardless of jar
    /// state. Unparseable entries are skipped.
    pub fn read_native_cookies<E: NativeEngine + ?Sized>(&self, engine: &E, url: &str) -> Vec<Cookie> {
        let Some(uri) = resolve_cookie_uri(url) else {
            return Vec::new();
        };
        let host = uri.host_str().unwrap_or_default();
        engine
            .cookies_for_url(url)
            .iter()
            .flat_map(|entry| entry.split(';'))
            .filter_map(|pair| Cookie::parse(pair.trim(), host))
            .map(|mut cookie| {
                cookie.source = CookieSource::Native;
                cookie
            })
            .collect()
    }

    /// On the first visit to a host, import native cookies whose names the
    /// jar does not know yet. Later visits to the same host do nothing.
    pub fn preload_if_first_visit<E: NativeEngine + ?Sized>(&self, engine: &E, url: &str) {
        let Some(jar) = self.jar() else {
            return;
        };
        let Some(uri) = resolve_cookie_uri(url) else {
            return;
        };
        let host = uri.host_str().unwrap_or_default().to_string();
        if !self.preloaded.borrow_mut().insert(host.clone()) {
            return;
        }

        let native = self.read_native_cookies(engine, url);
        let mut jar = jar.borrow_mut();
        let known: HashSet<String> = jar.cookies_for(&uri).into_iter().map(|c| c.name).collect();
        let mut imported = 0;
        for cookie in native {
            if !known.contains(&cookie.name) {
                jar.add(cookie);
                imported += 1;
            }
        }
        debug!(host = %host, imported, "preloaded native cookies");
    }

    /// Upsert every jar cookie for the host into the native store and expire
    /// native cookies the jar does not have.
    pub fn sync_jar_to_native<E: NativeEngine + ?Sized>(&self, engine: &E, url: &str) {
        let Some(uri) = resolve_cookie_uri(url) else {
            return;
        };
        let Some(jar) = self.jar() else {
            return;
        };

        self.preload_if_first_visit(engine, url);
        let cookies = jar.borrow().cookies_for(&uri);
        let native = self.read_native_cookies(engine, url);

        for cookie in &cookies {
            engine.set_cookie(&cookie.domain, &cookie.to_cookie_string());
        }

        let mut expired = 0;
        for cookie in native.iter().filter(|n| !cookies.iter().any(|c| c.name == n.name)) {
            engine.set_cookie(&cookie.domain, &Cookie::expiry_string(&cookie.name));
            expired += 1;
        }
        debug!(
            host = uri.host_str().unwrap_or_default(),
            written = cookies.len(),
            expired,
            "synced cookie jar to native store"
        );
    }

    /// For each jar cookie of the host: expire it when the native store
    /// lacks it, otherwise take the native value.
    pub fn reconcile_native_back_into_jar<E: NativeEngine + ?Sized>(&self, engine: &E, url: &str) {
        let Some(jar) = self.jar() else {
            return;
        };
        let Some(uri) = resolve_cookie_uri(url) else {
            return;
        };

        let native = self.read_native_cookies(engine, url);
        let mut jar = jar.borrow_mut();
        for cookie in jar.cookies_for_mut(&uri) {
            match native.iter().find(|n| n.name == cookie.name) {
                Some(n) => cookie.value = n.value.clone(),
                None => cookie.expire(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::CookieJar;
    use crate::platform::headless::HeadlessEngine;

    fn bridge_with_jar() -> (CookieBridge, SharedCookieJar) {
        let jar = CookieJar::new().shared();
        let bridge = CookieBridge::new();
        bridge.set_jar(Some(jar.clone()));
        (bridge, jar)
    }

    #[test]
    fn test_resolve_cookie_uri() {
        assert_eq!(
            resolve_cookie_uri("https://x.test/a?b").unwrap().host_str(),
            Some("x.test")
        );
        assert!(resolve_cookie_uri("").is_none());
        assert!(resolve_cookie_uri("/relative/path").is_none());
        assert!(resolve_cookie_uri("about:blank").is_none());
        assert!(resolve_cookie_uri("data:text/html,hello").is_none());
    }

    #[test]
    fn test_resolve_cookie_uri_truncates_long_input() {
        let long = format!("https://x.test/{}", "a".repeat(10_000));
        let uri = resolve_cookie_uri(&long).unwrap();
        assert_eq!(uri.host_str(), Some("x.test"));
        assert!(uri.as_str().len() <= MAX_COOKIE_URL_LEN);
    }

    #[test]
    fn test_sync_writes_jar_cookies() {
        let (bridge, jar) = bridge_with_jar();
        jar.borrow_mut().add(Cookie::new("a", "1", "x.test"));
        let engine = HeadlessEngine::new();

        bridge.sync_jar_to_native(&engine, "https://x.test/");

        let native = engine.native_cookie("x.test", "a").unwrap();
        assert_eq!(native.value, "1");
        assert_eq!(native.source, CookieSource::Native);
    }

    #[test]
    fn test_sync_expires_native_only_cookies() {
        let (bridge, jar) = bridge_with_jar();
        jar.borrow_mut().add(Cookie::new("a", "1", "x.test"));
        let engine = HeadlessEngine::new();

        // First visit already done, so "b" is not imported.
        bridge.preload_if_first_visit(&engine, "https://x.test/");
        engine.set_native_cookie(Cookie::new("b", "2", "x.test"));

        bridge.sync_jar_to_native(&engine, "https://x.test/");
        assert!(engine.native_cookie("x.test", "b").is_none());
        assert!(engine.native_cookie("x.test", "a").is_some());
    }

    #[test]
    fn test_first_visit_preload_imports_once() {
        let (bridge, jar) = bridge_with_jar();
        let engine = HeadlessEngine::new();
        engine.set_native_cookie(Cookie::new("c", "3", "x.test"));

        bridge.push_jar_to_native(&engine, "https://x.test/");
        assert_eq!(jar.borrow().get("x.test", "c").unwrap().value, "3");
        assert!(bridge.is_preloaded("x.test"));

        jar.borrow_mut().remove("x.test", "c");
        bridge.push_jar_to_native(&engine, "https://x.test/page");
        assert!(jar.borrow().get("x.test", "c").is_none());
        assert!(engine.native_cookie("x.test", "c").is_none());
    }

    #[test]
    fn test_preload_keeps_jar_values() {
        let (bridge, jar) = bridge_with_jar();
        jar.borrow_mut().add(Cookie::new("a", "jar", "x.test"));
        let engine = HeadlessEngine::new();
        engine.set_native_cookie(Cookie::new("a", "native", "x.test"));

        bridge.push_jar_to_native(&engine, "https://x.test/");
        assert_eq!(jar.borrow().get("x.test", "a").unwrap().value, "jar");
        assert_eq!(engine.native_cookie("x.test", "a").unwrap().value, "jar");
    }

    #[test]
    fn test_reconcile_copies_values_and_expires_missing() {
        let (bridge, jar) = bridge_with_jar();
        jar.borrow_mut().add(Cookie::new("a", "1", "x.test"));
        jar.borrow_mut().add(Cookie::new("gone", "1", "x.test"));
        let engine = HeadlessEngine::new();
        engine.set_native_cookie(Cookie::new("a", "changed-by-page", "x.test"));

        bridge.reconcile_native_back_into_jar(&engine, "https://x.test/");

        let jar = jar.borrow();
        assert_eq!(jar.get("x.test", "a").unwrap().value, "changed-by-page");
        assert!(jar.get("x.test", "gone").is_none());
    }

    #[test]
    fn test_no_jar_or_bad_url_is_a_no_op() {
        let bridge = CookieBridge::new();
        let engine = HeadlessEngine::new();
        engine.set_native_cookie(Cookie::new("a", "1", "x.test"));
        bridge.pull_native_to_jar(&engine, "https://x.test/");
        assert!(engine.calls().is_empty());

        let (bridge, _jar) = bridge_with_jar();
        bridge.push_jar_to_native(&engine, "not a url");
        assert!(engine.calls().is_empty());
        assert!(engine.native_cookie("x.test", "a").is_some());
    }
}
