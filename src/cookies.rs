//! Cookie model and the host-owned cookie jar.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;

/// Which store a cookie was last read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CookieSource {
    #[default]
    Jar,
    Native,
}

/// A browser cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// `None` for session cookies.
    pub expires: Option<SystemTime>,
    pub secure: bool,
    pub http_only: bool,
    pub source: CookieSource,
}

impl Cookie {
    /// Create a new session cookie
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: normalize_domain(domain),
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
            source: CookieSource::Jar,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| at <= SystemTime::now())
    }

    /// Mark the cookie as already expired.
    pub fn expire(&mut self) {
        self.expires = Some(UNIX_EPOCH);
    }

    /// Check if the cookie applies to a URL (domain, path and secure flag).
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if !domain_matches(&self.domain, host) {
            return false;
        }
        if !url.path().starts_with(&self.path) {
            return false;
        }
        !self.secure || url.scheme() == "https"
    }

    /// Parse a `Set-Cookie` style string. `Domain` defaults to
    /// `default_domain`; `Max-Age` is the only expiry attribute honoured.
    pub fn parse(header: &str, default_domain: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut cookie = Cookie::new(name, value.trim(), default_domain);

        for part in parts {
            let part = part.trim();
            match part.split_once('=') {
                Some((attr, val)) => match attr.trim().to_ascii_lowercase().as_str() {
                    "domain" if !val.trim().is_empty() => {
                        cookie.domain = normalize_domain(val.trim())
                    }
                    "path" if !val.trim().is_empty() => cookie.path = val.trim().to_string(),
                    "max-age" => {
                        if let Ok(secs) = val.trim().parse::<i64>() {
                            cookie.expires = Some(match u64::try_from(secs) {
                                Ok(secs) if secs > 0 => {
                                    SystemTime::now() + Duration::from_secs(secs)
                                }
                                _ => UNIX_EPOCH,
                            });
                        }
                    }
                    _ => {}
                },
                None => match part.to_ascii_lowercase().as_str() {
                    "secure" => cookie.secure = true,
                    "httponly" => cookie.http_only = true,
                    _ => {}
                },
            }
        }

        Some(cookie)
    }

    /// Serialize for a native `set_cookie` call.
    pub fn to_cookie_string(&self) -> String {
        let mut out = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if let Some(expires) = self.expires {
            let remaining = expires
                .duration_since(SystemTime::now())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            out.push_str(&format!("; Max-Age={}", remaining));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }

    /// A cookie string that makes the native store drop `name` immediately.
    pub fn expiry_string(name: &str) -> String {
        format!("{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT", name)
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim_start_matches('.').to_ascii_lowercase()
}

fn domain_matches(domain: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Cookie jar owned by the host document or session.
///
/// Cookies are indexed by domain, then upserted by `(path, name)`. The
/// webview control only mediates; it never decides when cookies die.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CookieJar {
    cookies: HashMap<String, Vec<Cookie>>,
}

/// Handle through which the host and the control share one jar.
pub type SharedCookieJar = Rc<RefCell<CookieJar>>;

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedCookieJar {
        Rc::new(RefCell::new(self))
    }

    /// Add or replace a cookie. Adding an expired cookie removes it.
    pub fn add(&mut self, cookie: Cookie) {
        if cookie.is_expired() {
            self.remove(&cookie.domain, &cookie.name);
            return;
        }
        let entries = self.cookies.entry(cookie.domain.clone()).or_default();
        match entries
            .iter_mut()
            .find(|c| c.name == cookie.name && c.path == cookie.path)
        {
            Some(existing) => *existing = cookie,
            None => entries.push(cookie),
        }
    }

    /// Remove every cookie called `name` for `domain`.
    pub fn remove(&mut self, domain: &str, name: &str) {
        let domain = normalize_domain(domain);
        if let Some(entries) = self.cookies.get_mut(&domain) {
            entries.retain(|c| c.name != name);
            if entries.is_empty() {
                self.cookies.remove(&domain);
            }
        }
    }

    /// Live cookies that apply to `url`.
    pub fn cookies_for(&self, url: &Url) -> Vec<Cookie> {
        self.cookies
            .values()
            .flatten()
            .filter(|c| !c.is_expired() && c.matches(url))
            .cloned()
            .collect()
    }

    /// Mutable access to the live cookies that apply to `url`.
    pub fn cookies_for_mut<'a>(&'a mut self, url: &'a Url) -> impl Iterator<Item = &'a mut Cookie> {
        self.cookies
            .values_mut()
            .flatten()
            .filter(move |c| !c.is_expired() && c.matches(url))
    }

    pub fn get(&self, domain: &str, name: &str) -> Option<&Cookie> {
        self.cookies
            .get(&normalize_domain(domain))?
            .iter()
            .find(|c| c.name == name && !c.is_expired())
    }

    /// Drop cookies whose expiry has passed.
    pub fn purge_expired(&mut self) {
        for entries in self.cookies.values_mut() {
            entries.retain(|c| !c.is_expired());
        }
        self.cookies.retain(|_, entries| !entries.is_empty());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.cookies.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
