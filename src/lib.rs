//! Embeddable web view control over a pluggable native engine.
//!
//! [`WebView`] sits between a host application and a native web view. It
//! classifies navigations, gates them through observers that may cancel or
//! defer them, keeps a host-owned [`CookieJar`] in sync with the engine's
//! cookie store and mirrors back/forward state. Platform backends implement
//! [`NativeEngine`] and forward their callbacks to the `native_*` methods.

mod cookie_bridge;
mod cookies;
mod error;
mod events;
mod gate;
mod navigation;
mod options;
pub mod platform;
mod policy;
mod progress;
mod script;
mod source;
mod webview;

pub use cookie_bridge::{resolve_cookie_uri, CookieBridge, MAX_COOKIE_URL_LEN};
pub use cookies::{Cookie, CookieJar, CookieSource, SharedCookieJar};
pub use error::{EngineError, Result, WebViewError};
pub use events::{
    Deferral, NavigatedEvent, NavigatingEvent, Observer, Subscription, WebViewEvent,
};
pub use gate::{NativeNavigation, PendingNavigation};
pub use navigation::{
    IntentSequencer, NativeNavigationKind, NavigationIntent, NavigationRequest, NavigationState,
};
pub use options::{MixedContentMode, WebViewOptions, WebViewSettings};
pub use platform::headless::{EngineCall, HeadlessEngine};
pub use platform::{NativeEngine, ScriptCallback, LOCAL_BASE_URL};
pub use policy::{extract_origin, is_host_allowed, is_origin_trusted};
pub use progress::Progress;
pub use script::{js_string_literal, JavaScript, BRIDGE_SCRIPT};
pub use source::{HtmlSource, WebViewSource};
pub use webview::WebView;
