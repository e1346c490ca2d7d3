//! Native engine seam.
//!
//! A backend wraps one native web view (WKWebView, WebView2, Android
//! WebView, wry, ...) and implements [`NativeEngine`]. The backend also
//! forwards its native callbacks to the `native_*` methods of
//! [`WebView`](crate::WebView).

pub mod headless;

use crate::error::EngineError;
use crate::options::WebViewSettings;

/// Base URL used to host HTML loaded through `load_html` when the caller
/// gives none. Navigations to exactly this URL never enter the cancellation
/// pipeline.
///
/// On Windows, custom schemes are mapped to `https://<scheme>.localhost/`
/// by WebView2, so the mapped form is used directly.
#[cfg(target_os = "windows")]
pub const LOCAL_BASE_URL: &str = "https://nativewebview.localhost/";
#[cfg(not(target_os = "windows"))]
pub const LOCAL_BASE_URL: &str = "nativewebview://localhost/";

/// Receives the stringified result of a script evaluation. Called at most
/// once; dropping it uncalled means the evaluation was abandoned.
pub type ScriptCallback = Box<dyn FnOnce(String)>;

/// Capabilities the control needs from a native web view.
///
/// All methods are called on the owning UI thread. Implementations must not
/// call back into the control synchronously from `set_cookie` or
/// `cookies_for_url`.
pub trait NativeEngine {
    fn load_url(&self, url: &str) -> Result<(), EngineError>;

    fn load_data(
        &self,
        html: &str,
        base_url: &str,
        mime_type: &str,
        encoding: &str,
    ) -> Result<(), EngineError>;

    fn go_back(&self) -> Result<(), EngineError>;

    fn go_forward(&self) -> Result<(), EngineError>;

    fn reload(&self) -> Result<(), EngineError>;

    fn stop_loading(&self) {}

    fn can_go_back(&self) -> bool;

    fn can_go_forward(&self) -> bool;

    /// URL of the page currently shown, if any.
    fn current_url(&self) -> Option<String>;

    /// Evaluate `script` and hand the engine's JSON-ish result (or its error
    /// payload) to `on_result`.
    fn evaluate_script(&self, script: &str, on_result: ScriptCallback);

    /// Cookies the native store holds for `url`, in `Cookie` header form:
    /// `name=value` pairs, either one per entry or joined with `;` as
    /// Android's `CookieManager.getCookie` returns them. No attributes.
    fn cookies_for_url(&self, url: &str) -> Vec<String>;

    fn set_cookie(&self, domain: &str, cookie: &str);

    fn apply_settings(&self, _settings: &WebViewSettings) {}
}
