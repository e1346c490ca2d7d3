use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cookie_bridge::CookieBridge;
use crate::cookies::SharedCookieJar;
use crate::error::{Result, WebViewError};
use crate::events::{NavigatedEvent, Observer, ObserverSet, Subscription, WebViewEvent};
use crate::navigation::{IntentSequencer, NavigationIntent, NavigationState};
use crate::options::WebViewOptions;
use crate::platform::{NativeEngine, LOCAL_BASE_URL};
use crate::policy::is_origin_trusted;
use crate::progress::Progress;
use crate::script::{host_message_script, JavaScript, ScriptQueue, BRIDGE_SCRIPT};
use crate::source::WebViewSource;

/// An embeddable web view driving one native engine.
///
/// The control is a cheap handle: clones share the same state. It is
/// `!Send` and must be used from the thread that owns the native view.
pub struct WebView<E: NativeEngine> {
    pub(crate) inner: Rc<Inner<E>>,
}

pub(crate) struct Inner<E> {
    pub(crate) engine: E,
    pub(crate) options: WebViewOptions,
    pub(crate) trusted_origins: Vec<String>,
    pub(crate) sequencer: IntentSequencer,
    pub(crate) state: Cell<NavigationState>,
    pub(crate) cookies: CookieBridge,
    pub(crate) observers: Rc<ObserverSet>,
    pub(crate) scripts: ScriptQueue,
    pub(crate) source: RefCell<Option<WebViewSource>>,
    /// A navigation the control already approved; the next matching native
    /// navigation request passes through without re-entering the gate.
    /// Cleared by the next navigation command or page-finished callback.
    pub(crate) approved: RefCell<Option<String>>,
    pub(crate) disposed: Cell<bool>,
}

impl<E: NativeEngine> Clone for WebView<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: NativeEngine> fmt::Debug for WebView<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebView")
            .field("intent", &self.intent())
            .field("state", &self.navigation_state())
            .field("source", &self.inner.source.borrow())
            .field("observers", &self.inner.observers.len())
            .field("queued_scripts", &self.inner.scripts.pending_len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<E: NativeEngine> WebView<E> {
    /// Wrap `engine` and apply the settings resolved from `options`.
    pub fn new(engine: E, options: WebViewOptions) -> Self {
        engine.apply_settings(&options.settings());
        let trusted_origins = options.normalized_trusted_origins();
        Self {
            inner: Rc::new(Inner {
                engine,
                options,
                trusted_origins,
                sequencer: IntentSequencer::new(),
                state: Cell::new(NavigationState::default()),
                cookies: CookieBridge::new(),
                observers: Rc::new(ObserverSet::default()),
                scripts: ScriptQueue::default(),
                source: RefCell::new(None),
                approved: RefCell::new(None),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn with_cookie_jar(self, jar: SharedCookieJar) -> Self {
        self.set_cookie_jar(Some(jar));
        self
    }

    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    pub fn options(&self) -> &WebViewOptions {
        &self.inner.options
    }

    /// Attach an observer for every event this control publishes. It stays
    /// attached until the returned subscription is dropped or the control is
    /// disposed.
    pub fn attach(&self, observer: impl Observer + 'static) -> Subscription {
        self.inner.observers.attach(Rc::new(observer))
    }

    /// Replace the jar mediated by this control. `None` disables cookie sync.
    pub fn set_cookie_jar(&self, jar: Option<SharedCookieJar>) {
        self.inner.cookies.set_jar(jar);
    }

    pub fn cookie_jar(&self) -> Option<SharedCookieJar> {
        self.inner.cookies.jar()
    }

    /// Intent recorded by the last command.
    pub fn intent(&self) -> NavigationIntent {
        self.inner.sequencer.current()
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.inner.state.get()
    }

    pub fn can_go_back(&self) -> bool {
        self.navigation_state().can_go_back
    }

    pub fn can_go_forward(&self) -> bool {
        self.navigation_state().can_go_forward
    }

    pub fn source(&self) -> Option<WebViewSource> {
        self.inner.source.borrow().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn is_renderer_initialised(&self) -> bool {
        self.inner.scripts.is_ready()
    }

    // ── Content loading ──

    /// Navigate to `url` through the cancellation gate. Resolves to `false`
    /// when the navigation was vetoed or suppressed.
    pub async fn load(&self, url: &str) -> Result<bool> {
        self.begin_command()?;
        self.inner.sequencer.record(NavigationIntent::NewPage);
        if !self.evaluate_navigation(url).await {
            return Ok(false);
        }
        // The control may have been torn down while a deferral was pending.
        self.ensure_live()?;
        self.forward_load(url)?;
        self.publish(&WebViewEvent::UrlChanged(url.to_string()));
        Ok(true)
    }

    /// Load an HTML document. Local content is never cancellable, so the gate
    /// is bypassed. A `title` is published through `UrlChanged`.
    pub fn load_html(&self, html: &str, base_url: Option<&str>, title: Option<&str>) -> Result<()> {
        self.begin_command()?;
        let base_url = base_url.unwrap_or(LOCAL_BASE_URL);
        self.inner.sequencer.record(NavigationIntent::NewPage);
        self.approve(base_url);
        if let Err(err) = self
            .inner
            .engine
            .load_data(html, base_url, "text/html", "UTF-8")
        {
            self.inner.approved.take();
            return Err(err.into());
        }
        if let Some(title) = title {
            self.publish(&WebViewEvent::UrlChanged(title.to_string()));
        }
        Ok(())
    }

    /// Store `source` and load it. Resolves to whether the content was
    /// handed to the engine.
    pub async fn set_source(&self, source: WebViewSource) -> Result<bool> {
        self.ensure_live()?;
        *self.inner.source.borrow_mut() = Some(source.clone());
        let loaded = match source {
            WebViewSource::Url(url) => self.load(&url).await?,
            WebViewSource::Html(html) => {
                self.load_html(&html.html, html.base_url.as_deref(), html.title.as_deref())?;
                true
            }
        };
        self.refresh_navigation_state();
        Ok(loaded)
    }

    // ── History ──

    /// Step back in history. When the engine cannot go back this only
    /// republishes the unchanged back/forward state.
    pub fn go_back(&self) -> Result<()> {
        self.begin_command()?;
        let result = if self.inner.engine.can_go_back() {
            self.inner.sequencer.record(NavigationIntent::Back);
            self.inner.engine.go_back()
        } else {
            Ok(())
        };
        self.refresh_navigation_state();
        Ok(result?)
    }

    pub fn go_forward(&self) -> Result<()> {
        self.begin_command()?;
        let result = if self.inner.engine.can_go_forward() {
            self.inner.sequencer.record(NavigationIntent::Forward);
            self.inner.engine.go_forward()
        } else {
            Ok(())
        };
        self.refresh_navigation_state();
        Ok(result?)
    }

    /// Reload the current page after pushing the jar for its URL.
    pub fn reload(&self) -> Result<()> {
        self.begin_command()?;
        if let Some(url) = self.inner.engine.current_url() {
            self.inner.cookies.push_jar_to_native(&self.inner.engine, &url);
        }
        self.inner.sequencer.record(NavigationIntent::Refresh);
        self.inner.engine.reload()?;
        Ok(())
    }

    // ── Scripts ──

    /// Run `script` as a `javascript:` navigation. Fire-and-forget; the gate
    /// is not consulted.
    pub fn eval(&self, script: &str) -> Result<()> {
        self.begin_command()?;
        self.inner.sequencer.record(NavigationIntent::NewPage);
        self.forward_load(&format!("javascript:{}", script))
    }

    /// Evaluate `script` and resolve to the engine's stringified result. An
    /// engine-side script error arrives as the engine's own error payload.
    pub async fn evaluate_script(&self, script: &str) -> Result<String> {
        self.ensure_live()?;
        let (sender, receiver) = oneshot::channel();
        self.inner.engine.evaluate_script(
            script,
            Box::new(move |result| {
                let _ = sender.send(result);
            }),
        );
        receiver.await.map_err(|_| {
            warn!("native engine dropped a script evaluation without a result");
            WebViewError::ScriptAbandoned
        })
    }

    /// Run `script` once. Before the renderer is initialised it is queued and
    /// runs right after initialisation. Injecting the same script twice runs
    /// it twice.
    pub fn inject_script(&self, script: impl Into<String>) -> Result<()> {
        self.ensure_live()?;
        if let Some(script) = self.inner.scripts.submit(script.into()) {
            self.run_script(&script);
        }
        Ok(())
    }

    /// Send `message` to the page. Pages receive it as a `hostmessage`
    /// event once the bridge script is installed.
    pub fn post_message(&self, message: &str) -> Result<()> {
        self.inject_script(host_message_script(message))
    }

    pub fn inject_scripts(&self, scripts: impl IntoIterator<Item = JavaScript>) -> Result<()> {
        for script in scripts {
            debug!(name = %script.name, "injecting script");
            self.inject_script(script.source)?;
        }
        Ok(())
    }

    /// Tear the control down: stop loading, detach every observer and drop
    /// queued scripts. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.engine.stop_loading();
        self.inner.observers.clear();
        self.inner.scripts.clear();
        self.inner.approved.take();
        debug!("webview disposed");
    }

    // ── Native callbacks ──

    /// The engine finished loading `url`.
    pub fn native_page_finished(&self, url: &str) {
        if self.is_disposed() {
            return;
        }
        // Engines that never call back for programmatic loads leave the
        // approval unconsumed; it must not outlive the load it was for.
        self.inner.approved.take();
        self.inner.cookies.pull_native_to_jar(&self.inner.engine, url);
        if !self.hosts_local_content(url) {
            // Mirror only; assigning the field does not trigger a load.
            *self.inner.source.borrow_mut() = Some(WebViewSource::url(url));
        }
        self.refresh_navigation_state();
        self.publish(&WebViewEvent::Navigated(NavigatedEvent {
            url: url.to_string(),
            intent: self.intent(),
        }));
    }

    /// Raw progress tick from the engine.
    pub fn native_progress(&self, raw: f64, maximum: f64) {
        if self.is_disposed() {
            return;
        }
        self.publish(&WebViewEvent::ProgressChanged(Progress::new(raw, maximum)));
    }

    /// The engine is ready to run scripts: inject the bridge and everything
    /// queued so far, then publish `RendererInitialised`.
    pub fn native_initialized(&self) {
        if self.is_disposed() {
            return;
        }
        if self.inner.scripts.is_ready() {
            debug!("renderer already initialised");
            return;
        }
        let queued = self.inner.scripts.mark_ready();
        if self.inner.options.inject_bridge() {
            self.run_script(BRIDGE_SCRIPT);
        }
        for script in &queued {
            self.run_script(script);
        }
        self.publish(&WebViewEvent::RendererInitialised);
    }

    /// A message posted by the page through the bridge. Dropped unless its
    /// source origin is trusted.
    pub fn native_message(&self, message: &str, source_url: &str) {
        if self.is_disposed() {
            return;
        }
        if !is_origin_trusted(&self.inner.trusted_origins, source_url) {
            debug!(source_url, "dropping bridge message from untrusted origin");
            return;
        }
        self.publish(&WebViewEvent::BrowserInvocation {
            message: message.to_string(),
            source_url: source_url.to_string(),
        });
    }

    // ── Internals ──

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(WebViewError::Disposed);
        }
        Ok(())
    }

    /// Entry check for navigation commands. A new command supersedes any
    /// approval the engine has not consumed yet.
    fn begin_command(&self) -> Result<()> {
        self.ensure_live()?;
        self.inner.approved.take();
        Ok(())
    }

    pub(crate) fn publish(&self, event: &WebViewEvent<'_>) {
        self.inner.observers.publish(event);
    }

    /// Re-read back/forward capability from the engine and republish it,
    /// changed or not.
    pub(crate) fn refresh_navigation_state(&self) {
        if self.is_disposed() {
            return;
        }
        let state = NavigationState {
            can_go_back: self.inner.engine.can_go_back(),
            can_go_forward: self.inner.engine.can_go_forward(),
        };
        self.inner.state.set(state);
        self.publish(&WebViewEvent::CanGoBackChanged(state.can_go_back));
        self.publish(&WebViewEvent::CanGoForwardChanged(state.can_go_forward));
    }

    /// Hand an already approved URL to the engine.
    pub(crate) fn forward_load(&self, url: &str) -> Result<()> {
        self.approve(url);
        if let Err(err) = self.inner.engine.load_url(url) {
            self.inner.approved.take();
            return Err(err.into());
        }
        Ok(())
    }

    pub(crate) fn approve(&self, url: &str) {
        *self.inner.approved.borrow_mut() = Some(url.to_string());
    }

    pub(crate) fn take_approval(&self, url: &str) -> bool {
        let mut approved = self.inner.approved.borrow_mut();
        if approved.as_deref() == Some(url) {
            *approved = None;
            return true;
        }
        false
    }

    fn run_script(&self, script: &str) {
        self.inner.engine.evaluate_script(script, Box::new(|_| {}));
    }

    fn hosts_local_content(&self, url: &str) -> bool {
        match &*self.inner.source.borrow() {
            Some(WebViewSource::Html(html)) => {
                html.base_url.as_deref().unwrap_or(LOCAL_BASE_URL) == url
            }
            _ => url == LOCAL_BASE_URL,
        }
    }
}
