use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tokio::sync::oneshot;
use tracing::{error, warn};

use crate::navigation::{NavigationIntent, NavigationRequest};
use crate::progress::Progress;

/// Notifications published by a [`WebView`](crate::WebView).
///
/// `Navigating` borrows its payload for the duration of the dispatch only.
#[derive(Debug)]
pub enum WebViewEvent<'a> {
    /// A navigation is about to happen. Observers may cancel it or take a
    /// [`Deferral`] and decide later.
    Navigating(&'a NavigatingEvent),
    Navigated(NavigatedEvent),
    NavigationCancelled { url: String },
    /// The target host is outside `allowedHosts`.
    NavigationBlocked { url: String },
    ProgressChanged(Progress),
    /// Carries the URL after `load`, or the title given to `load_html`.
    /// Observers can only tell the two apart by content.
    UrlChanged(String),
    CanGoBackChanged(bool),
    CanGoForwardChanged(bool),
    RendererInitialised,
    /// A message the page posted through `window.invokeNative`.
    BrowserInvocation { message: String, source_url: String },
}

impl WebViewEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            WebViewEvent::Navigating(_) => "navigating",
            WebViewEvent::Navigated(_) => "navigated",
            WebViewEvent::NavigationCancelled { .. } => "navigation_cancelled",
            WebViewEvent::NavigationBlocked { .. } => "navigation_blocked",
            WebViewEvent::ProgressChanged(_) => "progress_changed",
            WebViewEvent::UrlChanged(_) => "url_changed",
            WebViewEvent::CanGoBackChanged(_) => "can_go_back_changed",
            WebViewEvent::CanGoForwardChanged(_) => "can_go_forward_changed",
            WebViewEvent::RendererInitialised => "renderer_initialised",
            WebViewEvent::BrowserInvocation { .. } => "browser_invocation",
        }
    }
}

/// Payload of [`WebViewEvent::Navigated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatedEvent {
    pub url: String,
    pub intent: NavigationIntent,
}

/// Payload of [`WebViewEvent::Navigating`].
///
/// Lives only for the synchronous dispatch. An observer that needs to
/// decide asynchronously takes a [`Deferral`] during dispatch and completes
/// it later; at most one deferral can be taken per event.
#[derive(Debug)]
pub struct NavigatingEvent {
    request: NavigationRequest,
    cancelled: Cell<bool>,
    deferral_requested: Cell<bool>,
    decision: RefCell<Option<oneshot::Receiver<bool>>>,
}

impl NavigatingEvent {
    pub(crate) fn new(request: NavigationRequest) -> Self {
        Self {
            request,
            cancelled: Cell::new(false),
            deferral_requested: Cell::new(false),
            decision: RefCell::new(None),
        }
    }

    pub fn request(&self) -> &NavigationRequest {
        &self.request
    }

    pub fn url(&self) -> &str {
        self.request.url()
    }

    pub fn intent(&self) -> NavigationIntent {
        self.request.intent()
    }

    pub fn can_cancel(&self) -> bool {
        self.request.can_cancel()
    }

    /// Veto the navigation synchronously.
    pub fn cancel(&self) {
        if !self.can_cancel() {
            warn!(url = self.url(), "ignoring cancel on a non-cancellable navigation");
            return;
        }
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Take the single deferral for this navigation. Returns `None` when the
    /// navigation cannot be cancelled or a deferral was already taken.
    pub fn get_deferral(&self) -> Option<Deferral> {
        if !self.can_cancel() {
            return None;
        }
        if self.deferral_requested.replace(true) {
            warn!(url = self.url(), "deferral already taken for this navigation");
            return None;
        }
        let (sender, receiver) = oneshot::channel();
        *self.decision.borrow_mut() = Some(receiver);
        Some(Deferral { sender })
    }

    pub fn is_deferral_requested(&self) -> bool {
        self.deferral_requested.get()
    }

    pub(crate) fn take_decision(&self) -> Option<oneshot::Receiver<bool>> {
        self.decision.borrow_mut().take()
    }
}

/// Single-use token for an asynchronous navigation decision.
///
/// `complete` consumes the token, so a decision can only be delivered once.
/// Dropping the token uncompleted aborts the wait and the navigation
/// proceeds.
#[must_use = "dropping a deferral without completing it lets the navigation proceed"]
pub struct Deferral {
    sender: oneshot::Sender<bool>,
}

impl Deferral {
    /// `true` lets the navigation proceed, `false` cancels it.
    pub fn complete(self, proceed: bool) {
        // The gate may already be gone (control disposed); nothing to do then.
        let _ = self.sender.send(proceed);
    }
}

impl fmt::Debug for Deferral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferral")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Receives every event published by the control it is attached to.
pub trait Observer {
    fn on_event(&self, event: &WebViewEvent<'_>);
}

impl<F> Observer for F
where
    F: Fn(&WebViewEvent<'_>),
{
    fn on_event(&self, event: &WebViewEvent<'_>) {
        self(event)
    }
}

/// Observers attached to one control.
#[derive(Default)]
pub(crate) struct ObserverSet {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Rc<dyn Observer>)>>,
}

impl ObserverSet {
    pub(crate) fn attach(self: &Rc<Self>, observer: Rc<dyn Observer>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, observer));
        Subscription {
            set: Rc::downgrade(self),
            id,
        }
    }

    fn detach(&self, id: u64) {
        self.entries.borrow_mut().retain(|(entry, _)| *entry != id);
    }

    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Deliver `event` to every observer attached when dispatch starts.
    /// Observers may attach, detach or issue commands while handling it.
    /// A panicking observer is logged and skipped.
    pub(crate) fn publish(&self, event: &WebViewEvent<'_>) {
        let observers: Vec<Rc<dyn Observer>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event))).is_err() {
                error!(event = event.name(), "observer panicked while handling event");
            }
        }
    }
}

/// Keeps an observer attached. Dropping it (or calling
/// [`detach`](Subscription::detach)) removes the observer.
#[must_use = "the observer is detached as soon as the subscription is dropped"]
pub struct Subscription {
    set: Weak<ObserverSet>,
    id: u64,
}

impl Subscription {
    pub fn detach(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(set) = self.set.upgrade() {
            set.detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
