//! Deferred cancellation gate.
//!
//! Every cancellable navigation passes through [`WebView::evaluate_navigation`]
//! (commands issued by the host) or [`WebView::native_navigation_requested`]
//! (navigations started by the page). Both share the same pipeline:
//! structural guards, cookie push, the `Navigating` dispatch, then an
//! optional wait on the observer's deferral.

use std::fmt;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::Result;
use crate::events::{NavigatingEvent, WebViewEvent};
use crate::navigation::{NativeNavigationKind, NavigationIntent, NavigationRequest};
use crate::platform::{NativeEngine, LOCAL_BASE_URL};
use crate::policy::is_host_allowed;
use crate::webview::WebView;

/// Outcome of the synchronous half of an evaluation.
pub(crate) enum Verdict {
    /// Nothing to cancel: blank target or no live control.
    Unguarded,
    /// The reserved local base address.
    LocalContent,
    /// Host outside `allowedHosts`.
    Blocked,
    Decided { proceed: bool },
    Deferred(PendingDecision),
}

/// A decision an observer deferred during dispatch.
pub(crate) struct PendingDecision {
    url: String,
    intent: NavigationIntent,
    decision: oneshot::Receiver<bool>,
    cancelled: bool,
}

impl PendingDecision {
    /// Wait for the deferral. A token dropped without a decision lets the
    /// navigation proceed unless it was also cancelled synchronously.
    async fn wait(self) -> bool {
        match self.decision.await {
            Ok(proceed) => proceed && !self.cancelled,
            Err(_) => {
                warn!(url = %self.url, "deferral dropped without a decision, proceeding");
                !self.cancelled
            }
        }
    }
}

impl<E: NativeEngine> WebView<E> {
    /// Run `url` through the gate with the current intent. Resolves to
    /// `true` when the navigation may proceed.
    ///
    /// The deferral wait happens after the `Navigating` dispatch has
    /// returned, so observers never see the wait on their own stack.
    pub async fn evaluate_navigation(&self, url: &str) -> bool {
        let request = NavigationRequest::new(url, self.intent(), true);
        let proceed = match self.begin_evaluation(request) {
            Verdict::Unguarded => true,
            Verdict::LocalContent | Verdict::Blocked => false,
            Verdict::Decided { proceed } => proceed,
            Verdict::Deferred(pending) => {
                let url = pending.url.clone();
                let proceed = pending.wait().await;
                self.conclude(&url, proceed)
            }
        };
        self.refresh_navigation_state();
        proceed
    }

    /// Synchronous native "should this navigation happen" hook. `kind` is
    /// what the engine reports it is doing, independent of the intent the
    /// last command recorded.
    ///
    /// A `Deferred` result means the backend must stop the native navigation
    /// now and hand the [`PendingNavigation`] to its executor; the control
    /// re-issues the navigation itself once it is approved.
    pub fn native_navigation_requested(
        &self,
        url: &str,
        kind: NativeNavigationKind,
    ) -> NativeNavigation<E> {
        if self.take_approval(url) {
            return NativeNavigation::Proceed;
        }
        let request = NavigationRequest::new(url, self.intent(), true);
        let outcome = match self.begin_evaluation(request) {
            // The engine is already committed to hosting local content.
            Verdict::Unguarded | Verdict::LocalContent => NativeNavigation::Proceed,
            Verdict::Blocked => NativeNavigation::Cancel,
            Verdict::Decided { proceed: true } => NativeNavigation::Proceed,
            Verdict::Decided { proceed: false } => NativeNavigation::Cancel,
            Verdict::Deferred(pending) => {
                return NativeNavigation::Deferred(PendingNavigation {
                    webview: self.clone(),
                    kind,
                    pending,
                });
            }
        };
        self.refresh_navigation_state();
        outcome
    }

    pub(crate) fn begin_evaluation(&self, request: NavigationRequest) -> Verdict {
        let url = request.url();
        if self.is_disposed() || url.trim().is_empty() {
            return Verdict::Unguarded;
        }
        if url == LOCAL_BASE_URL {
            debug!("suppressing navigation to the local base address");
            return Verdict::LocalContent;
        }
        let allowed = self.inner.options.allowed_hosts.as_deref().unwrap_or_default();
        if !is_host_allowed(allowed, url) {
            debug!(url, "navigation blocked by host allowlist");
            self.publish(&WebViewEvent::NavigationBlocked {
                url: url.to_string(),
            });
            return Verdict::Blocked;
        }

        // Observers must see the cookie state the page will get.
        self.inner.cookies.push_jar_to_native(&self.inner.engine, url);

        let navigating = NavigatingEvent::new(request);
        self.publish(&WebViewEvent::Navigating(&navigating));

        let url = navigating.url();
        match navigating.take_decision() {
            Some(decision) => Verdict::Deferred(PendingDecision {
                url: url.to_string(),
                intent: navigating.intent(),
                decision,
                cancelled: navigating.is_cancelled(),
            }),
            None => Verdict::Decided {
                proceed: self.conclude(url, !navigating.is_cancelled()),
            },
        }
    }

    /// Publish the cancellation when vetoed. A control disposed while the
    /// decision was pending has no owner left and lets the navigation go.
    pub(crate) fn conclude(&self, url: &str, proceed: bool) -> bool {
        if self.is_disposed() {
            return true;
        }
        if !proceed {
            debug!(url, "navigation cancelled by observer");
            self.publish(&WebViewEvent::NavigationCancelled {
                url: url.to_string(),
            });
        }
        proceed
    }
}

/// Answer to [`WebView::native_navigation_requested`].
pub enum NativeNavigation<E: NativeEngine> {
    Proceed,
    Cancel,
    /// Stop the native navigation; the decision is still pending.
    Deferred(PendingNavigation<E>),
}

impl<E: NativeEngine> NativeNavigation<E> {
    pub fn is_proceed(&self) -> bool {
        matches!(self, NativeNavigation::Proceed)
    }
}

impl<E: NativeEngine> fmt::Debug for NativeNavigation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeNavigation::Proceed => f.write_str("Proceed"),
            NativeNavigation::Cancel => f.write_str("Cancel"),
            NativeNavigation::Deferred(pending) => {
                f.debug_tuple("Deferred").field(&pending.url()).finish()
            }
        }
    }
}

/// A page-initiated navigation waiting on an observer's deferral.
#[must_use = "the navigation is lost unless the pending decision is resolved"]
pub struct PendingNavigation<E: NativeEngine> {
    webview: WebView<E>,
    kind: NativeNavigationKind,
    pending: PendingDecision,
}

impl<E: NativeEngine> PendingNavigation<E> {
    pub fn url(&self) -> &str {
        &self.pending.url
    }

    /// Intent observers saw on the `Navigating` event.
    pub fn intent(&self) -> NavigationIntent {
        self.pending.intent
    }

    pub fn kind(&self) -> NativeNavigationKind {
        self.kind
    }

    /// Wait for the decision and, when approved, re-issue the navigation the
    /// way the engine started it. Resolves to whether it was re-issued.
    pub async fn resolve(self) -> Result<bool> {
        let PendingNavigation {
            webview,
            kind,
            pending,
        } = self;
        let url = pending.url.clone();

        let proceed = pending.wait().await;
        let proceed = webview.conclude(&url, proceed);
        webview.refresh_navigation_state();
        if !proceed {
            return Ok(false);
        }
        webview.ensure_live()?;

        let engine = webview.engine();
        webview.approve(&url);
        let reissued = match kind {
            NativeNavigationKind::Back => engine.go_back(),
            NativeNavigationKind::Forward => engine.go_forward(),
            NativeNavigationKind::Reload => engine.reload(),
            NativeNavigationKind::Link => engine.load_url(&url),
        };
        if let Err(err) = reissued {
            webview.take_approval(&url);
            return Err(err.into());
        }
        Ok(true)
    }
}
