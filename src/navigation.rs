//! Navigation intent tracking and the back/forward state mirror.

use std::cell::Cell;

/// Why the next navigation is happening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NavigationIntent {
    #[default]
    NewPage,
    Back,
    Forward,
    Refresh,
}

/// What the engine says it is doing when it asks to navigate. Decides how
/// an approved deferred navigation is re-issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NativeNavigationKind {
    /// Link click, form submission, script or redirect.
    #[default]
    Link,
    Back,
    Forward,
    Reload,
}

/// A navigation about to be evaluated by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    url: String,
    intent: NavigationIntent,
    can_cancel: bool,
}

impl NavigationRequest {
    pub fn new(url: impl Into<String>, intent: NavigationIntent, can_cancel: bool) -> Self {
        Self {
            url: url.into(),
            intent,
            can_cancel,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn intent(&self) -> NavigationIntent {
        self.intent
    }

    pub fn can_cancel(&self) -> bool {
        self.can_cancel
    }
}

/// Remembers the intent recorded by the last command so a native
/// "navigation started" signal can be classified.
///
/// Reading does not clear: the engine may ask several times during one
/// navigation (redirects, client-side routing).
#[derive(Debug, Default)]
pub struct IntentSequencer {
    intent: Cell<NavigationIntent>,
}

impl IntentSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, intent: NavigationIntent) {
        self.intent.set(intent);
    }

    pub fn current(&self) -> NavigationIntent {
        self.intent.get()
    }
}

/// Mirror of the engine's back/forward capability. The engine stays
/// authoritative; this is refreshed after every navigation-affecting call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub can_go_back: bool,
    pub can_go_forward: bool,
}
