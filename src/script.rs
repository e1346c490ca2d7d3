use std::cell::{Cell, RefCell};

use tracing::debug;

/// Installs `window.invokeNative(data)`, which forwards strings (or JSON
/// for anything else) to the host through the engine's IPC channel. The
/// backend routes those messages to `WebView::native_message`. Messages
/// from the host arrive as `hostmessage` events on `window`.
pub const BRIDGE_SCRIPT: &str = r#"(function () {
  if (window.invokeNative) return;
  window.invokeNative = function (data) {
    var payload = typeof data === "string" ? data : JSON.stringify(data);
    window.ipc.postMessage(payload);
  };
  window.__hostMessage__ = function (data) {
    window.dispatchEvent(new MessageEvent("hostmessage", { data: data }));
  };
})();"#;

/// Quote `value` as a JavaScript string literal.
pub fn js_string_literal(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Script delivering `message` to the page as a `hostmessage` event.
/// A page without the bridge ignores it.
pub(crate) fn host_message_script(message: &str) -> String {
    format!(
        "if (window.__hostMessage__) window.__hostMessage__({});",
        js_string_literal(message)
    )
}

/// A named script registered for injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaScript {
    pub name: String,
    pub source: String,
}

impl JavaScript {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Scripts registered before the engine finished initializing.
#[derive(Debug, Default)]
pub(crate) struct ScriptQueue {
    ready: Cell<bool>,
    pending: RefCell<Vec<String>>,
}

impl ScriptQueue {
    pub(crate) fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Returns the script back when it can run now, otherwise queues it.
    pub(crate) fn submit(&self, script: String) -> Option<String> {
        if self.ready.get() {
            return Some(script);
        }
        debug!(queued = self.pending.borrow().len() + 1, "engine not ready, queueing script");
        self.pending.borrow_mut().push(script);
        None
    }

    /// Mark the engine ready and hand back every queued script, once.
    pub(crate) fn mark_ready(&self) -> Vec<String> {
        self.ready.set(true);
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub(crate) fn clear(&self) {
        self.pending.borrow_mut().clear();
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }
}
