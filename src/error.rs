use thiserror::Error;

/// Failure reported by a native engine backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct EngineError {
    reason: String,
}

impl EngineError {
    pub fn from_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Error)]
pub enum WebViewError {
    #[error("webview has been disposed")]
    Disposed,

    #[error("native engine command failed: {0}")]
    Engine(#[from] EngineError),

    /// The engine dropped the result callback without ever calling it.
    #[error("script evaluation was abandoned by the native engine")]
    ScriptAbandoned,

    #[error("invalid webview options: {0}")]
    Options(#[from] serde_json::Error),
}

pub type Result<T, E = WebViewError> = std::result::Result<T, E>;
