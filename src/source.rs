/// What a webview shows: a remote URL or a local HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebViewSource {
    Url(String),
    Html(HtmlSource),
}

/// Local HTML content. `base_url` resolves relative paths inside the
/// document and defaults to [`LOCAL_BASE_URL`](crate::platform::LOCAL_BASE_URL).
/// `title`, when set, is published through `UrlChanged` once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlSource {
    pub html: String,
    pub base_url: Option<String>,
    pub title: Option<String>,
}

impl WebViewSource {
    pub fn url(url: impl Into<String>) -> Self {
        WebViewSource::Url(url.into())
    }

    pub fn html(html: impl Into<String>) -> Self {
        WebViewSource::Html(HtmlSource {
            html: html.into(),
            ..Default::default()
        })
    }

    /// Set the base URL of an HTML source. No effect on URL sources.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        if let WebViewSource::Html(source) = &mut self {
            source.base_url = Some(base_url.into());
        }
        self
    }

    /// Set the title of an HTML source. No effect on URL sources.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        if let WebViewSource::Html(source) = &mut self {
            source.title = Some(title.into());
        }
        self
    }
}

impl From<&str> for WebViewSource {
    fn from(url: &str) -> Self {
        WebViewSource::url(url)
    }
}
