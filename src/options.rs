use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::extract_origin;

/// Options for creating a new webview control.
///
/// Every field is optional so hosts can pass a partial JSON object; missing
/// fields fall back to the defaults documented on each field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebViewOptions {
    /// Trusted origins for page-to-host bridge messages.
    /// When set, only messages whose source URL origin matches one of these
    /// entries are published as `BrowserInvocation` events. Each entry is a
    /// full origin, e.g. `"https://example.com"`.
    pub trusted_origins: Option<Vec<String>>,
    /// Allowed hosts for navigation restriction.
    /// When set and non-empty, navigations are restricted to URLs whose host
    /// matches one of these patterns. `"*.example.com"` matches any subdomain
    /// of example.com and example.com itself. When unset or empty, all hosts
    /// are allowed.
    pub allowed_hosts: Option<Vec<String>>,
    /// Inject the `window.invokeNative` bridge once the engine is ready.
    /// Default: true
    pub inject_bridge: Option<bool>,
    /// Deny file and content access in the engine. Default: false
    pub hardening: Option<bool>,
    /// Allow link previews (long-press / force-touch). Default: false
    pub allows_link_preview: Option<bool>,
    /// Mixed content handling. Default: `never`
    pub mixed_content: Option<MixedContentMode>,
    /// Enable pinch and control zoom. Default: true
    pub zoom_controls_enabled: Option<bool>,
    /// Show the on-screen zoom controls. Default: false
    pub zoom_controls_displayed: Option<bool>,
}

/// How the engine treats insecure subresources on secure pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MixedContentMode {
    #[default]
    Never,
    Always,
    Compatibility,
}

/// Resolved engine settings, handed to the backend once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebViewSettings {
    pub javascript_enabled: bool,
    pub dom_storage_enabled: bool,
    pub support_multiple_windows: bool,
    pub allow_file_access: bool,
    pub allow_file_access_from_file_urls: bool,
    pub allow_content_access: bool,
    pub allows_link_preview: bool,
    pub mixed_content: MixedContentMode,
    pub zoom_enabled: bool,
    pub zoom_controls_displayed: bool,
}

impl WebViewOptions {
    /// Parse options from a JSON object such as
    /// `{"allowedHosts": ["*.example.com"], "hardening": true}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Trusted origins normalized through [`extract_origin`], so values like
    /// `"HTTPS://Example.Com:443"` compare equal to `"https://example.com"`.
    /// Entries that are not valid origins are dropped.
    pub fn normalized_trusted_origins(&self) -> Vec<String> {
        self.trusted_origins
            .iter()
            .flatten()
            .filter_map(|o| extract_origin(o))
            .collect()
    }

    pub fn inject_bridge(&self) -> bool {
        self.inject_bridge.unwrap_or(true)
    }

    pub fn settings(&self) -> WebViewSettings {
        let hardening = self.hardening.unwrap_or(false);
        WebViewSettings {
            javascript_enabled: true,
            dom_storage_enabled: true,
            support_multiple_windows: true,
            allow_file_access: !hardening,
            allow_file_access_from_file_urls: !hardening,
            allow_content_access: !hardening,
            allows_link_preview: self.allows_link_preview.unwrap_or(false),
            mixed_content: self.mixed_content.unwrap_or_default(),
            zoom_enabled: self.zoom_controls_enabled.unwrap_or(true),
            zoom_controls_displayed: self.zoom_controls_displayed.unwrap_or(false),
        }
    }
}

impl Default for WebViewSettings {
    fn default() -> Self {
        WebViewOptions::default().settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WebViewOptions::default().settings();
        assert!(settings.javascript_enabled);
        assert!(settings.allow_file_access);
        assert!(settings.zoom_enabled);
        assert!(!settings.zoom_controls_displayed);
        assert_eq!(settings.mixed_content, MixedContentMode::Never);
    }

    #[test]
    fn test_from_json() {
        let options = WebViewOptions::from_json(
            r#"{"allowedHosts": ["*.example.com"], "hardening": true, "mixedContent": "compatibility"}"#,
        )
        .unwrap();
        assert_eq!(options.allowed_hosts, Some(vec!["*.example.com".to_string()]));

        let settings = options.settings();
        assert!(!settings.allow_file_access);
        assert!(!settings.allow_content_access);
        assert_eq!(settings.mixed_content, MixedContentMode::Compatibility);
        assert!(options.inject_bridge());
    }

    #[test]
    fn test_invalid_json() {
        assert!(WebViewOptions::from_json(r#"{"hardening": "yes"}"#).is_err());
    }

    #[test]
    fn test_trusted_origins_normalized() {
        let options = WebViewOptions {
            trusted_origins: Some(vec![
                "HTTPS://Example.Com:443".to_string(),
                "not a url".to_string(),
            ]),
            ..Default::default()
        };
        assert_eq!(
            options.normalized_trusted_origins(),
            vec!["https://example.com".to_string()]
        );
    }
}
