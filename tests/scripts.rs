use std::cell::RefCell;
use std::rc::Rc;

use native_webview::{
    EngineCall, HeadlessEngine, JavaScript, NativeNavigationKind, WebView, WebViewError,
    WebViewEvent, WebViewOptions, BRIDGE_SCRIPT,
};

fn scripts_run(webview: &WebView<HeadlessEngine>) -> Vec<String> {
    webview
        .engine()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EngineCall::EvaluateScript(script) => Some(script),
            _ => None,
        })
        .collect()
}

fn names(webview: &WebView<HeadlessEngine>) -> (Rc<RefCell<Vec<&'static str>>>, native_webview::Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let subscription = webview.attach(move |event: &WebViewEvent<'_>| {
        sink.borrow_mut().push(event.name());
    });
    (seen, subscription)
}

#[test]
fn test_scripts_queue_until_initialised() {
    let webview = WebView::new(HeadlessEngine::new(), WebViewOptions::default());
    let (seen, _sub) = names(&webview);

    webview.inject_script("first()").unwrap();
    webview
        .inject_scripts([JavaScript::new("second", "second()")])
        .unwrap();
    assert!(scripts_run(&webview).is_empty());
    assert!(!webview.is_renderer_initialised());

    webview.native_initialized();
    assert_eq!(
        scripts_run(&webview),
        vec![BRIDGE_SCRIPT.to_string(), "first()".to_string(), "second()".to_string()]
    );
    assert_eq!(*seen.borrow(), vec!["renderer_initialised"]);

    // Ready now: scripts run straight away, duplicates included.
    webview.inject_script("first()").unwrap();
    assert_eq!(webview.engine().count(&EngineCall::EvaluateScript("first()".into())), 2);

    // A second initialisation is ignored.
    webview.native_initialized();
    assert_eq!(webview.engine().count(&EngineCall::EvaluateScript(BRIDGE_SCRIPT.into())), 1);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_bridge_can_be_disabled() {
    let options = WebViewOptions::from_json(r#"{"injectBridge": false}"#).unwrap();
    let webview = WebView::new(HeadlessEngine::new(), options);

    webview.native_initialized();
    assert!(scripts_run(&webview).is_empty());
    assert!(webview.is_renderer_initialised());
}

#[tokio::test]
async fn test_evaluate_script_returns_engine_result() {
    let webview = WebView::new(HeadlessEngine::new(), WebViewOptions::default());
    webview.engine().set_script_result("1 + 1", "2");

    assert_eq!(webview.evaluate_script("1 + 1").await.unwrap(), "2");
    assert_eq!(webview.evaluate_script("unknown()").await.unwrap(), "null");
}

#[tokio::test]
async fn test_abandoned_script_is_an_error() {
    let webview = WebView::new(HeadlessEngine::new(), WebViewOptions::default());
    webview.engine().abandon_scripts(true);

    let result = webview.evaluate_script("never()").await;
    assert!(matches!(result, Err(WebViewError::ScriptAbandoned)));
}

#[tokio::test]
async fn test_eval_bypasses_gate() {
    let webview = WebView::new(HeadlessEngine::new(), WebViewOptions::default());
    let (seen, _sub) = names(&webview);

    webview.eval("document.title = 'x'").unwrap();

    assert_eq!(
        webview.engine().loaded_urls(),
        vec!["javascript:document.title = 'x'".to_string()]
    );
    assert!(seen.borrow().is_empty());
    // The engine's callback for the script URL is not gated either.
    let outcome = webview
        .native_navigation_requested("javascript:document.title = 'x'", NativeNavigationKind::Link);
    assert!(outcome.is_proceed());
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_bridge_messages_from_trusted_origins_only() {
    let options =
        WebViewOptions::from_json(r#"{"trustedOrigins": ["https://app.test"]}"#).unwrap();
    let webview = WebView::new(HeadlessEngine::new(), options);
    let messages = Rc::new(RefCell::new(Vec::new()));
    let sink = messages.clone();
    let _sub = webview.attach(move |event: &WebViewEvent<'_>| {
        if let WebViewEvent::BrowserInvocation { message, source_url } = event {
            sink.borrow_mut().push((message.clone(), source_url.clone()));
        }
    });

    webview.native_message("hello", "https://app.test/page");
    webview.native_message("sneaky", "https://evil.test/");

    assert_eq!(
        *messages.borrow(),
        vec![("hello".to_string(), "https://app.test/page".to_string())]
    );
}

#[test]
fn test_progress_is_normalized() {
    let webview = WebView::new(HeadlessEngine::new(), WebViewOptions::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _sub = webview.attach(move |event: &WebViewEvent<'_>| {
        if let WebViewEvent::ProgressChanged(progress) = event {
            sink.borrow_mut().push(progress.percentage());
        }
    });

    webview.native_progress(50.0, 100.0);
    webview.native_progress(1.0, 3.0);
    webview.native_progress(5.0, 0.0);

    assert_eq!(*seen.borrow(), vec![50.0, 33.33, 0.0]);
}

#[test]
fn test_settings_applied_on_creation() {
    let options = WebViewOptions::from_json(r#"{"zoomControlsDisplayed": true}"#).unwrap();
    let webview = WebView::new(HeadlessEngine::new(), options);

    let settings = webview.engine().settings().unwrap();
    assert!(settings.zoom_controls_displayed);
    assert!(settings.javascript_enabled);
}

#[test]
fn test_post_message_waits_for_bridge() {
    let webview = WebView::new(HeadlessEngine::new(), WebViewOptions::default());

    webview.post_message("ping \"1\"").unwrap();
    assert!(scripts_run(&webview).is_empty());

    webview.native_initialized();
    assert_eq!(
        scripts_run(&webview).last().map(String::as_str),
        Some(r#"if (window.__hostMessage__) window.__hostMessage__("ping \"1\"");"#)
    );
}
