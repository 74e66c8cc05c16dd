//! End-to-end orchestration tests: mock page server, mock composer
//! endpoint, a recording surface, and a manually drained UI queue.
//!
//! Run with: cargo test -p refract-app --test app_end_to_end_tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use refract_app::{
    ui_channel, App, AppConfig, RenderMode, Settings, SettingsError, SettingsStore, Surface,
    UiQueue,
};
use refract_scrape::Scraper;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingSurface {
    rendered: Mutex<Vec<(String, String)>>,
    errors: Mutex<Vec<(String, String)>>,
    statuses: Mutex<Vec<String>>,
    busy: Mutex<Vec<bool>>,
}

impl RecordingSurface {
    fn rendered(&self) -> Vec<(String, String)> {
        self.rendered.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }

    fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    fn completed_fetches(&self) -> usize {
        self.busy.lock().unwrap().iter().filter(|busy| !**busy).count()
    }
}

impl Surface for RecordingSurface {
    fn render_html(&self, html: &str, base_uri: &str) {
        self.rendered
            .lock()
            .unwrap()
            .push((html.to_string(), base_uri.to_string()));
    }

    fn show_error(&self, title: &str, detail: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((title.to_string(), detail.to_string()));
    }

    fn set_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }

    fn set_busy(&self, busy: bool) {
        self.busy.lock().unwrap().push(busy);
    }
}

/// Execute UI tasks until `fetches` background fetches have completed
/// (each fetch toggles the busy indicator off exactly once at the end).
async fn pump_until_done(queue: &mut UiQueue, surface: &Arc<RecordingSurface>, fetches: usize) {
    while surface.completed_fetches() < fetches {
        let task = timeout(Duration::from_secs(10), queue.recv())
            .await
            .expect("ui queue timed out")
            .expect("ui queue closed");
        task();
    }
}

async fn page_server() -> MockServer {
    let server = MockServer::start().await;
    let long = "This opening paragraph carries well over forty characters of content.";
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><head><title>Start</title></head><body>
               <h1>Welcome</h1>
               <p>{long}</p>
               <a href="/next">Next</a>
            </body></html>"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Next Page</title></head><body><h1>Second</h1></body></html>",
        ))
        .mount(&server)
        .await;
    server
}

fn composed_body(content: &str) -> serde_json::Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

struct Harness {
    app: App,
    surface: Arc<RecordingSurface>,
    queue: UiQueue,
}

fn harness(settings: Settings, store: Option<Arc<dyn SettingsStore>>) -> Harness {
    let (dispatcher, queue) = ui_channel();
    let surface = Arc::new(RecordingSurface::default());
    let app = App::new(AppConfig {
        scraper: Scraper::new(),
        settings,
        compose_timeout: Duration::from_secs(5),
        settings_store: store,
        surface: surface.clone(),
        dispatcher,
    });
    Harness {
        app,
        surface,
        queue,
    }
}

fn compose_settings(base_url: &str) -> Settings {
    Settings {
        base_url: base_url.to_string(),
        model: "test-model".to_string(),
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_composed_fetch_renders_composer_output() {
    let pages = page_server().await;
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(composed_body("<html><body>Composed view</body></html>")),
        )
        .mount(&llm)
        .await;

    let mut h = harness(compose_settings(&llm.uri()), None);
    let page_url = format!("{}/page", pages.uri());
    h.app.fetch(page_url.as_str(), RenderMode::Composed);
    pump_until_done(&mut h.queue, &h.surface, 1).await;

    let rendered = h.surface.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].0, "<html><body>Composed view</body></html>");
    assert_eq!(rendered[0].1, page_url);
    assert!(h.surface.errors().is_empty());
    assert_eq!(h.app.session().sticky_mode(), Some(RenderMode::Composed));
    assert_eq!(h.surface.statuses().last().map(String::as_str), Some("Done"));
}

#[tokio::test]
async fn test_rate_limited_composer_falls_back_to_template_and_demotes_sticky_mode() {
    let pages = page_server().await;
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&llm)
        .await;

    let mut h = harness(compose_settings(&llm.uri()), None);
    h.app.fetch(format!("{}/page", pages.uri()), RenderMode::Composed);
    pump_until_done(&mut h.queue, &h.surface, 1).await;

    // The reader template was rendered instead, with no surfaced failure.
    let rendered = h.surface.rendered();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].0.contains("Key Headings"));
    assert!(rendered[0].0.contains("Welcome"));
    assert!(h.surface.errors().is_empty());

    // Subsequent navigations stay in template mode even though the user
    // had selected composed.
    assert_eq!(h.app.session().sticky_mode(), Some(RenderMode::Template));
    assert_eq!(
        h.app.session().navigation_modes(),
        (RenderMode::Template, RenderMode::Template)
    );
    assert!(h
        .surface
        .statuses()
        .iter()
        .any(|status| status.contains("rate limited")));
}

#[tokio::test]
async fn test_other_composer_failure_surfaces_error_without_rendering() {
    let pages = page_server().await;
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&llm)
        .await;

    let mut h = harness(compose_settings(&llm.uri()), None);
    h.app.fetch(format!("{}/page", pages.uri()), RenderMode::Composed);
    pump_until_done(&mut h.queue, &h.surface, 1).await;

    assert!(h.surface.rendered().is_empty());
    let errors = h.surface.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "Compose failed");
    // The failed composition does not demote the sticky mode.
    assert_eq!(h.app.session().sticky_mode(), Some(RenderMode::Composed));
    assert_eq!(h.surface.statuses().last().map(String::as_str), Some("Error"));
}

#[tokio::test]
async fn test_template_fetch_never_calls_composer() {
    let pages = page_server().await;
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(composed_body("<p>no</p>")))
        .expect(0)
        .mount(&llm)
        .await;

    let mut h = harness(compose_settings(&llm.uri()), None);
    h.app.fetch(format!("{}/page", pages.uri()), RenderMode::Template);
    pump_until_done(&mut h.queue, &h.surface, 1).await;

    let rendered = h.surface.rendered();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].0.contains("Key Headings"));
    assert!(h.surface.errors().is_empty());
}

#[tokio::test]
async fn test_scrape_failure_reports_error_and_skips_template() {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&pages)
        .await;

    let mut h = harness(Settings::default(), None);
    h.app.fetch(format!("{}/page", pages.uri()), RenderMode::Template);
    pump_until_done(&mut h.queue, &h.surface, 1).await;

    assert!(h.surface.rendered().is_empty());
    let errors = h.surface.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "Scrape failed");
    // A failed fetch records no source for relative navigation.
    assert_eq!(h.app.session().last_source(), None);
}

#[tokio::test]
async fn test_navigation_resolves_relative_target_against_loaded_page() {
    let pages = page_server().await;

    let mut h = harness(Settings::default(), None);
    h.app.fetch(format!("{}/page", pages.uri()), RenderMode::Template);
    pump_until_done(&mut h.queue, &h.surface, 1).await;

    assert!(h.app.on_navigation_attempt("/next"));
    pump_until_done(&mut h.queue, &h.surface, 2).await;

    let rendered = h.surface.rendered();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[1].1, format!("{}/next", pages.uri()));
    assert!(rendered[1].0.contains("Next Page"));
}

#[tokio::test]
async fn test_navigation_rejects_unsafe_or_unresolvable_targets() {
    let pages = page_server().await;

    let mut h = harness(Settings::default(), None);

    // No page has loaded yet: relative targets cannot resolve.
    assert!(!h.app.on_navigation_attempt("/next"));

    h.app.fetch(format!("{}/page", pages.uri()), RenderMode::Template);
    pump_until_done(&mut h.queue, &h.surface, 1).await;

    assert!(!h.app.on_navigation_attempt("javascript:alert(1)"));
    assert!(!h.app.on_navigation_attempt(""));
    assert_eq!(h.surface.rendered().len(), 1);
}

struct FailingStore;

impl SettingsStore for FailingStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(Settings::default())
    }

    fn save(&self, _settings: &Settings) -> Result<(), SettingsError> {
        Err(SettingsError::NoConfigDir)
    }
}

#[tokio::test]
async fn test_settings_persist_failure_keeps_in_memory_update() {
    let h = harness(Settings::default(), Some(Arc::new(FailingStore)));
    assert!(!h.app.session().composer_available());

    let result = h.app.update_settings(compose_settings("http://localhost:11434"));
    assert!(result.is_err());

    // The session proceeds with the new settings despite the failed save.
    assert!(h.app.session().composer_available());
    assert_eq!(
        h.app.session().settings_snapshot().base_url,
        "http://localhost:11434"
    );
}

#[tokio::test]
async fn test_preferred_mode_gated_by_availability() {
    let prefer = Settings {
        prefer_composed: true,
        ..Settings::default()
    };
    let h = harness(prefer, None);
    // Preference is set but no endpoint is configured.
    assert_eq!(h.app.preferred_mode(), RenderMode::Template);

    h.app
        .update_settings(Settings {
            prefer_composed: true,
            ..compose_settings("http://localhost:11434")
        })
        .unwrap();
    assert_eq!(h.app.preferred_mode(), RenderMode::Composed);
}
