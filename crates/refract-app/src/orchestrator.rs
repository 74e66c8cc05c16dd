//! Render orchestration.
//!
//! Sequences extraction, optional composition, and template rendering for
//! every request, and owns the shared session state. Each request runs on a
//! background task; all UI-visible effects go through the dispatch queue.

use crate::dispatch::UiDispatcher;
use crate::navigate::resolve_target;
use crate::render::render_template;
use crate::session::{RenderMode, Session};
use crate::settings::{Settings, SettingsError, SettingsStore};
use crate::surface::Surface;
use refract_compose::DEFAULT_COMPOSE_TIMEOUT;
use refract_scrape::Scraper;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for [`App::new`].
pub struct AppConfig {
    /// Page extractor.
    pub scraper: Scraper,
    /// Startup settings (already overlaid with environment overrides).
    pub settings: Settings,
    /// Timeout for composition requests.
    pub compose_timeout: Duration,
    /// Optional persistence for settings updates.
    pub settings_store: Option<Arc<dyn SettingsStore>>,
    /// The surface receiving rendered output.
    pub surface: Arc<dyn Surface>,
    /// Handle for scheduling work onto the UI context.
    pub dispatcher: UiDispatcher,
}

impl AppConfig {
    /// Config with default timeouts and no persistence.
    #[must_use]
    pub fn new(surface: Arc<dyn Surface>, dispatcher: UiDispatcher) -> Self {
        Self {
            scraper: Scraper::new(),
            settings: Settings::default(),
            compose_timeout: DEFAULT_COMPOSE_TIMEOUT,
            settings_store: None,
            surface,
            dispatcher,
        }
    }
}

/// Drives the fetch/compose/render pipeline for one session.
///
/// Cheap to clone; clones share the same session state.
#[derive(Clone)]
pub struct App {
    scraper: Arc<Scraper>,
    session: Arc<Session>,
    dispatcher: UiDispatcher,
    surface: Arc<dyn Surface>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    compose_timeout: Duration,
}

impl App {
    /// Build the orchestrator and initialize session state from
    /// `config.settings`.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let session = Session::new(&config.settings, config.compose_timeout);
        Self {
            scraper: Arc::new(config.scraper),
            session: Arc::new(session),
            dispatcher: config.dispatcher,
            surface: config.surface,
            settings_store: config.settings_store,
            compose_timeout: config.compose_timeout,
        }
    }

    /// The session state shared with this orchestrator.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Start a fetch for an explicit user action.
    ///
    /// The action's mode is recorded as the sticky mode and used as-is.
    pub fn fetch(&self, target: impl Into<String>, mode: RenderMode) {
        self.session.record_mode(mode);
        self.set_status("Scraping...");
        self.spawn_fetch(target.into(), mode);
    }

    /// Mode a plain "go" action should use: the configured default
    /// preference, gated by composer availability.
    #[must_use]
    pub fn preferred_mode(&self) -> RenderMode {
        if self.session.prefer_composed() && self.session.composer_available() {
            RenderMode::Composed
        } else {
            RenderMode::Template
        }
    }

    /// Handle an in-page navigation attempt reported by the surface.
    ///
    /// Returns `true` when the attempt was intercepted and a fetch started;
    /// the surface must then suppress its default navigation. Unresolvable
    /// targets return `false` and are left to the surface.
    pub fn on_navigation_attempt(&self, raw_target: &str) -> bool {
        let last_source = self.session.last_source();
        let Some(resolved) = resolve_target(raw_target, last_source.as_ref()) else {
            tracing::debug!(target = raw_target, "navigation target rejected");
            return false;
        };

        let (attempted, effective) = self.session.navigation_modes();
        // The sticky record keeps the attempted mode; availability demotion
        // applies to this request only.
        self.session.record_mode(attempted);

        self.set_status("Scraping...");
        self.spawn_fetch(resolved.into(), effective);
        true
    }

    /// Atomically apply new settings and rebuild the composer, then persist
    /// them when a store is configured.
    ///
    /// A persistence failure is returned to the caller but does not roll
    /// back the in-memory update; the session proceeds with the new
    /// settings.
    pub fn update_settings(&self, settings: Settings) -> Result<(), SettingsError> {
        let settings = settings.trimmed();
        self.session.apply_settings(&settings, self.compose_timeout);
        tracing::info!(
            composer_available = self.session.composer_available(),
            prefer_composed = settings.prefer_composed,
            "settings applied"
        );

        if let Some(store) = &self.settings_store {
            store.save(&settings)?;
        }
        Ok(())
    }

    fn spawn_fetch(&self, target: String, mode: RenderMode) {
        let app = self.clone();
        tokio::spawn(async move {
            app.run_fetch(target, mode).await;
        });
    }

    async fn run_fetch(&self, target: String, mode: RenderMode) {
        let _busy = BusyGuard::engage(&self.dispatcher, &self.surface);

        let page = match self.scraper.fetch(&target).await {
            Ok(page) => page,
            Err(err) => {
                self.report_error("Scrape failed", &err.to_string());
                return;
            }
        };

        // Recorded even if composition fails below, so later relative
        // navigations resolve against the page that actually loaded.
        self.session.record_source(page.source_url.clone());

        if mode == RenderMode::Composed {
            let composer = self.session.composer();
            if composer.available() {
                match composer.compose(&page).await {
                    Ok(html) => {
                        self.present(page.source_url.as_str(), html);
                        return;
                    }
                    Err(err) if err.is_rate_limited() => {
                        tracing::warn!(error = %err, "composer rate limited, falling back to reader view");
                        self.set_status("Composer rate limited, showing reader view");
                        self.session.record_mode(RenderMode::Template);
                    }
                    Err(err) => {
                        self.report_error("Compose failed", &err.to_string());
                        return;
                    }
                }
            }
        }

        match render_template(&page) {
            Ok(html) => self.present(page.source_url.as_str(), html),
            Err(err) => self.report_error("Render error", &err.to_string()),
        }
    }

    fn present(&self, base_uri: &str, html: String) {
        let surface = self.surface.clone();
        let base_uri = base_uri.to_string();
        self.dispatcher.dispatch(move || {
            surface.render_html(&html, &base_uri);
            surface.set_status("Done");
        });
    }

    fn report_error(&self, title: &str, detail: &str) {
        tracing::error!("{title}: {detail}");
        let surface = self.surface.clone();
        let title = title.to_string();
        let detail = detail.to_string();
        self.dispatcher.dispatch(move || {
            surface.show_error(&title, &detail);
            surface.set_status("Error");
        });
    }

    fn set_status(&self, text: &str) {
        let surface = self.surface.clone();
        let text = text.to_string();
        self.dispatcher.dispatch(move || surface.set_status(&text));
    }
}

/// Toggles the busy indicator on for the lifetime of a fetch task.
///
/// Dropping the guard enqueues the off toggle, so every exit path of
/// `run_fetch` restores the indicator.
struct BusyGuard {
    dispatcher: UiDispatcher,
    surface: Arc<dyn Surface>,
}

impl BusyGuard {
    fn engage(dispatcher: &UiDispatcher, surface: &Arc<dyn Surface>) -> Self {
        let on_surface = surface.clone();
        dispatcher.dispatch(move || on_surface.set_busy(true));
        Self {
            dispatcher: dispatcher.clone(),
            surface: surface.clone(),
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let surface = self.surface.clone();
        self.dispatcher.dispatch(move || surface.set_busy(false));
    }
}
