//! Shared session state.
//!
//! One instance per running session, owned by the orchestrator and guarded
//! by a reader/writer lock. The lock is held only long enough to copy or
//! replace fields, never across network I/O.

use crate::settings::Settings;
use parking_lot::RwLock;
use refract_compose::{ComposeConfig, Composer};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How a fetched page is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// HTML produced by the composer endpoint.
    Composed,
    /// HTML produced by the deterministic reader template.
    Template,
}

struct SessionState {
    compose_config: ComposeConfig,
    prefer_composed: bool,
    /// Mode recorded by the most recent explicit action or rate-limit
    /// demotion; `None` until the first decision.
    sticky_mode: Option<RenderMode>,
    /// URL of the last page that actually loaded; relative navigations
    /// resolve against it.
    last_source: Option<Url>,
    composer: Arc<Composer>,
}

/// Mutex-guarded session state shared between the UI and background fetches.
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    /// Initialize session state from startup settings.
    #[must_use]
    pub fn new(settings: &Settings, compose_timeout: Duration) -> Self {
        let compose_config = settings.to_compose_config(compose_timeout);
        let composer = Arc::new(Composer::new(compose_config.clone()));
        Self {
            state: RwLock::new(SessionState {
                compose_config,
                prefer_composed: settings.prefer_composed,
                sticky_mode: None,
                last_source: None,
                composer,
            }),
        }
    }

    /// The current composer client.
    #[must_use]
    pub fn composer(&self) -> Arc<Composer> {
        self.state.read().composer.clone()
    }

    /// Whether the current composer is configured.
    #[must_use]
    pub fn composer_available(&self) -> bool {
        self.state.read().composer.available()
    }

    /// Whether plain navigations default to composed rendering.
    #[must_use]
    pub fn prefer_composed(&self) -> bool {
        self.state.read().prefer_composed
    }

    /// The sticky mode, if any decision has been recorded yet.
    #[must_use]
    pub fn sticky_mode(&self) -> Option<RenderMode> {
        self.state.read().sticky_mode
    }

    /// Record `mode` as the sticky mode for subsequent navigations.
    pub fn record_mode(&self, mode: RenderMode) {
        self.state.write().sticky_mode = Some(mode);
    }

    /// Record the URL of a page that finished loading.
    pub fn record_source(&self, url: Url) {
        self.state.write().last_source = Some(url);
    }

    /// URL of the last successfully loaded page.
    #[must_use]
    pub fn last_source(&self) -> Option<Url> {
        self.state.read().last_source.clone()
    }

    /// Mode decision for an in-page navigation.
    ///
    /// Returns `(attempted, effective)`: the attempted mode is the sticky
    /// mode when set, otherwise the configured default preference. The
    /// effective mode demotes `Composed` to `Template` while the composer
    /// is unavailable; the demotion applies to this request only.
    #[must_use]
    pub fn navigation_modes(&self) -> (RenderMode, RenderMode) {
        let state = self.state.read();
        let attempted = state.sticky_mode.unwrap_or(if state.prefer_composed {
            RenderMode::Composed
        } else {
            RenderMode::Template
        });
        let effective = if attempted == RenderMode::Composed && state.composer.available() {
            RenderMode::Composed
        } else {
            RenderMode::Template
        };
        (attempted, effective)
    }

    /// Replace the composer configuration and default preference.
    ///
    /// The new composer is built before the lock is taken; the swap itself
    /// is a single write-lock acquisition, so in-flight fetches observe
    /// either the old or the new client, never a mix.
    pub fn apply_settings(&self, settings: &Settings, compose_timeout: Duration) {
        let compose_config = settings.to_compose_config(compose_timeout);
        let composer = Arc::new(Composer::new(compose_config.clone()));

        let mut state = self.state.write();
        state.compose_config = compose_config;
        state.prefer_composed = settings.prefer_composed;
        state.composer = composer;
    }

    /// Current configuration as a `Settings` value.
    #[must_use]
    pub fn settings_snapshot(&self) -> Settings {
        let state = self.state.read();
        Settings {
            base_url: state.compose_config.base_url.clone(),
            model: state.compose_config.model.clone(),
            api_key: state.compose_config.api_key.clone(),
            prefer_composed: state.prefer_composed,
        }
    }
}
