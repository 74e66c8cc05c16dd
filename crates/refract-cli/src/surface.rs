//! Headless rendering surface for one-shot CLI runs.

use refract_app::Surface;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Captures the single render or failure of a one-shot fetch.
///
/// The busy indicator turning off marks the end of the background fetch;
/// the main loop drains the UI queue until then.
#[derive(Default)]
pub struct OneShotSurface {
    rendered: Mutex<Option<String>>,
    error: Mutex<Option<(String, String)>>,
    finished: AtomicBool,
}

impl OneShotSurface {
    /// Whether the fetch has completed (successfully or not).
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// The rendered HTML, if the fetch succeeded.
    pub fn take_rendered(&self) -> Option<String> {
        self.rendered.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
    }

    /// The surfaced failure, if any.
    pub fn take_error(&self) -> Option<(String, String)> {
        self.error.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
    }
}

impl Surface for OneShotSurface {
    fn render_html(&self, html: &str, base_uri: &str) {
        tracing::debug!(base_uri, bytes = html.len(), "render received");
        *self.rendered.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(html.to_string());
    }

    fn show_error(&self, title: &str, detail: &str) {
        *self.error.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some((title.to_string(), detail.to_string()));
    }

    fn set_status(&self, text: &str) {
        tracing::info!("{text}");
    }

    fn set_busy(&self, busy: bool) {
        if !busy {
            self.finished.store(true, Ordering::SeqCst);
        }
    }
}
