//! Rendering surface capability.

/// A rendering surface the orchestrator drives.
///
/// Implementations accept raw HTML and reflect request status. Every method
/// is invoked on the UI context via the dispatch queue, so implementations
/// can assume single-threaded access to their own widgets.
///
/// Each surface instance owns its navigation-handler registration: when the
/// user triggers an in-page navigation, the surface calls
/// [`crate::App::on_navigation_attempt`] with the raw target and suppresses
/// its default navigation exactly when that returns `true`. No global
/// registry of surfaces exists.
pub trait Surface: Send + Sync {
    /// Replace the displayed document with `html`, resolved against `base_uri`.
    fn render_html(&self, html: &str, base_uri: &str);

    /// Present a failure to the user without replacing the document.
    fn show_error(&self, title: &str, detail: &str);

    /// Update the status line.
    fn set_status(&self, text: &str);

    /// Toggle the busy indicator.
    fn set_busy(&self, busy: bool);
}
