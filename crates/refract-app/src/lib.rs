//! # Refract Application Core
//!
//! Wires the extraction and composition pipeline behind a UI surface:
//! session state with a sticky render mode, per-request mode decisions, the
//! asymmetric rate-limit fallback, navigation resolution, the deterministic
//! reader template, settings persistence, and the UI-thread dispatch queue.
//!
//! The rendering surface itself is a capability (see [`Surface`]): it
//! accepts raw HTML and reports navigation attempts back to the [`App`].
//! Everything UI-visible is mutated by enqueueing callbacks onto the
//! [`UiQueue`], never directly from a background task.

pub mod dispatch;
pub mod navigate;
pub mod orchestrator;
pub mod render;
pub mod session;
pub mod settings;
pub mod surface;

pub use dispatch::{ui_channel, UiDispatcher, UiQueue};
pub use navigate::resolve_target;
pub use orchestrator::{App, AppConfig};
pub use render::{render_template, RenderError};
pub use session::{RenderMode, Session};
pub use settings::{JsonSettingsStore, Settings, SettingsError, SettingsStore};
pub use surface::Surface;
