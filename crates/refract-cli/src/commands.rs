//! Command implementations.

use crate::surface::OneShotSurface;
use crate::{ConfigureArgs, FetchArgs};
use anyhow::{anyhow, Context, Result};
use refract_app::{
    ui_channel, App, AppConfig, JsonSettingsStore, Settings, SettingsStore,
};
use refract_compose::DEFAULT_COMPOSE_TIMEOUT;
use refract_scrape::Scraper;
use std::fs;
use std::sync::Arc;

/// Open the default settings store, logging instead of failing when the
/// platform has no usable configuration directory.
fn open_store() -> Option<Arc<JsonSettingsStore>> {
    match JsonSettingsStore::default_location() {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            tracing::warn!(error = %err, "unable to prepare settings store");
            None
        }
    }
}

/// Persisted settings, falling back to defaults when loading fails.
fn load_settings(store: Option<&Arc<JsonSettingsStore>>) -> Settings {
    let Some(store) = store else {
        return Settings::default();
    };
    match store.load() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, "unable to load settings, using defaults");
            Settings::default()
        }
    }
}

pub async fn fetch(args: FetchArgs) -> Result<()> {
    let store = open_store();
    let settings = load_settings(store.as_ref()).with_env_overrides();

    let (dispatcher, mut queue) = ui_channel();
    let surface = Arc::new(OneShotSurface::default());

    let app = App::new(AppConfig {
        scraper: Scraper::new(),
        settings,
        compose_timeout: DEFAULT_COMPOSE_TIMEOUT,
        settings_store: store.map(|s| s as Arc<dyn SettingsStore>),
        surface: surface.clone(),
        dispatcher,
    });

    let mode = args.mode.map_or_else(|| app.preferred_mode(), Into::into);
    app.fetch(args.url, mode);

    // This task is the UI context: drain dispatched callbacks until the
    // background fetch completes.
    while !surface.finished() {
        let Some(task) = queue.recv().await else {
            break;
        };
        task();
    }

    if let Some((title, detail)) = surface.take_error() {
        return Err(anyhow!("{title}: {detail}"));
    }

    let html = surface
        .take_rendered()
        .ok_or_else(|| anyhow!("fetch produced no output"))?;

    match args.output {
        Some(path) => {
            fs::write(&path, &html)
                .with_context(|| format!("write rendered page to {}", path.display()))?;
            tracing::info!(path = %path.display(), "rendered page written");
        }
        None => println!("{html}"),
    }

    Ok(())
}

pub fn configure(args: ConfigureArgs) -> Result<()> {
    let store =
        JsonSettingsStore::default_location().context("locate the settings store")?;
    let mut settings = store.load().context("load current settings")?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(api_key) = args.api_key {
        settings.api_key = api_key;
    }
    if let Some(prefer) = args.prefer_composed {
        settings.prefer_composed = prefer;
    }

    let settings = settings.trimmed();
    store.save(&settings).context("persist settings")?;

    let available = !settings.base_url.is_empty();
    if settings.prefer_composed && !available {
        println!("Preference saved, but no composer endpoint is configured");
    } else if available {
        println!("Composer configured");
    } else {
        println!("Composer disabled");
    }

    Ok(())
}

pub fn show() -> Result<()> {
    let store = open_store();
    let settings = load_settings(store.as_ref()).with_env_overrides();

    println!("base_url:        {}", display_or_unset(&settings.base_url));
    println!("model:           {}", display_or_unset(&settings.model));
    println!(
        "api_key:         {}",
        if settings.api_key.is_empty() { "(unset)" } else { "(set)" }
    );
    println!("prefer_composed: {}", settings.prefer_composed);

    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
