use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_API_URL: &str =
    "https://restcountries.com/v3.1/all?fields=name,capital,population,flags";
pub const SETTINGS_FILE: &str = "countries.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            search_debounce_ms: 150,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Defaults, then `countries.toml` in the working directory, then the
/// environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    let file = read_settings_file(Path::new(SETTINGS_FILE))?;
    Ok(settings_from_sources(file.as_deref(), |key| {
        std::env::var(key).ok()
    }))
}

fn read_settings_file(path: &Path) -> anyhow::Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))
}

pub fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) {
            if let Some(v) = file_cfg.get("api_url").and_then(toml::Value::as_str) {
                settings.api_url = v.to_string();
            }
            if let Some(v) = file_cfg.get("search_debounce_ms").and_then(as_u64) {
                settings.search_debounce_ms = v;
            }
            if let Some(v) = file_cfg.get("request_timeout_secs").and_then(as_u64) {
                settings.request_timeout_secs = v;
            }
        }
    }

    if let Some(v) = env("COUNTRIES_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__COUNTRIES_API_URL") {
        settings.api_url = v;
    }

    settings
}

fn as_u64(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(v) => u64::try_from(*v).ok(),
        toml::Value::String(v) => v.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
