use std::{fs, io, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub api_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".into(),
            request_timeout_secs: 10,
        }
    }
}

impl ConsoleSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Reads `path` (a missing file means defaults), then environment overrides.
pub fn load_settings(path: &Path) -> Result<ConsoleSettings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<ConsoleSettings>(&raw)
            .with_context(|| format!("invalid console settings in {}", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => ConsoleSettings::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok())?;
    Ok(settings)
}

/// `APP__*` names win over the legacy `ADMIN_API_URL`.
pub fn apply_env_overrides(
    settings: &mut ConsoleSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(url) = non_empty("ADMIN_API_URL") {
        settings.api_url = url;
    }
    if let Some(url) = non_empty("APP__API_URL") {
        settings.api_url = url;
    }
    if let Some(raw) = non_empty("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS must be whole seconds, got '{raw}'"))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
