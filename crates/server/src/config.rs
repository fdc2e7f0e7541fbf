use std::{
    net::{IpAddr, SocketAddr},
    path::Path,
};

use anyhow::{anyhow, Context};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            database_url: "sqlite://./data/dev.db".into(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Layered settings: defaults, then the TOML file (optional), then `APP__*`
/// variables, then the legacy `SERVER_BIND` / `DATABASE_URL` variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()
        .with_context(|| format!("failed to read settings from '{}'", path.display()))?
        .try_deserialize::<Settings>()
        .context("invalid server settings")?;

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }

    Ok(settings)
}

/// Applies `--host` / `--port` on top of the configured bind address.
pub fn resolve_bind_addr(
    bind_addr: &str,
    host: Option<&str>,
    port: Option<u16>,
) -> anyhow::Result<SocketAddr> {
    let mut addr: SocketAddr = bind_addr
        .parse()
        .map_err(|err| anyhow!("invalid bind address '{bind_addr}': {err}"))?;
    if let Some(host) = host {
        let ip: IpAddr = match host {
            "localhost" => IpAddr::from([127, 0, 0, 1]),
            other => other
                .parse()
                .map_err(|err| anyhow!("invalid host '{other}': {err}"))?,
        };
        addr.set_ip(ip);
    }
    if let Some(port) = port {
        addr.set_port(port);
    }
    Ok(addr)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
