use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;

const DEFAULT_ENV_PREFIX: &str = "LANBLOG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("lanblog/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_page_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.server.base_url.is_empty() {
        base.server.base_url = other.server.base_url;
    }
    if !other.server.user_agent.is_empty() {
        base.server.user_agent = other.server.user_agent;
    }

    if !other.feed.poll_interval.is_zero() {
        base.feed.poll_interval = other.feed.poll_interval;
    }
    if other.feed.page_limit != 0 {
        base.feed.page_limit = other.feed.page_limit;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "server.base_url" => cfg.server.base_url = value,
        "server.user_agent" => cfg.server.user_agent = value,
        "feed.poll_interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.poll_interval = duration;
            }
        }
        "feed.page_limit" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.feed.page_limit = parsed;
            }
        }
        "ui.theme" => cfg.ui.theme = value,
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lanblog").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/lanblog.yaml")),
            env_prefix: Some("LANBLOG_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.server.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.feed.poll_interval, Duration::from_secs(15));
        assert_eq!(cfg.feed.page_limit, 10);
        assert_eq!(cfg.ui.theme, "default");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "server:\n  base_url: http://10.0.0.5:8080\nfeed:\n  poll_interval: 30s\n",
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("LANBLOG_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.server.base_url, "http://10.0.0.5:8080");
        assert_eq!(cfg.feed.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.feed.page_limit, 10);
    }

    #[test]
    fn env_overrides() {
        env::set_var("LANBLOG_TEST_ENV_FEED__POLL_INTERVAL", "45s");
        env::set_var("LANBLOG_TEST_ENV_UI__THEME", "mono");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/lanblog.yaml")),
            env_prefix: Some("LANBLOG_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.feed.poll_interval, Duration::from_secs(45));
        assert_eq!(cfg.ui.theme, "mono");
        env::remove_var("LANBLOG_TEST_ENV_FEED__POLL_INTERVAL");
        env::remove_var("LANBLOG_TEST_ENV_UI__THEME");
    }
}
