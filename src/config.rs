use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::Settings;

const DEFAULT_ENV_PREFIX: &str = "REPOST_CHECK";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn controller_settings(&self) -> Settings {
        Settings {
            image_step_delay: self.progress.image_step_delay,
            reddit_step_delay: self.progress.reddit_step_delay,
            report_dismiss_after: self.report.dismiss_after,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    crate::api::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("repost-check/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressConfig {
    #[serde(default = "default_image_step_delay", with = "humantime_serde")]
    pub image_step_delay: Duration,
    #[serde(default = "default_reddit_step_delay", with = "humantime_serde")]
    pub reddit_step_delay: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            image_step_delay: default_image_step_delay(),
            reddit_step_delay: default_reddit_step_delay(),
        }
    }
}

fn default_image_step_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_reddit_step_delay() -> Duration {
    Duration::from_secs(2)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "default_dismiss_after", with = "humantime_serde")]
    pub dismiss_after: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dismiss_after: default_dismiss_after(),
        }
    }
}

fn default_dismiss_after() -> Duration {
    Duration::from_millis(1500)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: default_log_file(),
        }
    }
}

fn default_log_filter() -> String {
    "repost_check=info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("repost-check").join("repost-check.log"))
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
    apply_env(&mut cfg, prefix);

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
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.timeout.is_zero() {
        base.api.timeout = other.api.timeout;
    }

    base.progress.image_step_delay = other.progress.image_step_delay;
    base.progress.reddit_step_delay = other.progress.reddit_step_delay;
    base.report.dismiss_after = other.report.dismiss_after;

    if !other.logging.filter.is_empty() {
        base.logging.filter = other.logging.filter;
    }
    if other.logging.file.is_some() {
        base.logging.file = other.logging.file;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    let duration = |value: &str| humantime::parse_duration(value.trim()).ok();
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Some(parsed) = duration(&value) {
                cfg.api.timeout = parsed;
            }
        }
        "progress.image_step_delay" => {
            if let Some(parsed) = duration(&value) {
                cfg.progress.image_step_delay = parsed;
            }
        }
        "progress.reddit_step_delay" => {
            if let Some(parsed) = duration(&value) {
                cfg.progress.reddit_step_delay = parsed;
            }
        }
        "report.dismiss_after" => {
            if let Some(parsed) = duration(&value) {
                cfg.report.dismiss_after = parsed;
            }
        }
        "logging.filter" => cfg.logging.filter = value,
        "logging.file" => cfg.logging.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("repost-check").join("config.yaml"))
}

/// Persists the backend address, keeping whatever else the file holds.
pub fn save_base_url(path: Option<PathBuf>, base_url: &str) -> Result<PathBuf> {
    let base_url = base_url.trim();
    anyhow::ensure!(!base_url.is_empty(), "config: api.base_url is required");
    url::Url::parse(base_url)
        .with_context(|| format!("config: api.base_url {base_url:?} is not a URL"))?;

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    cfg.api.base_url = base_url.to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("REPOST_CHECK_TEST_DEFAULTS".into()),
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.progress.reddit_step_delay, Duration::from_secs(2));
        assert_eq!(cfg.report.dismiss_after, Duration::from_millis(1500));
    }

    #[test]
    fn file_values_are_merged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  base_url: https://dupes.example.com\nprogress:\n  image_step_delay: 500ms\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("REPOST_CHECK_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "https://dupes.example.com");
        assert_eq!(cfg.progress.image_step_delay, Duration::from_millis(500));
        assert_eq!(cfg.progress.reddit_step_delay, Duration::from_secs(2));
        assert_eq!(cfg.api.timeout, Duration::from_secs(60));
    }

    #[test]
    fn save_base_url_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        save_base_url(Some(path.clone()), "http://localhost:8080").unwrap();
        let saved = read_config_file(&path).unwrap();
        assert_eq!(saved.api.base_url, "http://localhost:8080");
        assert!(save_base_url(Some(path), "not a url").is_err());
    }

    #[test]
    fn env_overrides() {
        env::set_var("REPOST_CHECK_TEST_ENV_API__BASE_URL", "http://10.0.0.2:5000");
        env::set_var("REPOST_CHECK_TEST_ENV_REPORT__DISMISS_AFTER", "3s");
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("REPOST_CHECK_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "http://10.0.0.2:5000");
        assert_eq!(cfg.report.dismiss_after, Duration::from_secs(3));
        env::remove_var("REPOST_CHECK_TEST_ENV_API__BASE_URL");
        env::remove_var("REPOST_CHECK_TEST_ENV_REPORT__DISMISS_AFTER");
    }
}
