use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

/// Outcome of [`load_local_env_overrides`]. The file is read before logging
/// is configured, so the outcome is logged by the caller afterwards.
#[derive(Debug, PartialEq, Eq)]
pub enum EnvOverrides {
    Absent,
    Loaded {
        path: PathBuf,
        applied: usize,
        invalid_lines: Vec<usize>,
    },
    Unreadable {
        path: PathBuf,
        error: String,
    },
}

impl EnvOverrides {
    pub fn log(&self) {
        match self {
            EnvOverrides::Absent => {}
            EnvOverrides::Loaded {
                path,
                applied,
                invalid_lines,
            } => {
                info!(path = %path.display(), applied, "Loaded environment overrides from local.env");
                for line in invalid_lines {
                    warn!(path = %path.display(), line, "invalid local.env entry; skipped");
                }
            }
            EnvOverrides::Unreadable { path, error } => {
                warn!(path = %path.display(), %error, "failed to read local.env overrides");
            }
        }
    }
}

pub fn load_local_env_overrides() -> EnvOverrides {
    apply_env_file(Path::new("config/local.env"))
}

/// Export the file's variables that are not already set.
fn apply_env_file(path: &Path) -> EnvOverrides {
    if !path.exists() {
        return EnvOverrides::Absent;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            let (pairs, invalid_lines) = parse_env_lines(&contents);
            let mut applied = 0;
            for (key, value) in pairs {
                if env::var(&key).is_ok() {
                    continue;
                }
                env::set_var(key, value);
                applied += 1;
            }
            EnvOverrides::Loaded {
                path: path.to_path_buf(),
                applied,
                invalid_lines,
            }
        }
        Err(err) => EnvOverrides::Unreadable {
            path: path.to_path_buf(),
            error: err.to_string(),
        },
    }
}

/// Key/value pairs, plus the 1-based numbers of lines that were not `KEY=value`.
fn parse_env_lines(contents: &str) -> (Vec<(String, String)>, Vec<usize>) {
    let mut pairs = Vec::new();
    let mut invalid = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            invalid.push(idx + 1);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            invalid.push(idx + 1);
            continue;
        }
        pairs.push((key.to_string(), unescape_value(value.trim())));
    }
    (pairs, invalid)
}

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
}

/// `./config/config.yaml` when present, else the per-user config directory.
pub fn default_config_path() -> Result<PathBuf> {
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("cartpilot");
    path.push("config.yaml");
    Ok(path)
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;

        let config = AppConfig::from_yaml(&content).context("Failed to parse config file")?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: AppConfig::default(),
            path: config_path,
        })
    }
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}
