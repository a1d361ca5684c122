//! Application settings.
//!
//! Settings come from a `harvest.toml` file discovered in this order:
//! an explicit `--config` path, the `HARVEST_CONFIG` environment variable,
//! `./harvest.toml`, then the user config directory. A missing file just
//! means defaults; a present-but-broken file is an error the user should
//! see.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CONFIG_FILE: &str = "harvest.toml";
const CONFIG_ENV: &str = "HARVEST_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database location.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Directory for CSV/JSON exports.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    /// Directory of per-site JSON definitions, merged over the built-ins.
    #[serde(default)]
    pub sites_dir: Option<PathBuf>,
    /// Run browsers headless.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Override every site's page cap when set.
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            export_dir: default_export_dir(),
            sites_dir: None,
            headless: default_headless(),
            max_pages: None,
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("jobharvest").join("jobs.db"))
        .unwrap_or_else(|| PathBuf::from("jobs.db"))
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_headless() -> bool {
    true
}

impl Settings {
    /// Load settings, falling back to defaults when no config file exists.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config(),
        };

        match path {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) if explicit.is_some() => {
                anyhow::bail!("config file {} does not exist", path.display())
            }
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        debug!("Loading settings from {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

fn discover_config() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    let cwd = PathBuf::from(CONFIG_FILE);
    if cwd.exists() {
        return Some(cwd);
    }

    dirs::config_dir().map(|dir| dir.join("jobharvest").join(CONFIG_FILE))
}
