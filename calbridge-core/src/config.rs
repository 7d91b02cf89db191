//! calbridge configuration at ~/.config/calbridge/config.toml
//!
//! Every key is optional. `CALBRIDGE_*` environment variables override the file
//! (`CALBRIDGE_PROVIDER=local`, `CALBRIDGE_SCAN_WINDOW_DAYS=90`, ...).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PROVIDER, DEFAULT_SCAN_WINDOW_DAYS};
use crate::error::{BridgeError, BridgeResult};
use crate::window::ScanWindow;

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_scan_window_days() -> i64 {
    DEFAULT_SCAN_WINDOW_DAYS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Host provider binary suffix: `calbridge-provider-<provider>`.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Half-width of the removal scan window, in days.
    #[serde(default = "default_scan_window_days")]
    pub scan_window_days: i64,

    /// IANA zone for wall-clock input timestamps. System zone when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            provider: default_provider(),
            scan_window_days: default_scan_window_days(),
            timezone: None,
        }
    }
}

impl BridgeConfig {
    pub fn config_path() -> BridgeResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| BridgeError::Config("Could not determine config directory".into()))?
            .join("calbridge");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user's config, writing a commented default file on first run.
    pub fn load() -> BridgeResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            // A read-only home shouldn't stop a run
            if let Err(e) = Self::create_default_config(&config_path) {
                tracing::warn!(path = %config_path.display(), error = %e, "could not write default config");
            }
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> BridgeResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("CALBRIDGE").try_parsing(true))
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> BridgeResult<()> {
        let defaults = toml::to_string_pretty(&BridgeConfig::default())
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        let mut contents = String::from("# calbridge configuration\n\n");
        contents.push_str("# Host provider binary (calbridge-provider-<name>) and removal scan\n");
        contents.push_str("# window in days either side of now. The outlook provider is installed\n");
        contents.push_str("# separately; use provider = \"local\" for a file-backed dry run.\n");
        for line in defaults.lines().filter(|l| !l.is_empty()) {
            contents.push_str(&format!("# {line}\n"));
        }
        contents.push_str("\n# Zone for input timestamps without an offset (defaults to the system zone):\n");
        contents.push_str("# timezone = \"America/New_York\"\n");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BridgeError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| BridgeError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// The zone wall-clock input timestamps are read in.
    pub fn zone(&self) -> BridgeResult<Tz> {
        match &self.timezone {
            Some(name) => Tz::from_str(name)
                .map_err(|_| BridgeError::Config(format!("Unknown timezone: {name}"))),
            None => Ok(system_zone()),
        }
    }

    pub fn scan_window(&self) -> BridgeResult<ScanWindow> {
        if self.scan_window_days <= 0 {
            return Err(BridgeError::Config(format!(
                "scan_window_days must be positive, got {}",
                self.scan_window_days
            )));
        }
        ScanWindow::from_now(self.scan_window_days).ok_or_else(|| {
            BridgeError::Config(format!(
                "scan_window_days is too large, got {}",
                self.scan_window_days
            ))
        })
    }
}

fn system_zone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| Tz::from_str(&name).ok())
        .unwrap_or(Tz::UTC)
}
