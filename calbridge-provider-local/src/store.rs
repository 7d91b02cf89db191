//! The JSON file holding the local host's calendars and events.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calbridge_core::host::MemoryHost;

const STORE_ENV: &str = "CALBRIDGE_LOCAL_STORE";

/// Calendar created in a fresh store so there is something to target.
const DEFAULT_CALENDAR: &str = "Calendar";

pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: PathBuf) -> Self {
        LocalStore { path }
    }

    /// `$CALBRIDGE_LOCAL_STORE`, else `<data_dir>/calbridge/local-host.json`.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var(STORE_ENV) {
            return Ok(LocalStore::new(PathBuf::from(
                shellexpand::tilde(&path).into_owned(),
            )));
        }

        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(LocalStore::new(
            data_dir.join("calbridge").join("local-host.json"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the host state, or a fresh host with one calendar if there is none yet.
    pub fn open(&self) -> Result<MemoryHost> {
        if !self.path.exists() {
            let host = MemoryHost::new();
            host.add_calendar(DEFAULT_CALENDAR);
            return Ok(host);
        }

        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        MemoryHost::from_json(&json)
            .with_context(|| format!("Corrupt store at {}", self.path.display()))
    }

    pub fn save(&self, host: &MemoryHost) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }

        std::fs::write(&self.path, host.to_json()?)
            .with_context(|| format!("Could not write {}", self.path.display()))
    }
}
