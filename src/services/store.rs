//! Registry persistence

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::Result,
    state::{RegistrySnapshot, Timer},
};

/// Durable storage for registry snapshots
pub trait TimerStore: Send + Sync {
    /// Load the last saved snapshot, `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<RegistrySnapshot>>;

    /// Persist a snapshot, replacing whatever was stored before
    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()>;
}

/// Accepted on-disk layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTimers {
    Snapshot(RegistrySnapshot),
    Bare(Vec<Timer>),
}

/// Pretty-printed JSON file store
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Saves share one temp file, so only one may be in flight
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TimerStore for JsonFileStore {
    fn load(&self) -> Result<Option<RegistrySnapshot>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No timer data at {}, starting empty", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot = match serde_json::from_slice::<StoredTimers>(&data)? {
            StoredTimers::Snapshot(snapshot) => snapshot,
            StoredTimers::Bare(timers) => RegistrySnapshot::from_timers(timers)?,
        };
        snapshot.validate()?;

        info!("Loaded {} timers from {}", snapshot.timers.len(), self.path.display());
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let temp = self.temp_path();
        fs::write(&temp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&temp, &self.path)?;

        debug!("Saved {} timers to {}", snapshot.timers.len(), self.path.display());
        Ok(())
    }
}
