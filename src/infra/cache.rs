//! On-disk snapshot of lane-rate entries seen on backend pages, so lane
//! listings still work offline.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::LaneRateEntry;

const SNAPSHOT_FILENAME: &str = "lane_rates_snapshot.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Lane-rate entries accumulated from backend responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneRateSnapshot {
    /// Unix timestamp (seconds) of the last merge.
    pub cached_at: u64,
    pub entries: Vec<LaneRateEntry>,
}

impl LaneRateSnapshot {
    pub fn new(entries: Vec<LaneRateEntry>) -> Self {
        Self {
            cached_at: unix_now(),
            entries,
        }
    }

    /// Replaces entries with the same id and appends new ones.
    pub fn merge(&mut self, entries: &[LaneRateEntry]) {
        for entry in entries {
            match self.entries.iter_mut().find(|known| known.id == entry.id) {
                Some(known) => *known = entry.clone(),
                None => self.entries.push(entry.clone()),
            }
        }
        self.cached_at = unix_now();
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.cached_at))
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Snapshot location in the local data directory, if the platform has one.
pub fn default_snapshot_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|base| base.join("lane-rate-scanner").join(SNAPSHOT_FILENAME))
}

/// A missing or unreadable snapshot is treated as absent.
pub fn load_snapshot(path: &Path) -> Option<LaneRateSnapshot> {
    if !path.exists() {
        debug!(path = %path.display(), "no lane rate snapshot");
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(snapshot) => {
                debug!(path = %path.display(), "loaded lane rate snapshot");
                Some(snapshot)
            }
            Err(error) => {
                warn!(%error, path = %path.display(), "failed to parse lane rate snapshot");
                None
            }
        },
        Err(error) => {
            warn!(%error, path = %path.display(), "failed to read lane rate snapshot");
            None
        }
    }
}

pub fn save_snapshot(path: &Path, snapshot: &LaneRateSnapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, content)?;
    info!(
        entries = snapshot.entries.len(),
        path = %path.display(),
        "saved lane rate snapshot"
    );
    Ok(())
}

pub fn load_default_snapshot() -> Option<LaneRateSnapshot> {
    default_snapshot_path().and_then(|path| load_snapshot(&path))
}

pub fn save_default_snapshot(snapshot: &LaneRateSnapshot) -> Result<(), SnapshotError> {
    let path = default_snapshot_path().ok_or(SnapshotError::StorageUnavailable)?;
    save_snapshot(&path, snapshot)
}
