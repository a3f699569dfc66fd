//! Index definition snapshot file.

use crate::error::StoreResult;
use serde::{Deserialize, Serialize};
use skindex_core::{Index, IndexItem};
use std::path::Path;
use tracing::debug;

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "indices.json";

/// Every index definition with its memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub indices: Vec<Index>,
    pub members: Vec<IndexItem>,
}

impl IndexSnapshot {
    /// Load the snapshot from `dir`, or an empty one if absent.
    pub fn load(dir: &Path) -> StoreResult<Self> {
        let path = dir.join(SNAPSHOT_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write to a temp file, then rename over the previous snapshot.
    pub fn save(&self, dir: &Path) -> StoreResult<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(SNAPSHOT_FILE);
        let tmp = dir.join(format!("{SNAPSHOT_FILE}.tmp"));

        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, &path)?;

        debug!(
            indices = self.indices.len(),
            members = self.members.len(),
            "Saved index snapshot"
        );
        Ok(())
    }
}
