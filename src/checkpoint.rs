//! Rescan checkpoint persistence
//!
//! A single small JSON document recording the last block height known to be
//! fully scanned. Absence is a valid initial state.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Height written by older releases to mean "no rescan recorded"
pub const NO_CHECKPOINT: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescanCheckpoint {
    #[serde(rename = "lastBlock")]
    pub last_block_height: i64,
}

impl RescanCheckpoint {
    /// Block heights are 32-bit on the wire, so every one fits losslessly
    pub fn new(last_block_height: u32) -> Self {
        Self {
            last_block_height: i64::from(last_block_height),
        }
    }

    /// Height to resume from, `None` for the sentinel
    pub fn height(&self) -> Option<u64> {
        u64::try_from(self.last_block_height).ok()
    }
}

pub trait CheckpointStore: Send + Sync {
    /// `Ok(None)` when nothing has been recorded yet
    fn load(&self) -> Result<Option<RescanCheckpoint>, StorageError>;

    fn save(&self, checkpoint: &RescanCheckpoint) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Option<RescanCheckpoint>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let checkpoint: RescanCheckpoint = serde_json::from_str(&contents)?;
        Ok(checkpoint.height().map(|_| checkpoint))
    }

    fn save(&self, checkpoint: &RescanCheckpoint) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(checkpoint)?;

        // Write-then-rename so a crash never leaves a truncated checkpoint
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
