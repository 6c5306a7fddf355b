use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::snapshot::{Constants, GenerationSnapshot};

pub const CONSTANTS_FILE: &str = "constants.json";

/// Reads records from a run-output directory on demand.
///
/// Holds nothing but the directory path; every load goes to disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        SnapshotStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn constants_path(&self) -> PathBuf {
        self.root.join(CONSTANTS_FILE)
    }

    pub fn generation_path(&self, generation: u32) -> PathBuf {
        self.root.join(format!("gen_{}.json", generation))
    }

    /// Loads the run-wide constants record.
    pub fn load_constants(&self) -> Result<Constants, StoreError> {
        let path = self.constants_path();
        let constants: Constants = read_json(&path)?;
        if !(constants.env_width > 0.0 && constants.env_height > 0.0) {
            return Err(StoreError::Invalid {
                path,
                reason: format!(
                    "environment must have a positive size, got {}x{}",
                    constants.env_width, constants.env_height
                ),
            });
        }
        Ok(constants)
    }

    /// Loads one generation record. `NotFound` means no such generation was recorded,
    /// which is also how the end of a run looks.
    pub fn load_generation(&self, generation: u32) -> Result<GenerationSnapshot, StoreError> {
        let path = self.generation_path(generation);
        let value: Value = read_json(&path)?;
        let recorded = recorded_generation(&value);
        let mut snapshot: GenerationSnapshot = serde_json::from_value(value).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        // The file name is the cursor; a record that disagrees is taken at its name.
        if disagrees(recorded, generation) {
            warn!(
                "{} records generation {}, using {} from its name",
                path.display(),
                recorded.unwrap_or_default(),
                generation
            );
        }
        snapshot.generation = generation;
        debug!(
            "Loaded generation {} ({} frames, {} species)",
            generation,
            snapshot.replay.len(),
            snapshot.species.len()
        );
        Ok(snapshot)
    }
}

/// The generation id stored inside a record, if it stores one at all.
fn recorded_generation(value: &Value) -> Option<u64> {
    value
        .get("generation")
        .or_else(|| value.get("genNum"))
        .and_then(Value::as_u64)
}

/// A record without an id takes its file name silently; any stored id must match it.
fn disagrees(recorded: Option<u64>, requested: u32) -> bool {
    recorded.is_some_and(|id| id != requested as u64)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            StoreError::NotFound { path: path.to_path_buf() }
        } else {
            StoreError::Io { path: path.to_path_buf(), source }
        }
    })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
