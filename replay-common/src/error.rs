use std::path::PathBuf;
use thiserror::Error;

/// Failure to read a record from the run-output directory.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The record does not exist. For generation files this is how a run signals its end.
    #[error("record not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a valid record.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The record parsed but its values are unusable.
    #[error("invalid record {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            StoreError::NotFound { path }
            | StoreError::Io { path, .. }
            | StoreError::Parse { path, .. }
            | StoreError::Invalid { path, .. } => path,
        }
    }
}

/// Why the champion genome of a snapshot could not be selected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChampionError {
    #[error("generation {generation} does not record a champion species")]
    NoChampionIndex { generation: u32 },

    #[error("champion species index {index} out of range ({count} species) in generation {generation}")]
    SpeciesOutOfRange {
        generation: u32,
        index: usize,
        count: usize,
    },

    #[error("champion species {species_id} has no members in generation {generation}")]
    EmptySpecies { generation: u32, species_id: u32 },
}
