pub mod config;
pub mod error;
pub mod history;
pub mod snapshot;
pub mod store;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{BuildMode, DisplayConfig, InputConfig, OutputConfig, OutputKind, PlaybackConfig, ReplayConfig};
pub use error::{ChampionError, StoreError};
pub use history::{connectivity_samples, ConnectivitySample, HistoryAggregator, HistorySeries};
pub use snapshot::{Connection, Constants, GenerationSnapshot, Member, Node, NodeType, ReplayFrame, Species};
pub use store::SnapshotStore;
pub use vecmath::{heading_to_vec, Vec2};
