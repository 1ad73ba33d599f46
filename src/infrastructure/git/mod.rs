pub mod repository;
pub mod transport;
pub mod working_tree;

// Re-export main types for convenience
pub use repository::{AssetsRepository, CommitAuthor, TreeFile};
pub use transport::{Git2Transport, RemoteTransport, TransportError};
pub use working_tree::{ExportStats, SnapshotStats, WorkingFile, WorkingScan};
