/// Infrastructure layer modules
///
/// This layer provides concrete implementations for external system interactions:
/// - Git object access, working tree export/snapshot and remote transport
/// - Local clone management and locking
/// - Pointer file and breadcrumb persistence
pub mod clone;
pub mod filesystem;
pub mod git;

// Re-export commonly used types
pub use clone::{CloneManager, LocalClone};
pub use filesystem::{BreadcrumbStore, PointerStore};
pub use git::{AssetsRepository, Git2Transport, RemoteTransport, TransportError};
