//! # assets-store - Git-backed test asset store
//!
//! `assets-store` keeps large test fixtures ("assets") out of a project's
//! source repository. Each project carries a small pointer file,
//! `assets.json`, naming a remote repository, a subdirectory inside it and a
//! tag. The store turns that pointer into files on disk, and turns changed
//! files back into a new tag.
//!
//! ## Pointer file
//!
//! ```json
//! {
//!   "AssetsRepo": "Azure/azure-sdk-assets",
//!   "AssetsRepoPrefixPath": "python",
//!   "AssetsRepoId": "",
//!   "TagPrefix": "python/storage",
//!   "Tag": "python/storage_1a2b3c4d5e"
//! }
//! ```
//!
//! ## Operations
//!
//! - **Restore**: make the working directory match `Tag` exactly
//! - **Push**: snapshot the working directory as a new tag, push it, then
//!   update `Tag`
//! - **Reset**: after confirmation, discard local changes
//! - **Status**: list local changes relative to `Tag`
//! - **Check consistency**: verify pointer files against their breadcrumbs
//!
//! ## Architecture
//!
//! The crate is organized using clean architecture principles:
//!
//! - [`domain`]: Pointer file model and value objects
//! - [`application`]: [`GitStore`], its use cases and services
//! - [`infrastructure`]: git object access, clones, locks and file persistence
//! - [`presentation`]: terminal confirmation
//! - [`common`]: Shared error handling and cancellation
//!
//! ## Error Handling
//!
//! - [`common::error::StoreError`]: Main error type
//! - [`common::result::StoreResult`]: Type alias for `Result<T, StoreError>`
//!
//! ## Example
//!
//! ```rust,no_run
//! use assets_store::{GitStore, StoreOptions};
//! use assets_store::application::use_cases::PushOutcome;
//!
//! # async fn example() -> assets_store::StoreResult<()> {
//! let store = GitStore::new(StoreOptions::from_env()?)?;
//!
//! let restored = store.restore("sdk/storage/assets.json").await?;
//! println!("Restored {} files", restored.stats.written);
//!
//! if let PushOutcome::Pushed { tag, .. } = store.push("sdk/storage/assets.json").await? {
//!     println!("Pushed {}", tag);
//! }
//! # Ok(())
//! # }
//! ```

// Documentation attributes
#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::application::services::{
    ConfirmationProvider, FixedConfirmation, ScriptedConfirmation,
};
pub use crate::application::use_cases::{PushOutcome, ResetOutcome, RestoreOutcome};
pub use crate::application::{GitStore, GitStoreBuilder, StoreOptions};
pub use crate::common::cancel::CancelToken;
pub use crate::common::error::StoreError;
pub use crate::common::result::StoreResult;
pub use crate::domain::entities::{AssetsConfig, TreeDiff};
pub use crate::infrastructure::clone::CloneManager;
pub use crate::infrastructure::git::{Git2Transport, RemoteTransport, TransportError};
