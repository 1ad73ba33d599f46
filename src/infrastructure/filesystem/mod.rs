pub mod breadcrumb_store;
pub mod pointer_store;
pub mod staged_write;

pub use breadcrumb_store::BreadcrumbStore;
pub use pointer_store::PointerStore;
pub use staged_write::{CommittedWrite, StagedWrite};
