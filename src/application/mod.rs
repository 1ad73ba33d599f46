pub mod context;
pub mod git_store;
pub mod services;
pub mod store_options;
pub mod use_cases;

pub use git_store::{GitStore, GitStoreBuilder};
pub use store_options::StoreOptions;
