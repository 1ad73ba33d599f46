pub mod clone_manager;
pub mod lock;

pub use clone_manager::{CloneManager, LocalClone};
pub use lock::{LockRegistry, PathLock};
