pub mod cancel;
pub mod error;
pub mod result;

pub use cancel::CancelToken;
pub use error::{BreadcrumbMismatch, StoreError};
pub use result::{ResultExt, StoreResult};
