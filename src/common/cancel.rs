use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::error::StoreError;
use crate::common::result::StoreResult;

/// Cooperative cancellation flag shared between a caller and a running operation.
///
/// Clones observe the same flag. Operations poll it between steps and inside
/// per-file loops; once it trips they stop with [`StoreError::Cancelled`]
/// without writing the pointer file or the breadcrumb.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if cancellation was requested
    pub fn check(&self) -> StoreResult<()> {
        if self.is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(observer.check().is_ok());

        token.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(StoreError::Cancelled)));
    }
}
