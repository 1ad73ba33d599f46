//! Mock services for testing

use assets_store::domain::value_objects::TagName;
use assets_store::{ConfirmationProvider, Git2Transport, RemoteTransport, TransportError};
use async_trait::async_trait;
use mockall::mock;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

mock! {
    pub Confirmation {}

    impl ConfirmationProvider for Confirmation {
        fn ask(&self, prompt: &str) -> bool;
    }
}

/// How [`FlakyTransport`] misbehaves on push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFailure {
    Network,
    Rejected,
}

/// Real fetches, failing pushes
#[derive(Debug)]
pub struct FlakyTransport {
    inner: Git2Transport,
    failure: PushFailure,
    pub push_attempts: AtomicUsize,
}

impl FlakyTransport {
    pub fn new(failure: PushFailure) -> Self {
        Self {
            inner: Git2Transport::new(),
            failure,
            push_attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.push_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteTransport for FlakyTransport {
    async fn fetch_tags(&self, clone_path: &Path, remote_url: &str) -> Result<(), TransportError> {
        self.inner.fetch_tags(clone_path, remote_url).await
    }

    async fn push_tag(
        &self,
        _clone_path: &Path,
        remote_url: &str,
        tag: &TagName,
    ) -> Result<(), TransportError> {
        self.push_attempts.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            PushFailure::Network => Err(TransportError::network("connection reset", remote_url)),
            PushFailure::Rejected => Err(TransportError::rejected(
                tag.reference(),
                "permission denied",
            )),
        }
    }
}
