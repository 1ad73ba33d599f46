use async_trait::async_trait;
use git2::{
    Cred, CredentialType, ErrorClass, FetchOptions, PushOptions, RemoteCallbacks,
    Repository as Git2Repository,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::domain::value_objects::TagName;

/// Refspec that mirrors every remote tag into the local clone
pub const TAGS_REFSPEC: &str = "+refs/tags/*:refs/tags/*";

/// Maximum number of times libgit2 may ask for credentials before giving up
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// Errors surfaced by a transport implementation
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transient failure (connectivity, authentication round trip, remote unavailable)
    #[error("Network failure talking to {url}: {message}")]
    Network { message: String, url: String },

    /// The remote refused a ref update; retrying as-is will not help
    #[error("Remote rejected {reference}: {message}")]
    Rejected { reference: String, message: String },
}

impl TransportError {
    pub fn network(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            url: url.into(),
        }
    }

    pub fn rejected(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            reference: reference.into(),
            message: message.into(),
        }
    }
}

/// Network primitives the store relies on.
///
/// Credentials and the wire protocol are the implementation's concern; the
/// store only ever fetches tags into a local clone and pushes a single tag.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Bring every remote tag into the clone at `clone_path`
    async fn fetch_tags(&self, clone_path: &Path, remote_url: &str) -> Result<(), TransportError>;

    /// Publish `tag` (and the commit it points at) from the clone to the remote
    async fn push_tag(
        &self,
        clone_path: &Path,
        remote_url: &str,
        tag: &TagName,
    ) -> Result<(), TransportError>;
}

/// libgit2-backed transport
///
/// Authenticates with the SSH agent for SSH remotes, the configured git
/// credential helper for HTTPS remotes, and falls back to default credentials.
#[derive(Debug, Default, Clone)]
pub struct Git2Transport;

impl Git2Transport {
    pub fn new() -> Self {
        Self
    }
}

fn credential_callbacks<'a>() -> RemoteCallbacks<'a> {
    let attempts = Cell::new(0u32);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts.set(attempts.get() + 1);
        if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                return Cred::credential_helper(&config, url, username_from_url);
            }
        }
        Cred::default()
    });
    callbacks
}

fn is_network_class(error: &git2::Error) -> bool {
    matches!(
        error.class(),
        ErrorClass::Net
            | ErrorClass::Ssh
            | ErrorClass::Http
            | ErrorClass::Ssl
            | ErrorClass::Os
            | ErrorClass::Callback
    )
}

fn fetch_tags_blocking(clone_path: &Path, remote_url: &str) -> Result<(), TransportError> {
    let repo = Git2Repository::open(clone_path)
        .map_err(|e| TransportError::network(format!("cannot open clone: {}", e), remote_url))?;
    let mut remote = repo
        .remote_anonymous(remote_url)
        .map_err(|e| TransportError::network(e.message().to_string(), remote_url))?;

    let mut options = FetchOptions::new();
    options.remote_callbacks(credential_callbacks());

    remote
        .fetch(&[TAGS_REFSPEC], Some(&mut options), None)
        .map_err(|e| TransportError::network(e.message().to_string(), remote_url))?;

    let stats = remote.stats();
    debug!(
        remote = remote_url,
        objects = stats.received_objects(),
        bytes = stats.received_bytes(),
        "Fetched tags"
    );
    Ok(())
}

fn push_tag_blocking(
    clone_path: &Path,
    remote_url: &str,
    tag: &TagName,
) -> Result<(), TransportError> {
    let reference = tag.reference();
    let repo = Git2Repository::open(clone_path)
        .map_err(|e| TransportError::network(format!("cannot open clone: {}", e), remote_url))?;
    let mut remote = repo
        .remote_anonymous(remote_url)
        .map_err(|e| TransportError::network(e.message().to_string(), remote_url))?;

    // Non-forced refspec: an existing tag with the same name is a rejection.
    let refspec = format!("{}:{}", reference, reference);
    let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
    {
        let mut callbacks = credential_callbacks();
        callbacks.push_update_reference(|name, status| {
            if let Some(message) = status {
                *rejection.borrow_mut() = Some((name.to_string(), message.to_string()));
            }
            Ok(())
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        remote
            .push(&[refspec.as_str()], Some(&mut options))
            .map_err(|e| {
                if is_network_class(&e) {
                    TransportError::network(e.message().to_string(), remote_url)
                } else {
                    TransportError::rejected(reference.clone(), e.message().to_string())
                }
            })?;
    }

    if let Some((name, message)) = rejection.into_inner() {
        return Err(TransportError::rejected(name, message));
    }

    debug!(remote = remote_url, tag = %tag, "Pushed tag");
    Ok(())
}

#[async_trait]
impl RemoteTransport for Git2Transport {
    async fn fetch_tags(&self, clone_path: &Path, remote_url: &str) -> Result<(), TransportError> {
        let clone_path: PathBuf = clone_path.to_path_buf();
        let url = remote_url.to_string();
        tokio::task::spawn_blocking(move || fetch_tags_blocking(&clone_path, &url))
            .await
            .map_err(|e| TransportError::network(format!("fetch task failed: {}", e), remote_url))?
    }

    async fn push_tag(
        &self,
        clone_path: &Path,
        remote_url: &str,
        tag: &TagName,
    ) -> Result<(), TransportError> {
        let clone_path: PathBuf = clone_path.to_path_buf();
        let url = remote_url.to_string();
        let tag = tag.clone();
        tokio::task::spawn_blocking(move || push_tag_blocking(&clone_path, &url, &tag))
            .await
            .map_err(|e| TransportError::network(format!("push task failed: {}", e), remote_url))?
    }
}
