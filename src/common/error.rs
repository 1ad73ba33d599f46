use std::path::PathBuf;
use thiserror::Error;

use crate::infrastructure::git::transport::TransportError;

/// One pointer file whose on-disk `Tag` disagrees with its breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbMismatch {
    /// Pointer file (`assets.json`) that was checked
    pub assets_json: PathBuf,
    /// Tag currently written in the pointer file
    pub pointer_tag: String,
    /// Tag last recorded by the breadcrumb, `None` if no breadcrumb exists
    pub breadcrumb_tag: Option<String>,
}

impl std::fmt::Display for BreadcrumbMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.breadcrumb_tag {
            Some(recorded) => write!(
                f,
                "{} has Tag '{}' but breadcrumb recorded '{}'",
                self.assets_json.display(),
                self.pointer_tag,
                recorded
            ),
            None => write!(
                f,
                "{} has Tag '{}' but no breadcrumb was recorded",
                self.assets_json.display(),
                self.pointer_tag
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Assets configuration not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Unable to parse assets configuration {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid assets configuration: {field} - {message}")]
    ConfigValidation {
        field: String,
        message: String,
        path: Option<PathBuf>,
    },

    #[error("Tag '{tag}' does not exist in {repo}")]
    TagNotFound { tag: String, repo: String },

    #[error("Clone operation failed: {message}")]
    Clone {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("Network operation failed: {message}")]
    Network {
        message: String,
        url: Option<String>,
    },

    #[error("Push of tag '{tag}' was rejected: {message}")]
    PushRejected { tag: String, message: String },

    #[error("Breadcrumbs are out of sync with {} pointer file(s): {}", .mismatches.len(), format_mismatches(.mismatches))]
    Consistency { mismatches: Vec<BreadcrumbMismatch> },

    #[error("Git operation failed: {message}")]
    Git {
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("File system operation failed: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn format_mismatches(mismatches: &[BreadcrumbMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl StoreError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ConfigParse {
            path: path.into(),
            source,
        }
    }

    pub fn config_validation(
        field: impl Into<String>,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
            path,
        }
    }

    pub fn tag_not_found(tag: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::TagNotFound {
            tag: tag.into(),
            repo: repo.into(),
        }
    }

    pub fn clone_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: git2::Error,
    ) -> Self {
        Self::Clone {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn network_error(message: impl Into<String>, url: Option<String>) -> Self {
        Self::Network {
            message: message.into(),
            url,
        }
    }

    pub fn push_rejected(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PushRejected {
            tag: tag.into(),
            message: message.into(),
        }
    }

    pub fn consistency(mismatches: Vec<BreadcrumbMismatch>) -> Self {
        Self::Consistency { mismatches }
    }

    pub fn git_error_with_source(message: impl Into<String>, source: git2::Error) -> Self {
        Self::Git {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn filesystem_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::FileSystem {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn filesystem_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Errors a caller may retry as-is (clone and network failures).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Clone { .. } | Self::Network { .. })
    }

    /// Errors that cannot be retried without restoring first.
    pub fn requires_restore(&self) -> bool {
        matches!(self, Self::PushRejected { .. })
    }
}

impl From<git2::Error> for StoreError {
    fn from(error: git2::Error) -> Self {
        Self::git_error_with_source("Git operation failed", error)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal_error_with_source("JSON serialization failed", error)
    }
}

impl From<TransportError> for StoreError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Network { message, url } => Self::network_error(message, Some(url)),
            TransportError::Rejected { reference, message } => {
                let tag = reference
                    .strip_prefix("refs/tags/")
                    .unwrap_or(&reference)
                    .to_string();
                Self::push_rejected(tag, message)
            }
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::internal_error_with_source("Blocking task failed", error)
    }
}
