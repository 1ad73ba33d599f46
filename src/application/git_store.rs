use futures::future::try_join_all;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::context::StoreContext;
use crate::application::services::{BreadcrumbTracker, ConfigurationLoader, ConfirmationProvider};
use crate::application::store_options::StoreOptions;
use crate::application::use_cases::{
    PushAssetsUseCase, PushOutcome, ResetAssetsUseCase, ResetOutcome, RestoreAssetsUseCase,
    RestoreOutcome,
};
use crate::common::cancel::CancelToken;
use crate::common::result::StoreResult;
use crate::domain::entities::{ResolvedAssetsConfig, TreeDiff};
use crate::infrastructure::clone::CloneManager;
use crate::infrastructure::git::{Git2Transport, RemoteTransport};
use crate::presentation::TerminalConfirmation;

/// Git-backed, tag-addressed store for test assets.
///
/// Every operation takes the path of an `assets.json` pointer file. The
/// plain variants run to completion; the `*_cancellable` variants stop at the
/// next checkpoint once the token is cancelled, leaving the pointer file and
/// breadcrumb at their last committed state.
///
/// ```no_run
/// use assets_store::{GitStore, StoreOptions};
///
/// # async fn run() -> assets_store::StoreResult<()> {
/// let store = GitStore::new(StoreOptions::from_env()?)?;
/// store.restore("sdk/storage/assets.json").await?;
/// // ... tests record new fixtures ...
/// let outcome = store.push("sdk/storage/assets.json").await?;
/// println!("now at {:?}", outcome.tag());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GitStore {
    context: Arc<StoreContext>,
}

impl std::fmt::Debug for GitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitStore")
            .field("options", &self.context.options)
            .finish()
    }
}

impl GitStore {
    /// Store with the libgit2 transport and terminal confirmation
    pub fn new(options: StoreOptions) -> StoreResult<Self> {
        Self::builder(options).build()
    }

    pub fn builder(options: StoreOptions) -> GitStoreBuilder {
        GitStoreBuilder::new(options)
    }

    pub fn options(&self) -> &StoreOptions {
        &self.context.options
    }

    /// Clone manager, shareable with other stores via [`GitStoreBuilder::with_clone_manager`]
    pub fn clone_manager(&self) -> &Arc<CloneManager> {
        &self.context.clones
    }

    /// Load, validate and resolve a pointer file
    pub async fn parse_configuration_file(
        &self,
        path: impl AsRef<Path>,
    ) -> StoreResult<ResolvedAssetsConfig> {
        self.context.loader.parse(path.as_ref()).await
    }

    /// Make the working directory match the pointer's tag exactly
    pub async fn restore(&self, path: impl AsRef<Path>) -> StoreResult<RestoreOutcome> {
        self.restore_cancellable(path, &CancelToken::new()).await
    }

    pub async fn restore_cancellable(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> StoreResult<RestoreOutcome> {
        let config = self.parse_configuration_file(path).await?;
        RestoreAssetsUseCase::new(self.context.clone())
            .execute(&config, cancel)
            .await
    }

    /// Snapshot the working directory as a new tag and point the pointer file at it
    pub async fn push(&self, path: impl AsRef<Path>) -> StoreResult<PushOutcome> {
        self.push_cancellable(path, &CancelToken::new()).await
    }

    pub async fn push_cancellable(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> StoreResult<PushOutcome> {
        let config = self.parse_configuration_file(path).await?;
        PushAssetsUseCase::new(self.context.clone())
            .execute(&config, cancel)
            .await
    }

    /// Discard local changes after confirmation
    pub async fn reset(&self, path: impl AsRef<Path>) -> StoreResult<ResetOutcome> {
        self.reset_cancellable(path, &CancelToken::new()).await
    }

    pub async fn reset_cancellable(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> StoreResult<ResetOutcome> {
        let config = self.parse_configuration_file(path).await?;
        ResetAssetsUseCase::new(self.context.clone())
            .execute(&config, cancel)
            .await
    }

    /// Local changes relative to the pointer's tag
    pub async fn status(&self, path: impl AsRef<Path>) -> StoreResult<TreeDiff> {
        self.status_cancellable(path, &CancelToken::new()).await
    }

    pub async fn status_cancellable(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> StoreResult<TreeDiff> {
        let config = self.parse_configuration_file(path).await?;
        ResetAssetsUseCase::new(self.context.clone())
            .status(&config, cancel)
            .await
    }

    /// Fail with `Consistency` if any pointer file disagrees with its breadcrumb
    #[instrument(skip_all, fields(count = paths.len()))]
    pub async fn check_consistency<P: AsRef<Path>>(&self, paths: &[P]) -> StoreResult<()> {
        let configs = try_join_all(
            paths
                .iter()
                .map(|path| self.context.loader.parse(path.as_ref())),
        )
        .await?;
        self.context.breadcrumbs.check_consistency(&configs)?;
        info!("Breadcrumbs consistent");
        Ok(())
    }

    /// Close the underlying clone manager
    pub fn close(&self) {
        self.context.clones.close();
    }
}

/// Builder for [`GitStore`] with injectable collaborators
pub struct GitStoreBuilder {
    options: StoreOptions,
    transport: Option<Arc<dyn RemoteTransport>>,
    confirmation: Option<Arc<dyn ConfirmationProvider>>,
    clone_manager: Option<Arc<CloneManager>>,
}

impl GitStoreBuilder {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            transport: None,
            confirmation: None,
            clone_manager: None,
        }
    }

    /// Transport for a newly created clone manager
    pub fn with_transport(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_confirmation(mut self, confirmation: Arc<dyn ConfirmationProvider>) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Share an existing clone manager (and its transport and locks)
    pub fn with_clone_manager(mut self, clone_manager: Arc<CloneManager>) -> Self {
        self.clone_manager = Some(clone_manager);
        self
    }

    pub fn build(self) -> StoreResult<GitStore> {
        self.options.validate()?;
        let pool = Arc::new(self.options.build_pool()?);

        let clones = match self.clone_manager {
            Some(clones) => clones,
            None => {
                let transport = self
                    .transport
                    .unwrap_or_else(|| Arc::new(Git2Transport::new()) as Arc<dyn RemoteTransport>);
                Arc::new(CloneManager::new(transport, self.options.remote_base.clone()))
            }
        };
        let confirmation = self
            .confirmation
            .unwrap_or_else(|| Arc::new(TerminalConfirmation::new()) as Arc<dyn ConfirmationProvider>);

        let context = StoreContext {
            loader: ConfigurationLoader::new(&self.options),
            breadcrumbs: BreadcrumbTracker::new(),
            options: self.options,
            clones,
            confirmation,
            pool,
        };
        Ok(GitStore {
            context: Arc::new(context),
        })
    }
}
