pub mod push_assets;
pub mod reset_assets;
pub mod restore_assets;

pub use push_assets::{PushAssetsUseCase, PushOutcome};
pub use reset_assets::{ResetAssetsUseCase, ResetOutcome};
pub use restore_assets::{RestoreAssetsUseCase, RestoreOutcome};
