pub mod assets_config;
pub mod breadcrumb;
pub mod tree_diff;

pub use assets_config::{AssetsConfig, ResolvedAssetsConfig, ASSETS_JSON};
pub use breadcrumb::Breadcrumb;
pub use tree_diff::TreeDiff;
