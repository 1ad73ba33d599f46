pub mod prefix_path;
pub mod repo_identity;
pub mod tag_name;

pub use prefix_path::{PrefixPath, PrefixPathError};
pub use repo_identity::{RepoIdentity, RepoIdentityError};
pub use tag_name::{TagName, TagNameError};
