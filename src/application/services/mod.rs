pub mod breadcrumb_tracker;
pub mod config_loader;
pub mod confirmation;

pub use breadcrumb_tracker::BreadcrumbTracker;
pub use config_loader::ConfigurationLoader;
pub use confirmation::{ConfirmationProvider, FixedConfirmation, ScriptedConfirmation};
