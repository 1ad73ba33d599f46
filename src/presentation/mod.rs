/// Presentation layer: interaction with a person at a terminal
pub mod terminal_confirmation;

pub use terminal_confirmation::TerminalConfirmation;
