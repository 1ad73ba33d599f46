use colored::Colorize;
use console::Term;
use tracing::warn;

use crate::application::services::ConfirmationProvider;

/// Asks on the terminal and reads a `y`/`yes` answer.
///
/// When stderr is not attached to a terminal the answer is always no.
#[derive(Debug, Clone)]
pub struct TerminalConfirmation {
    term: Term,
    use_color: bool,
}

impl Default for TerminalConfirmation {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalConfirmation {
    pub fn new() -> Self {
        let term = Term::stderr();
        let use_color = console::colors_enabled_stderr();
        Self { term, use_color }
    }

    /// Disable colored output
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    fn render_prompt(&self, prompt: &str) -> String {
        if self.use_color {
            format!("{} {} {}", "?".yellow().bold(), prompt, "[y/N]:".dimmed())
        } else {
            format!("[CONFIRM] {} [y/N]:", prompt)
        }
    }
}

/// Whether a typed answer means yes
pub fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

impl ConfirmationProvider for TerminalConfirmation {
    fn ask(&self, prompt: &str) -> bool {
        if !self.term.is_term() {
            warn!("No terminal available for confirmation; answering no");
            return false;
        }

        if let Err(e) = self.term.write_str(&format!("{} ", self.render_prompt(prompt))) {
            warn!(error = %e, "Failed to write confirmation prompt");
            return false;
        }
        match self.term.read_line() {
            Ok(input) => is_affirmative(&input),
            Err(e) => {
                warn!(error = %e, "Failed to read confirmation answer");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("YES\n"));
        assert!(is_affirmative("  Yes "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
    }

    #[test]
    fn test_plain_prompt() {
        let confirmation = TerminalConfirmation::new().without_color();
        assert_eq!(
            confirmation.render_prompt("Reset assets?"),
            "[CONFIRM] Reset assets? [y/N]:"
        );
    }
}
