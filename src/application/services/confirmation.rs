use std::collections::VecDeque;
use std::sync::Mutex;

/// Yes/no interaction used before a destructive reset.
///
/// Implementations decide how the question reaches a person; the store only
/// ever asks one question per reset.
#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationProvider: Send + Sync {
    /// `true` to proceed
    fn ask(&self, prompt: &str) -> bool;
}

/// Always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation {
    answer: bool,
}

impl FixedConfirmation {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }

    pub fn yes() -> Self {
        Self::new(true)
    }

    pub fn no() -> Self {
        Self::new(false)
    }
}

impl ConfirmationProvider for FixedConfirmation {
    fn ask(&self, _prompt: &str) -> bool {
        self.answer
    }
}

/// Replays queued answers and keeps the prompts it was shown.
///
/// Answers `false` once the queue is empty.
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmation {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue another answer
    pub fn push_answer(&self, answer: bool) {
        self.answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(answer);
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ConfirmationProvider for ScriptedConfirmation {
    fn ask(&self, prompt: &str) -> bool {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());
        self.answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(false)
    }
}
