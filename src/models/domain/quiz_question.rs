use serde::{Deserialize, Serialize};

/// A single-select multiple choice question. Option order is significant:
/// attempts refer to options by index.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub text: String,
    pub options: Vec<QuizQuestionOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestionOption {
    pub text: String,
    pub is_correct: bool,
}

impl QuizQuestion {
    /// Whether `selected` names an option that is marked correct.
    /// Returns `None` when the index is out of range.
    pub fn is_correct_choice(&self, selected: usize) -> Option<bool> {
        self.options.get(selected).map(|o| o.is_correct)
    }
}
