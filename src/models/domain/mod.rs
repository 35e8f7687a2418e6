pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod user;
pub use quiz::{Difficulty, Quiz, QuizContent};
pub use quiz_attempt::{AttemptAnswer, QuizAttempt};
pub use quiz_question::{QuizQuestion, QuizQuestionOption};
pub use user::{User, UserRole};
