pub mod quiz_attempt_repository;
pub mod quiz_repository;
pub mod user_repository;

pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

use mongodb::error::{Error, ErrorKind, WriteFailure};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// True when `err` is a unique index violation.
pub(crate) fn is_duplicate_key(err: &Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}
