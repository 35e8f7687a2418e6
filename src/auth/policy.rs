//! Capability checks for quizzes, attempts and platform administration.
//!
//! Every handler asks [`authorize`] with the acting identity, the resource
//! and the action instead of branching on roles itself. Admins get the same
//! override on quizzes and on attempts.

use mongodb::bson::oid::ObjectId;

use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::{Quiz, QuizAttempt},
};

#[derive(Clone, Copy, Debug)]
pub enum Resource<'a> {
    Quiz(&'a Quiz),
    Attempt(&'a QuizAttempt),
    Platform,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Read,
    /// See which options are marked correct.
    ViewAnswerKey,
    Update,
    Delete,
    /// List every attempt made against a quiz.
    ListAttempts,
    /// Manage users and read platform statistics.
    Administer,
}

pub fn is_allowed(actor: Option<&Claims>, resource: Resource<'_>, action: Action) -> bool {
    let is_admin = actor.map(Claims::is_admin).unwrap_or(false);

    match (resource, action) {
        (Resource::Quiz(_), Action::Read) => true,
        (
            Resource::Quiz(quiz),
            Action::ViewAnswerKey | Action::Update | Action::Delete | Action::ListAttempts,
        ) => is_admin || acting_user(actor).is_some_and(|id| quiz.is_created_by(&id)),
        (Resource::Attempt(attempt), Action::Read) => {
            is_admin || acting_user(actor).is_some_and(|id| attempt.is_owned_by(&id))
        }
        (Resource::Platform, Action::Administer) => is_admin,
        _ => false,
    }
}

pub fn authorize(actor: Option<&Claims>, resource: Resource<'_>, action: Action) -> AppResult<()> {
    if is_allowed(actor, resource, action) {
        return Ok(());
    }

    match actor {
        None => Err(AppError::Unauthorized("Authentication required".to_string())),
        Some(_) => Err(AppError::Forbidden(format!(
            "Not allowed to {} this resource",
            action.describe()
        ))),
    }
}

pub fn require_admin(claims: &Claims) -> AppResult<()> {
    authorize(Some(claims), Resource::Platform, Action::Administer)
}

fn acting_user(actor: Option<&Claims>) -> Option<ObjectId> {
    actor.and_then(|c| c.user_id().ok())
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::ViewAnswerKey => "view the answer key of",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::ListAttempts => "list attempts of",
            Action::Administer => "administer",
        }
    }
}
