use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{authorize, Action, Claims, Resource},
    errors::{AppError, AppResult},
    models::{
        domain::{Quiz, QuizAttempt},
        dto::{request::parse_object_id, response::AttemptDto},
    },
    repositories::{QuizAttemptRepository, QuizRepository, UserRepository},
    services::{
        lookups,
        scoring::{self, GradedAttempt, SubmittedAnswer},
    },
};

const SCORE_TOLERANCE: f64 = 1e-6;
const PERCENTAGE_TOLERANCE: f64 = 0.01;

/// A validated `POST /attempts` body.
#[derive(Debug, Clone)]
pub struct AttemptSubmission {
    pub quiz_id: ObjectId,
    pub answers: Vec<SubmittedAnswer>,
    /// What the client computed. Kept for comparison only.
    pub reported_score: f64,
    pub reported_percentage: f64,
    pub time_spent: u32,
    pub completed_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug)]
pub struct SubmitOutcome {
    pub attempt: AttemptDto,
    /// False when an earlier attempt with the same idempotency key was
    /// returned instead of recording a new one.
    pub created: bool,
}

pub struct QuizAttemptService {
    attempts: Arc<dyn QuizAttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
    users: Arc<dyn UserRepository>,
}

impl QuizAttemptService {
    pub fn new(
        attempts: Arc<dyn QuizAttemptRepository>,
        quizzes: Arc<dyn QuizRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            attempts,
            quizzes,
            users,
        }
    }

    /// Grades and records an attempt, then folds its percentage into the
    /// quiz and user statistics.
    pub async fn submit_attempt(
        &self,
        actor: &Claims,
        submission: AttemptSubmission,
    ) -> AppResult<SubmitOutcome> {
        let user_id = actor.user_id()?;

        let quiz = self
            .quizzes
            .find_by_id(&submission.quiz_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Quiz with id '{}' not found", submission.quiz_id))
            })?;

        // Tokens outlive deleted accounts.
        if self.users.find_by_id(&user_id).await?.is_none() {
            return Err(AppError::Unauthorized(
                "User account no longer exists".to_string(),
            ));
        }

        if let Some(key) = submission.idempotency_key.as_deref() {
            if let Some(existing) = self.attempts.find_by_idempotency_key(&user_id, key).await? {
                log::info!(
                    "Replaying attempt {} for idempotency key '{}'",
                    existing.id,
                    key
                );
                return replayed(existing, &quiz, key);
            }
        }

        let graded = scoring::grade_attempt(&quiz, &submission.answers)?;
        warn_on_mismatch(&quiz, &submission, &graded);

        let attempt = build_attempt(user_id, &quiz, graded, &submission);
        let attempt = match self.attempts.create(attempt).await {
            Ok(attempt) => attempt,
            Err(AppError::AlreadyExists(_)) => {
                return self
                    .replay(&user_id, submission.idempotency_key.as_deref(), &quiz)
                    .await;
            }
            Err(e) => return Err(e),
        };

        if self
            .quizzes
            .record_attempt_score(&quiz.id, attempt.percentage)
            .await?
            .is_none()
        {
            log::warn!(
                "Quiz {} disappeared before its statistics could be updated",
                quiz.id
            );
        }
        if self
            .users
            .record_attempt_score(&user_id, attempt.percentage)
            .await?
            .is_none()
        {
            log::warn!(
                "User {} disappeared before their statistics could be updated",
                user_id
            );
        }

        log::info!(
            "Attempt {} recorded: user {} scored {}/{} on quiz {}",
            attempt.id,
            actor.username,
            attempt.score,
            attempt.max_score,
            quiz.id
        );

        Ok(SubmitOutcome {
            attempt: AttemptDto::from_attempt(attempt, None, Some(quiz.title)),
            created: true,
        })
    }

    /// The caller's attempts, most recent first, with quiz titles.
    pub async fn attempts_for_user(&self, actor: &Claims) -> AppResult<Vec<AttemptDto>> {
        let attempts = self.attempts.find_by_user(&actor.user_id()?).await?;
        let titles =
            lookups::quiz_titles(self.quizzes.as_ref(), attempts.iter().map(|a| a.quiz)).await?;

        Ok(attempts
            .into_iter()
            .map(|a| {
                let title = titles.get(&a.quiz).cloned();
                AttemptDto::from_attempt(a, None, title)
            })
            .collect())
    }

    pub async fn get_attempt(&self, actor: &Claims, id: &str) -> AppResult<AttemptDto> {
        let attempt_id = parse_object_id(id, "Attempt")?;
        let attempt = self
            .attempts
            .find_by_id(&attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", id)))?;

        authorize(Some(actor), Resource::Attempt(&attempt), Action::Read)?;

        let title = self
            .quizzes
            .find_by_id(&attempt.quiz)
            .await?
            .map(|q| q.title);
        Ok(AttemptDto::from_attempt(attempt, None, title))
    }

    /// Every attempt against a quiz, most recent first, with usernames.
    pub async fn attempts_for_quiz(&self, actor: &Claims, quiz_id: &str) -> AppResult<Vec<AttemptDto>> {
        let id = parse_object_id(quiz_id, "Quiz")?;
        let quiz = self
            .quizzes
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;

        authorize(Some(actor), Resource::Quiz(&quiz), Action::ListAttempts)?;

        let attempts = self.attempts.find_by_quiz(&quiz.id).await?;
        let names =
            lookups::usernames(self.users.as_ref(), attempts.iter().map(|a| a.user)).await?;

        Ok(attempts
            .into_iter()
            .map(|a| {
                let username = names.get(&a.user).cloned();
                AttemptDto::from_attempt(a, username, Some(quiz.title.clone()))
            })
            .collect())
    }

    async fn replay(
        &self,
        user_id: &ObjectId,
        key: Option<&str>,
        quiz: &Quiz,
    ) -> AppResult<SubmitOutcome> {
        let key = key.ok_or_else(|| {
            AppError::InternalError("Duplicate attempt without an idempotency key".to_string())
        })?;

        let existing = self
            .attempts
            .find_by_idempotency_key(user_id, key)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "Attempt for idempotency key '{}' vanished after a conflict",
                    key
                ))
            })?;

        log::info!("Concurrent resubmission for idempotency key '{}' resolved", key);
        replayed(existing, quiz, key)
    }
}

/// A key names one submission; reusing it for another quiz is a conflict.
fn replayed(existing: QuizAttempt, quiz: &Quiz, key: &str) -> AppResult<SubmitOutcome> {
    if existing.quiz != quiz.id {
        return Err(AppError::AlreadyExists(format!(
            "Idempotency key '{}' was already used for another quiz",
            key
        )));
    }

    Ok(SubmitOutcome {
        attempt: AttemptDto::from_attempt(existing, None, Some(quiz.title.clone())),
        created: false,
    })
}

fn build_attempt(
    user_id: ObjectId,
    quiz: &Quiz,
    graded: GradedAttempt,
    submission: &AttemptSubmission,
) -> QuizAttempt {
    let now = Utc::now();
    let completed_at = submission.completed_at.unwrap_or(now);

    QuizAttempt {
        id: ObjectId::new(),
        user: user_id,
        quiz: quiz.id,
        answers: graded.answers,
        score: graded.score,
        max_score: graded.max_score,
        percentage: graded.percentage,
        time_spent: submission.time_spent,
        started_at: completed_at - Duration::seconds(i64::from(submission.time_spent)),
        completed_at,
        created_at: now,
        idempotency_key: submission.idempotency_key.clone(),
    }
}

fn warn_on_mismatch(quiz: &Quiz, submission: &AttemptSubmission, graded: &GradedAttempt) {
    let score_differs = (submission.reported_score - f64::from(graded.score)).abs() > SCORE_TOLERANCE;
    let percentage_differs =
        (submission.reported_percentage - graded.percentage).abs() > PERCENTAGE_TOLERANCE;

    if score_differs || percentage_differs {
        log::warn!(
            "Client-reported result for quiz {} ({} / {:.2}%) differs from graded result ({} / {:.2}%)",
            quiz.id,
            submission.reported_score,
            submission.reported_percentage,
            graded.score,
            graded.percentage
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::{
            quiz_attempt_repository::MockQuizAttemptRepository,
            quiz_repository::MockQuizRepository, user_repository::MockUserRepository,
        },
        test_utils::fixtures::{claims_for, quiz_with_answer_key, test_admin, test_user},
    };

    fn submission(quiz_id: ObjectId, picks: &[u32]) -> AttemptSubmission {
        AttemptSubmission {
            quiz_id,
            answers: picks
                .iter()
                .enumerate()
                .map(|(i, &pick)| SubmittedAnswer {
                    question_index: i as u32,
                    selected_option: pick,
                })
                .collect(),
            reported_score: 0.0,
            reported_percentage: 0.0,
            time_spent: 90,
            completed_at: None,
            idempotency_key: None,
        }
    }

    fn service(
        attempts: MockQuizAttemptRepository,
        quizzes: MockQuizRepository,
        users: MockUserRepository,
    ) -> QuizAttemptService {
        QuizAttemptService::new(Arc::new(attempts), Arc::new(quizzes), Arc::new(users))
    }

    #[tokio::test]
    async fn test_submit_to_missing_quiz_mutates_nothing() {
        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_create().never();
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_find_by_id().returning(|_| Ok(None));
        quizzes.expect_record_attempt_score().never();
        let mut users = MockUserRepository::new();
        users.expect_record_attempt_score().never();

        let result = service(attempts, quizzes, users)
            .submit_attempt(&claims_for(&test_user()), submission(ObjectId::new(), &[0]))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_submit_grades_on_server_and_updates_statistics() {
        let user = test_user();
        let user_id = user.id;
        let quiz = quiz_with_answer_key(&[0, 1, 2, 0, 1]);
        let quiz_id = quiz.id;

        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_create().times(1).returning(|a| Ok(a));
        let mut quizzes = MockQuizRepository::new();
        let found = quiz.clone();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        quizzes
            .expect_record_attempt_score()
            .withf(move |id, p| *id == quiz_id && (*p - 80.0).abs() < 1e-9)
            .times(1)
            .returning(move |_, _| Ok(Some(quiz.clone())));
        let mut users = MockUserRepository::new();
        let stored = user.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        users
            .expect_record_attempt_score()
            .withf(move |id, p| *id == user_id && (*p - 80.0).abs() < 1e-9)
            .times(1)
            .returning(move |_, _| Ok(Some(user.clone())));

        // Client claims a perfect score; four of five picks are right.
        let mut body = submission(quiz_id, &[0, 1, 2, 0, 0]);
        body.reported_score = 5.0;
        body.reported_percentage = 100.0;

        let outcome = service(attempts, quizzes, users)
            .submit_attempt(&claims_for(&test_user_with_id(user_id)), body)
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.attempt.score, 4);
        assert_eq!(outcome.attempt.max_score, 5);
        assert_eq!(outcome.attempt.percentage, 80.0);
        assert!(!outcome.attempt.answers[4].is_correct);
        assert_eq!(
            outcome.attempt.completed_at - outcome.attempt.started_at,
            Duration::seconds(90)
        );
    }

    fn test_user_with_id(id: ObjectId) -> crate::models::domain::User {
        let mut user = test_user();
        user.id = id;
        user
    }

    #[tokio::test]
    async fn test_invalid_answer_index_records_nothing() {
        let quiz = quiz_with_answer_key(&[0]);
        let quiz_id = quiz.id;

        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_create().never();
        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));
        quizzes.expect_record_attempt_score().never();
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Ok(Some(test_user())));
        users.expect_record_attempt_score().never();

        let result = service(attempts, quizzes, users)
            .submit_attempt(&claims_for(&test_user()), submission(quiz_id, &[7]))
            .await;

        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    fn previous_attempt(user: ObjectId, quiz: ObjectId, key: &str) -> QuizAttempt {
        QuizAttempt {
            id: ObjectId::new(),
            user,
            quiz,
            answers: vec![],
            score: 1,
            max_score: 1,
            percentage: 100.0,
            time_spent: 10,
            started_at: Utc::now(),
            completed_at: Utc::now(),
            created_at: Utc::now(),
            idempotency_key: Some(key.to_string()),
        }
    }

    /// Mocks for a resubmission of `previous` against `quiz`; nothing may be
    /// written.
    fn resubmission_service(
        user: &crate::models::domain::User,
        quiz: &Quiz,
        previous: QuizAttempt,
    ) -> QuizAttemptService {
        let mut attempts = MockQuizAttemptRepository::new();
        attempts
            .expect_find_by_idempotency_key()
            .withf(|_, key| key == "retry-1")
            .returning(move |_, _| Ok(Some(previous.clone())));
        attempts.expect_create().never();
        let mut quizzes = MockQuizRepository::new();
        let found = quiz.clone();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        quizzes.expect_record_attempt_score().never();
        let mut users = MockUserRepository::new();
        let stored = user.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        users.expect_record_attempt_score().never();

        service(attempts, quizzes, users)
    }

    #[tokio::test]
    async fn test_known_idempotency_key_replays_without_side_effects() {
        let user = test_user();
        let quiz = quiz_with_answer_key(&[0]);
        let previous = previous_attempt(user.id, quiz.id, "retry-1");
        let previous_id = previous.id;

        let mut body = submission(quiz.id, &[0]);
        body.idempotency_key = Some("retry-1".to_string());

        let outcome = resubmission_service(&user, &quiz, previous)
            .submit_attempt(&claims_for(&user), body)
            .await
            .unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.attempt.id, previous_id.to_hex());
        assert_eq!(outcome.attempt.quiz_title.as_deref(), Some(quiz.title.as_str()));
    }

    #[tokio::test]
    async fn test_idempotency_key_reused_for_another_quiz_conflicts() {
        let user = test_user();
        let quiz = quiz_with_answer_key(&[0]);
        let previous = previous_attempt(user.id, ObjectId::new(), "retry-1");

        let mut body = submission(quiz.id, &[0]);
        body.idempotency_key = Some("retry-1".to_string());

        let result = resubmission_service(&user, &quiz, previous)
            .submit_attempt(&claims_for(&user), body)
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_submit_by_deleted_user_records_nothing() {
        let quiz = quiz_with_answer_key(&[0]);
        let quiz_id = quiz.id;

        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_find_by_idempotency_key().never();
        attempts.expect_create().never();
        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));
        quizzes.expect_record_attempt_score().never();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        users.expect_record_attempt_score().never();

        let mut body = submission(quiz_id, &[0]);
        body.idempotency_key = Some("retry-1".to_string());

        let result = service(attempts, quizzes, users)
            .submit_attempt(&claims_for(&test_user()), body)
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_get_attempt_of_another_user_is_forbidden() {
        let attempt = QuizAttempt {
            id: ObjectId::new(),
            user: ObjectId::new(),
            quiz: ObjectId::new(),
            answers: vec![],
            score: 0,
            max_score: 1,
            percentage: 0.0,
            time_spent: 5,
            started_at: Utc::now(),
            completed_at: Utc::now(),
            created_at: Utc::now(),
            idempotency_key: None,
        };
        let attempt_id = attempt.id.to_hex();

        let mut attempts = MockQuizAttemptRepository::new();
        let stored = attempt.clone();
        attempts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_find_by_id().returning(|_| Ok(None));
        let service = service(attempts, quizzes, MockUserRepository::new());

        let result = service
            .get_attempt(&claims_for(&test_user()), &attempt_id)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let dto = service
            .get_attempt(&claims_for(&test_admin()), &attempt_id)
            .await
            .unwrap();
        assert_eq!(dto.id, attempt_id);
        assert!(dto.quiz_title.is_none());
    }
}
