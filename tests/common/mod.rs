#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use secrecy::SecretString;
use tokio::sync::RwLock;

use quizhub_server::{
    app_state::AppState,
    config::Config,
    db::StoreHealth,
    errors::{AppError, AppResult},
    models::domain::{Quiz, QuizAttempt, QuizContent, User, UserRole},
    repositories::{QuizAttemptRepository, QuizRepository, UserRepository},
    services::scoring::{RunningAverage, ScoreTotals},
};

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<ObjectId, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        let taken = users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(AppError::AlreadyExists(
                "Username or email is already registered".to_string(),
            ));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let mut items: Vec<_> = self.users.read().await.values().cloned().collect();
        newest_first(&mut items, |u| u.created_at);
        Ok(items)
    }

    async fn update_role(&self, id: &ObjectId, role: UserRole) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        Ok(self.users.write().await.remove(id).is_some())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.users.read().await.len() as u64)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<User>> {
        let mut items = self.find_all().await?;
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn record_attempt_score(&self, id: &ObjectId, percentage: f64) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            let totals = ScoreTotals {
                quizzes_taken: user.quizzes_taken,
                total_score: user.total_score,
            }
            .record(percentage);
            user.quizzes_taken = totals.quizzes_taken;
            user.total_score = totals.total_score;
            user.average_score = totals.average();
            user.clone()
        }))
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: RwLock<HashMap<ObjectId, Quiz>>,
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.quizzes.write().await.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(ids.iter().filter_map(|id| quizzes.get(id).cloned()).collect())
    }

    async fn list_all(&self) -> AppResult<Vec<Quiz>> {
        let mut items: Vec<_> = self.quizzes.read().await.values().cloned().collect();
        newest_first(&mut items, |q| q.created_at);
        Ok(items)
    }

    async fn list_by_creator(&self, creator: &ObjectId, published_only: bool) -> AppResult<Vec<Quiz>> {
        let mut items: Vec<_> = self
            .quizzes
            .read()
            .await
            .values()
            .filter(|q| q.creator == *creator && (q.is_published || !published_only))
            .cloned()
            .collect();
        newest_first(&mut items, |q| q.created_at);
        Ok(items)
    }

    async fn update_content(&self, id: &ObjectId, content: QuizContent) -> AppResult<Option<Quiz>> {
        let mut quizzes = self.quizzes.write().await;
        Ok(quizzes.get_mut(id).map(|quiz| {
            quiz.title = content.title.trim().to_string();
            quiz.description = content.description;
            quiz.category = content.category.trim().to_string();
            quiz.difficulty = content.difficulty;
            quiz.time_limit = content.time_limit;
            quiz.questions = content.questions;
            quiz.is_published = content.is_published;
            quiz.updated_at = Utc::now();
            quiz.clone()
        }))
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        Ok(self.quizzes.write().await.remove(id).is_some())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.quizzes.read().await.len() as u64)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<Quiz>> {
        let mut items = self.list_all().await?;
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn record_attempt_score(&self, id: &ObjectId, percentage: f64) -> AppResult<Option<Quiz>> {
        let mut quizzes = self.quizzes.write().await;
        Ok(quizzes.get_mut(id).map(|quiz| {
            let running =
                RunningAverage::new(quiz.total_attempts, quiz.average_score).record(percentage);
            quiz.total_attempts = running.count;
            quiz.average_score = running.average;
            quiz.clone()
        }))
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: RwLock<HashMap<ObjectId, QuizAttempt>>,
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        if let Some(key) = attempt.idempotency_key.as_deref() {
            let duplicate = attempts
                .values()
                .any(|a| a.user == attempt.user && a.idempotency_key.as_deref() == Some(key));
            if duplicate {
                return Err(AppError::AlreadyExists(
                    "Attempt with this idempotency key already exists".to_string(),
                ));
            }
        }

        attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>> {
        Ok(self.attempts.read().await.get(id).cloned())
    }

    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<QuizAttempt>> {
        let mut items: Vec<_> = self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| a.user == *user_id)
            .cloned()
            .collect();
        newest_first(&mut items, |a| a.completed_at);
        Ok(items)
    }

    async fn find_by_quiz(&self, quiz_id: &ObjectId) -> AppResult<Vec<QuizAttempt>> {
        let mut items: Vec<_> = self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| a.quiz == *quiz_id)
            .cloned()
            .collect();
        newest_first(&mut items, |a| a.completed_at);
        Ok(items)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &ObjectId,
        key: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| a.user == *user_id && a.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.attempts.read().await.len() as u64)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<QuizAttempt>> {
        let mut items: Vec<_> = self.attempts.read().await.values().cloned().collect();
        newest_first(&mut items, |a| a.completed_at);
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Store health check whose answer is fixed at construction.
pub struct StubHealth(pub bool);

#[async_trait]
impl StoreHealth for StubHealth {
    async fn health_check(&self) -> AppResult<()> {
        if self.0 {
            Ok(())
        } else {
            Err(AppError::DatabaseError("ping failed".to_string()))
        }
    }
}

pub fn test_config() -> Config {
    Config {
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "quizhub-test".to_string(),
        mongo_max_pool_size: 2,
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 5000,
        jwt_secret: SecretString::from("integration_test_secret".to_string()),
        jwt_expiration_hours: 1,
        cors_allowed_origins: vec![],
        app_env: "test".to_string(),
    }
}

/// Application state over in-memory stores. The repositories are returned
/// too so tests can seed and inspect them directly.
pub struct TestContext {
    pub state: AppState,
    pub users: Arc<InMemoryUserRepository>,
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub attempts: Arc<InMemoryQuizAttemptRepository>,
}

pub fn test_context() -> TestContext {
    test_context_with_health(true)
}

pub fn test_context_with_health(healthy: bool) -> TestContext {
    let users = Arc::new(InMemoryUserRepository::default());
    let quizzes = Arc::new(InMemoryQuizRepository::default());
    let attempts = Arc::new(InMemoryQuizAttemptRepository::default());

    let state = AppState::from_repositories(
        test_config(),
        users.clone(),
        quizzes.clone(),
        attempts.clone(),
        Arc::new(StubHealth(healthy)),
    );

    TestContext {
        state,
        users,
        quizzes,
        attempts,
    }
}

pub fn seeded_user(username: &str, role: UserRole) -> User {
    let mut user = User::new(username, &format!("{}@example.com", username), "unused-hash");
    user.role = role;
    user
}

/// A quiz of three-option questions; `correct[i]` is the right option of
/// question `i`.
pub fn quiz_with_answer_key(creator: ObjectId, correct: &[usize], is_published: bool) -> Quiz {
    use quizhub_server::models::domain::{Difficulty, QuizQuestion, QuizQuestionOption};

    let questions = correct
        .iter()
        .enumerate()
        .map(|(i, &right)| QuizQuestion {
            text: format!("Question {}", i + 1),
            options: (0..3)
                .map(|o| QuizQuestionOption {
                    text: format!("Choice {}", o),
                    is_correct: o == right,
                })
                .collect(),
        })
        .collect();

    Quiz::new(
        QuizContent {
            title: "Seeded quiz".to_string(),
            description: "Seeded for tests".to_string(),
            category: "general".to_string(),
            difficulty: Difficulty::Medium,
            time_limit: 10,
            questions,
            is_published,
        },
        creator,
    )
}
