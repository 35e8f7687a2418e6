use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, ATTEMPTS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::quiz_attempt::QuizAttempt,
    repositories::is_duplicate_key,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Inserts a new attempt. A second attempt with the same user and
    /// idempotency key fails with `AlreadyExists`.
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>>;
    /// Attempts by `user_id`, most recently completed first.
    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<QuizAttempt>>;
    /// Attempts against `quiz_id`, most recently completed first.
    async fn find_by_quiz(&self, quiz_id: &ObjectId) -> AppResult<Vec<QuizAttempt>>;
    async fn find_by_idempotency_key(
        &self,
        user_id: &ObjectId,
        key: &str,
    ) -> AppResult<Option<QuizAttempt>>;
    async fn count(&self) -> AppResult<u64>;
    async fn recent(&self, limit: i64) -> AppResult<Vec<QuizAttempt>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(ATTEMPTS_COLLECTION);
        Self { collection }
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(
                "Attempt with this idempotency key already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "_id": *id }).await?;
        Ok(attempt)
    }

    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "user": *user_id })
            .sort(doc! { "completed_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn find_by_quiz(&self, quiz_id: &ObjectId) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "quiz": *quiz_id })
            .sort(doc! { "completed_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &ObjectId,
        key: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! { "user": *user_id, "idempotency_key": key })
            .await?;
        Ok(attempt)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! {})
            .sort(doc! { "completed_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for attempts collection");

        let user_quiz_index = IndexModel::builder()
            .keys(doc! { "user": 1, "quiz": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_quiz".to_string())
                    .build(),
            )
            .build();

        let user_completed_index = IndexModel::builder()
            .keys(doc! { "user": 1, "completed_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_completed_at".to_string())
                    .build(),
            )
            .build();

        let quiz_completed_index = IndexModel::builder()
            .keys(doc! { "quiz": 1, "completed_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("quiz_completed_at".to_string())
                    .build(),
            )
            .build();

        let idempotency_index = IndexModel::builder()
            .keys(doc! { "user": 1, "idempotency_key": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "idempotency_key": { "$exists": true } })
                    .name("user_idempotency_key_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_quiz_index).await?;
        self.collection.create_index(user_completed_index).await?;
        self.collection.create_index(quiz_completed_index).await?;
        self.collection.create_index(idempotency_index).await?;

        log::info!("Successfully created indexes for attempts collection");
        Ok(())
    }
}
