use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{Database, QUIZZES_COLLECTION},
    errors::AppResult,
    models::domain::{Quiz, QuizContent},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<Quiz>>;
    /// All quizzes, newest first.
    async fn list_all(&self) -> AppResult<Vec<Quiz>>;
    async fn list_by_creator(&self, creator: &ObjectId, published_only: bool)
        -> AppResult<Vec<Quiz>>;
    /// Replaces the authored fields only; statistics are left untouched.
    async fn update_content(&self, id: &ObjectId, content: QuizContent)
        -> AppResult<Option<Quiz>>;
    async fn delete(&self, id: &ObjectId) -> AppResult<bool>;
    async fn count(&self) -> AppResult<u64>;
    async fn recent(&self, limit: i64) -> AppResult<Vec<Quiz>>;
    /// Atomically folds one attempt percentage into `total_attempts` and
    /// `average_score`. Returns `None` if the quiz does not exist.
    async fn record_attempt_score(&self, id: &ObjectId, percentage: f64)
        -> AppResult<Option<Quiz>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZZES_COLLECTION);
        Self { collection }
    }
}

fn content_update(content: &QuizContent) -> AppResult<Document> {
    Ok(doc! { "$set": {
        "title": content.title.trim(),
        "description": content.description.as_str(),
        "category": content.category.trim(),
        "difficulty": bson::to_bson(&content.difficulty)?,
        "time_limit": content.time_limit,
        "questions": bson::to_bson(&content.questions)?,
        "is_published": content.is_published,
        "updated_at": bson::DateTime::from_chrono(Utc::now()),
    } })
}

/// Both fields of the single `$set` stage are computed from the document as
/// it was before the update, so the average is weighted by the old count.
fn attempt_score_update(percentage: f64) -> Vec<Document> {
    let count = doc! { "$ifNull": ["$total_attempts", 0_i64] };
    let average = doc! { "$ifNull": ["$average_score", 0.0] };
    vec![doc! { "$set": {
        "average_score": {
            "$divide": [
                { "$add": [ { "$multiply": [average, count.clone()] }, percentage ] },
                { "$add": [count.clone(), 1_i64] },
            ]
        },
        "total_attempts": { "$add": [count, 1_i64] },
    } }]
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.collection.insert_one(&quiz).await?;
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "_id": *id }).await?;
        Ok(quiz)
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn list_all(&self) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn list_by_creator(
        &self,
        creator: &ObjectId,
        published_only: bool,
    ) -> AppResult<Vec<Quiz>> {
        let mut filter = doc! { "creator": *creator };
        if published_only {
            filter.insert("is_published", true);
        }

        let quizzes = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn update_content(
        &self,
        id: &ObjectId,
        content: QuizContent,
    ) -> AppResult<Option<Quiz>> {
        let quiz = self
            .collection
            .find_one_and_update(doc! { "_id": *id }, content_update(&content)?)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(quiz)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn record_attempt_score(
        &self,
        id: &ObjectId,
        percentage: f64,
    ) -> AppResult<Option<Quiz>> {
        let update = attempt_score_update(percentage);

        let quiz = self
            .collection
            .find_one_and_update(doc! { "_id": *id }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(quiz)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let creator_index = IndexModel::builder()
            .keys(doc! { "creator": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("creator_created_at".to_string())
                    .build(),
            )
            .build();

        let created_at_index = IndexModel::builder()
            .keys(doc! { "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("created_at".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(creator_index).await?;
        self.collection.create_index(created_at_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}
