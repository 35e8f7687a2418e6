use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{Database, USERS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{User, UserRole},
    repositories::is_duplicate_key,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_all(&self) -> AppResult<Vec<User>>;
    async fn update_role(&self, id: &ObjectId, role: UserRole) -> AppResult<Option<User>>;
    async fn delete(&self, id: &ObjectId) -> AppResult<bool>;
    async fn count(&self) -> AppResult<u64>;
    async fn recent(&self, limit: i64) -> AppResult<Vec<User>>;
    /// Atomically adds one taken quiz with `percentage` to the user's totals
    /// and recomputes the average. Returns `None` if the user does not exist.
    async fn record_attempt_score(&self, id: &ObjectId, percentage: f64)
        -> AppResult<Option<User>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(USERS_COLLECTION);
        Self { collection }
    }
}

/// The second stage sees the totals written by the first.
fn attempt_score_update(percentage: f64) -> Vec<Document> {
    vec![
        doc! { "$set": {
            "quizzes_taken": { "$add": [ { "$ifNull": ["$quizzes_taken", 0_i64] }, 1_i64 ] },
            "total_score": { "$add": [ { "$ifNull": ["$total_score", 0.0] }, percentage ] },
        } },
        doc! { "$set": {
            "average_score": { "$divide": ["$total_score", "$quizzes_taken"] },
        } },
    ]
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(
                "Username or email is already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": *id }).await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>> {
        let users = self
            .collection
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(users)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "username": username })
            .await?;
        Ok(user)
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let users = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(users)
    }

    async fn update_role(&self, id: &ObjectId, role: UserRole) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one_and_update(doc! { "_id": *id }, doc! { "$set": { "role": role.as_str() } })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(user)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<User>> {
        let users = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(users)
    }

    async fn record_attempt_score(
        &self,
        id: &ObjectId,
        percentage: f64,
    ) -> AppResult<Option<User>> {
        let update = attempt_score_update(percentage);

        let user = self
            .collection
            .find_one_and_update(doc! { "_id": *id }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(user)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for users collection");

        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("username_unique".to_string())
                    .build(),
            )
            .build();

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(username_index).await?;
        self.collection.create_index(email_index).await?;

        log::info!("Successfully created indexes for users collection");
        Ok(())
    }
}
