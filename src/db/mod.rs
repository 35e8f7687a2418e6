use std::time::Duration;

use async_trait::async_trait;
use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};

use crate::{config::Config, errors::AppResult};

pub const USERS_COLLECTION: &str = "users";
pub const QUIZZES_COLLECTION: &str = "quizzes";
pub const ATTEMPTS_COLLECTION: &str = "attempts";

const APP_NAME: &str = "quizhub-server";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Connectivity check used by the health endpoint.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> AppResult<()>;
}

/// Handle to the quiz database. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Database {
    client: Client,
    db_name: String,
}

impl Database {
    /// Opens the pool and pings the deployment once, so a bad connection
    /// string fails at startup instead of on the first request.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut options = ClientOptions::parse(&config.mongo_conn_string).await?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        options.max_pool_size = Some(config.mongo_max_pool_size);
        options.min_pool_size = Some(config.mongo_max_pool_size.min(2));
        options.connect_timeout = Some(TIMEOUT);
        options.server_selection_timeout = Some(TIMEOUT);

        let db = Self {
            client: Client::with_options(options)?,
            db_name: config.mongo_db_name.clone(),
        };
        db.ping().await?;

        log::info!(
            "Connected to MongoDB database '{}' (pool size {})",
            db.db_name,
            config.mongo_max_pool_size
        );
        Ok(db)
    }

    pub fn get_collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.client.database(&self.db_name).collection(name)
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    async fn ping(&self) -> AppResult<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for Database {
    async fn health_check(&self) -> AppResult<()> {
        self.ping().await
    }
}
