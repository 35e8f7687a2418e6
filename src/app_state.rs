use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::{Database, StoreHealth},
    errors::AppResult,
    repositories::{
        MongoQuizAttemptRepository, MongoQuizRepository, MongoUserRepository,
        QuizAttemptRepository, QuizRepository, UserRepository,
    },
    services::{
        admin_service::AdminService, quiz_attempt_service::QuizAttemptService,
        quiz_service::QuizService, user_service::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub quiz_service: Arc<QuizService>,
    pub attempt_service: Arc<QuizAttemptService>,
    pub admin_service: Arc<AdminService>,
    pub jwt_service: Arc<JwtService>,
    pub store_health: Arc<dyn StoreHealth>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let user_repository = Arc::new(MongoUserRepository::new(&db));
        user_repository.ensure_indexes().await?;

        let quiz_repository = Arc::new(MongoQuizRepository::new(&db));
        quiz_repository.ensure_indexes().await?;

        let attempt_repository = Arc::new(MongoQuizAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;
        log::info!("Indexes ready on database '{}'", db.db_name());

        Ok(Self::from_repositories(
            config,
            user_repository,
            quiz_repository,
            attempt_repository,
            Arc::new(db),
        ))
    }

    /// Wires the services over any repository implementation.
    pub fn from_repositories(
        config: Config,
        users: Arc<dyn UserRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        store_health: Arc<dyn StoreHealth>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ));

        Self {
            user_service: Arc::new(UserService::new(
                Arc::clone(&users),
                Arc::clone(&jwt_service),
            )),
            quiz_service: Arc::new(QuizService::new(
                Arc::clone(&quizzes),
                Arc::clone(&users),
            )),
            attempt_service: Arc::new(QuizAttemptService::new(
                Arc::clone(&attempts),
                Arc::clone(&quizzes),
                Arc::clone(&users),
            )),
            admin_service: Arc::new(AdminService::new(users, quizzes, attempts)),
            jwt_service,
            store_health,
        }
    }
}
