use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{password, JwtService},
    errors::{AppError, AppResult},
    models::{
        domain::User,
        dto::{
            request::{LoginRequest, RegisterRequest},
            response::AuthResponse,
        },
    },
    repositories::UserRepository,
};

pub struct UserService {
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: Arc<JwtService>) -> Self {
        Self { users, jwt }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let username = request.username.trim();
        let email = request.email.trim().to_lowercase();
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let password_hash = password::hash_password(&request.password)?;
        let user = self
            .users
            .create(User::new(username, &email, &password_hash))
            .await?;

        log::info!("Registered user {} ({})", user.username, user.id);
        self.issue_token(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let user = self
            .users
            .find_by_username(request.username.trim())
            .await?
            .ok_or_else(invalid_credentials)?;

        if !password::verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login for user {}", user.username);
            return Err(invalid_credentials());
        }

        self.issue_token(user)
    }

    fn issue_token(&self, user: User) -> AppResult<AuthResponse> {
        let token = self.jwt.create_token(&user)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password".to_string())
}
