use std::sync::Arc;

use crate::{
    auth::{require_admin, Claims},
    errors::{AppError, AppResult},
    models::dto::{
        quiz_dto::QuizDto,
        request::{parse_object_id, UpdateRoleRequest},
        response::{AttemptDto, PlatformCounts, PlatformStatsResponse, RecentActivity, UserDto},
    },
    repositories::{QuizAttemptRepository, QuizRepository, UserRepository},
    services::lookups,
};

const RECENT_LIMIT: i64 = 5;

/// User management and platform overview. Every operation requires an admin.
pub struct AdminService {
    users: Arc<dyn UserRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        Self {
            users,
            quizzes,
            attempts,
        }
    }

    pub async fn list_users(&self, actor: &Claims) -> AppResult<Vec<UserDto>> {
        self.current_admin(actor).await?;
        let users = self.users.find_all().await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    pub async fn update_role(
        &self,
        actor: &Claims,
        id: &str,
        request: UpdateRoleRequest,
    ) -> AppResult<UserDto> {
        self.current_admin(actor).await?;
        let user_id = parse_object_id(id, "User")?;
        let role = request
            .role
            .ok_or_else(|| AppError::InvalidArgument("role is required".to_string()))?;

        let user = self
            .users
            .update_role(&user_id, role)
            .await?
            .ok_or_else(|| user_not_found(id))?;

        log::info!(
            "Admin {} set role of {} to {}",
            actor.username,
            user.username,
            role.as_str()
        );
        Ok(user.into())
    }

    /// Removes a user account. Their quizzes and attempts are kept.
    pub async fn delete_user(&self, actor: &Claims, id: &str) -> AppResult<()> {
        self.current_admin(actor).await?;
        let user_id = parse_object_id(id, "User")?;

        if user_id == actor.user_id()? {
            return Err(AppError::InvalidArgument(
                "Admins cannot delete their own account".to_string(),
            ));
        }

        if !self.users.delete(&user_id).await? {
            return Err(user_not_found(id));
        }

        log::info!("Admin {} deleted user {}", actor.username, user_id);
        Ok(())
    }

    pub async fn platform_stats(&self, actor: &Claims) -> AppResult<PlatformStatsResponse> {
        self.current_admin(actor).await?;

        let counts = PlatformCounts {
            users: self.users.count().await?,
            quizzes: self.quizzes.count().await?,
            attempts: self.attempts.count().await?,
        };

        let users = self.users.recent(RECENT_LIMIT).await?;
        let quizzes = self.quizzes.recent(RECENT_LIMIT).await?;
        let attempts = self.attempts.recent(RECENT_LIMIT).await?;

        let names = lookups::usernames(
            self.users.as_ref(),
            quizzes
                .iter()
                .map(|q| q.creator)
                .chain(attempts.iter().map(|a| a.user)),
        )
        .await?;
        let titles =
            lookups::quiz_titles(self.quizzes.as_ref(), attempts.iter().map(|a| a.quiz)).await?;

        Ok(PlatformStatsResponse {
            counts,
            recent: RecentActivity {
                users: users.into_iter().map(UserDto::from).collect(),
                quizzes: quizzes
                    .into_iter()
                    .map(|q| {
                        let creator = names.get(&q.creator).cloned();
                        QuizDto::from_quiz(q, true, creator)
                    })
                    .collect(),
                attempts: attempts
                    .into_iter()
                    .map(|a| {
                        let username = names.get(&a.user).cloned();
                        let title = titles.get(&a.quiz).cloned();
                        AttemptDto::from_attempt(a, username, title)
                    })
                    .collect(),
            },
        })
    }

    /// Checks the token first, then the stored account, so a demotion or
    /// deletion takes effect before the token expires.
    async fn current_admin(&self, actor: &Claims) -> AppResult<()> {
        require_admin(actor)?;

        let user = self
            .users
            .find_by_id(&actor.user_id()?)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User account no longer exists".to_string()))?;
        if !user.is_admin() {
            return Err(AppError::Forbidden(
                "Admin role has been revoked".to_string(),
            ));
        }
        Ok(())
    }
}

fn user_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("User with id '{}' not found", id))
}
