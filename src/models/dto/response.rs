use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{QuizAttempt, User, UserRole};
use crate::models::dto::quiz_dto::QuizDto;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub quizzes_taken: i64,
    pub total_score: f64,
    pub average_score: f64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id.to_hex(),
            username: user.username,
            email: user.email,
            role: user.role,
            quizzes_taken: user.quizzes_taken,
            total_score: user.total_score,
            average_score: user.average_score,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswerDto {
    pub question_index: u32,
    pub selected_option: u32,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDto {
    pub id: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub quiz: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_title: Option<String>,
    pub answers: Vec<AttemptAnswerDto>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub time_spent: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AttemptDto {
    pub fn from_attempt(
        attempt: QuizAttempt,
        username: Option<String>,
        quiz_title: Option<String>,
    ) -> Self {
        AttemptDto {
            id: attempt.id.to_hex(),
            user: attempt.user.to_hex(),
            username,
            quiz: attempt.quiz.to_hex(),
            quiz_title,
            answers: attempt
                .answers
                .into_iter()
                .map(|a| AttemptAnswerDto {
                    question_index: a.question_index,
                    selected_option: a.selected_option,
                    is_correct: a.is_correct,
                })
                .collect(),
            score: attempt.score,
            max_score: attempt.max_score,
            percentage: attempt.percentage,
            time_spent: attempt.time_spent,
            started_at: attempt.started_at,
            completed_at: attempt.completed_at,
            created_at: attempt.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlatformCounts {
    pub users: u64,
    pub quizzes: u64,
    pub attempts: u64,
}

#[derive(Debug, Serialize)]
pub struct RecentActivity {
    pub users: Vec<UserDto>,
    pub quizzes: Vec<QuizDto>,
    pub attempts: Vec<AttemptDto>,
}

#[derive(Debug, Serialize)]
pub struct PlatformStatsResponse {
    pub counts: PlatformCounts,
    pub recent: RecentActivity,
}
