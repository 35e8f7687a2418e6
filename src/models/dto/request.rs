use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::{AppError, AppResult};
use crate::models::domain::{Difficulty, Quiz, QuizContent, QuizQuestion, QuizQuestionOption, UserRole};
use crate::services::quiz_attempt_service::AttemptSubmission;
use crate::services::scoring::SubmittedAnswer;

/// Parses a path or body identifier, naming the entity in the error.
pub fn parse_object_id(id: &str, entity: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(id.trim())
        .map_err(|_| AppError::InvalidArgument(format!("Invalid {} ID format", entity)))
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn has_correct_option(options: &Vec<OptionInput>) -> Result<(), ValidationError> {
    if !options.iter().any(|o| o.is_correct) {
        return Err(ValidationError::new("answer_key")
            .with_message("at least one option must be marked correct".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[validate(custom(function = "not_blank"))]
    pub text: String,

    #[validate(
        length(min = 2, message = "A question needs at least two options"),
        custom(function = "has_correct_option"),
        nested
    )]
    pub options: Vec<OptionInput>,
}

impl From<QuestionInput> for QuizQuestion {
    fn from(input: QuestionInput) -> Self {
        QuizQuestion {
            text: input.text,
            options: input
                .options
                .into_iter()
                .map(|o| QuizQuestionOption {
                    text: o.text,
                    is_correct: o.is_correct,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: String,

    #[validate(custom(function = "not_blank"))]
    pub description: String,

    #[validate(custom(function = "not_blank"))]
    pub category: String,

    pub difficulty: Difficulty,

    #[validate(range(min = 1, max = 180, message = "Time limit must be between 1 and 180 minutes"))]
    pub time_limit: i32,

    #[validate(length(min = 1, message = "At least one question is required"), nested)]
    pub questions: Vec<QuestionInput>,

    #[serde(default)]
    pub is_published: bool,
}

impl From<CreateQuizRequest> for QuizContent {
    fn from(request: CreateQuizRequest) -> Self {
        QuizContent {
            title: request.title,
            description: request.description,
            category: request.category,
            difficulty: request.difficulty,
            time_limit: request.time_limit,
            questions: request.questions.into_iter().map(QuizQuestion::from).collect(),
            is_published: request.is_published,
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,

    #[validate(custom(function = "not_blank"))]
    pub description: Option<String>,

    #[validate(custom(function = "not_blank"))]
    pub category: Option<String>,

    pub difficulty: Option<Difficulty>,

    #[validate(range(min = 1, max = 180, message = "Time limit must be between 1 and 180 minutes"))]
    pub time_limit: Option<i32>,

    #[validate(length(min = 1, message = "At least one question is required"), nested)]
    pub questions: Option<Vec<QuestionInput>>,

    pub is_published: Option<bool>,
}

impl UpdateQuizRequest {
    pub fn apply_to(self, quiz: &Quiz) -> QuizContent {
        QuizContent {
            title: self.title.unwrap_or_else(|| quiz.title.clone()),
            description: self.description.unwrap_or_else(|| quiz.description.clone()),
            category: self.category.unwrap_or_else(|| quiz.category.clone()),
            difficulty: self.difficulty.unwrap_or(quiz.difficulty),
            time_limit: self.time_limit.unwrap_or(quiz.time_limit),
            questions: self
                .questions
                .map(|qs| qs.into_iter().map(QuizQuestion::from).collect())
                .unwrap_or_else(|| quiz.questions.clone()),
            is_published: self.is_published.unwrap_or(quiz.is_published),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    pub question_index: u32,
    pub selected_option: u32,
    /// Client-side grading is ignored; kept so existing clients can send it.
    #[serde(default)]
    pub is_correct: Option<bool>,
}

/// Body of `POST /attempts`. Required fields are optional here so that a
/// missing field is reported as an invalid argument naming the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub quiz_id: Option<String>,
    pub answers: Option<Vec<AnswerInput>>,
    pub score: Option<f64>,
    pub time_spent: Option<u32>,
    pub percentage: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
}

impl SubmitAttemptRequest {
    pub fn into_submission(self) -> AppResult<AttemptSubmission> {
        let missing = |field: &str| AppError::InvalidArgument(format!("{} is required", field));

        let quiz_id = self.quiz_id.ok_or_else(|| missing("quizId"))?;
        let quiz_id = parse_object_id(&quiz_id, "Quiz")?;
        let answers = self.answers.ok_or_else(|| missing("answers"))?;
        let reported_score = self.score.ok_or_else(|| missing("score"))?;
        let time_spent = self.time_spent.ok_or_else(|| missing("timeSpent"))?;
        let reported_percentage = self.percentage.ok_or_else(|| missing("percentage"))?;

        if !reported_score.is_finite() || reported_score < 0.0 {
            return Err(AppError::InvalidArgument(
                "score must be a non-negative number".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&reported_percentage) {
            return Err(AppError::InvalidArgument(
                "percentage must be between 0 and 100".to_string(),
            ));
        }

        let idempotency_key = match self.idempotency_key.map(|k| k.trim().to_string()) {
            Some(key) if key.is_empty() || key.len() > 128 => {
                return Err(AppError::InvalidArgument(
                    "idempotencyKey must be between 1 and 128 characters".to_string(),
                ))
            }
            other => other,
        };

        Ok(AttemptSubmission {
            quiz_id,
            answers: answers
                .into_iter()
                .map(|a| SubmittedAnswer {
                    question_index: a.question_index,
                    selected_option: a.selected_option,
                })
                .collect(),
            reported_score,
            reported_percentage,
            time_spent,
            completed_at: self.completed_at,
            idempotency_key,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Option<UserRole>,
}
