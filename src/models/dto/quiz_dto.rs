use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{Difficulty, Quiz, QuizQuestion};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOptionDto {
    pub text: String,
    /// Present only when the caller may see the answer key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionDto {
    pub text: String,
    pub options: Vec<QuizOptionDto>,
}

impl QuizQuestionDto {
    fn from_question(question: QuizQuestion, reveal_answers: bool) -> Self {
        QuizQuestionDto {
            text: question.text,
            options: question
                .options
                .into_iter()
                .map(|o| QuizOptionDto {
                    text: o.text,
                    is_correct: reveal_answers.then_some(o.is_correct),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub time_limit: i32,
    pub total_questions: usize,
    pub questions: Vec<QuizQuestionDto>,
    pub creator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_username: Option<String>,
    pub is_published: bool,
    pub total_attempts: i64,
    pub average_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizDto {
    /// Builds the response view of `quiz`. Correct-answer flags are dropped
    /// unless `reveal_answers` is set.
    pub fn from_quiz(quiz: Quiz, reveal_answers: bool, creator_username: Option<String>) -> Self {
        QuizDto {
            id: quiz.id.to_hex(),
            total_questions: quiz.total_questions(),
            title: quiz.title,
            description: quiz.description,
            category: quiz.category,
            difficulty: quiz.difficulty,
            time_limit: quiz.time_limit,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| QuizQuestionDto::from_question(q, reveal_answers))
                .collect(),
            creator: quiz.creator.to_hex(),
            creator_username,
            is_published: quiz.is_published,
            total_attempts: quiz.total_attempts,
            average_score: quiz.average_score,
            created_at: quiz.created_at,
            updated_at: quiz.updated_at,
        }
    }

    pub fn reveals_answers(&self) -> bool {
        self.questions
            .iter()
            .flat_map(|q| q.options.iter())
            .any(|o| o.is_correct.is_some())
    }
}
