use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use crate::models::domain::quiz_question::QuizQuestion;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub time_limit: i32, // minutes
    pub questions: Vec<QuizQuestion>,
    pub creator: ObjectId,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub total_attempts: i64,
    #[serde(default)]
    pub average_score: f64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Fields a creator supplies when authoring or editing a quiz.
#[derive(Clone, Debug)]
pub struct QuizContent {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub time_limit: i32,
    pub questions: Vec<QuizQuestion>,
    pub is_published: bool,
}

impl Quiz {
    pub fn new(content: QuizContent, creator: ObjectId) -> Self {
        let now = Utc::now();
        Quiz {
            id: ObjectId::new(),
            title: content.title.trim().to_string(),
            description: content.description,
            category: content.category.trim().to_string(),
            difficulty: content.difficulty,
            time_limit: content.time_limit,
            questions: content.questions,
            creator,
            is_published: content.is_published,
            total_attempts: 0,
            average_score: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn is_created_by(&self, user_id: &ObjectId) -> bool {
        &self.creator == user_id
    }
}
