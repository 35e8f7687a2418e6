use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

/// One completed submission of answers to a quiz. Never mutated after insert.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub quiz: ObjectId,
    pub answers: Vec<AttemptAnswer>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub time_spent: u32, // seconds
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub completed_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttemptAnswer {
    pub question_index: u32,
    pub selected_option: u32,
    pub is_correct: bool,
}

impl QuizAttempt {
    pub fn is_owned_by(&self, user_id: &ObjectId) -> bool {
        &self.user == user_id
    }
}
