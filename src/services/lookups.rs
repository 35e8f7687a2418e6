use std::collections::{HashMap, HashSet};

use mongodb::bson::oid::ObjectId;

use crate::{
    errors::AppResult,
    repositories::{QuizRepository, UserRepository},
};

fn distinct(ids: impl IntoIterator<Item = ObjectId>) -> Vec<ObjectId> {
    ids.into_iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect()
}

/// Resolves user ids to usernames in one query. Deleted users are absent.
pub(crate) async fn usernames(
    users: &dyn UserRepository,
    ids: impl IntoIterator<Item = ObjectId>,
) -> AppResult<HashMap<ObjectId, String>> {
    let ids = distinct(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let found = users.find_by_ids(&ids).await?;
    Ok(found.into_iter().map(|u| (u.id, u.username)).collect())
}

/// Resolves quiz ids to titles in one query. Deleted quizzes are absent.
pub(crate) async fn quiz_titles(
    quizzes: &dyn QuizRepository,
    ids: impl IntoIterator<Item = ObjectId>,
) -> AppResult<HashMap<ObjectId, String>> {
    let ids = distinct(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let found = quizzes.find_by_ids(&ids).await?;
    Ok(found.into_iter().map(|q| (q.id, q.title)).collect())
}
