use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::SubmitAttemptRequest,
};

/// Records a graded attempt. Replays of a known idempotency key answer 200
/// with the stored attempt instead of 201.
#[post("/attempts")]
pub async fn submit_attempt(
    state: web::Data<AppState>,
    request: web::Json<SubmitAttemptRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let submission = request.into_inner().into_submission()?;
    let outcome = state
        .attempt_service
        .submit_attempt(&auth.0, submission)
        .await?;

    if outcome.created {
        Ok(HttpResponse::Created().json(outcome.attempt))
    } else {
        Ok(HttpResponse::Ok().json(outcome.attempt))
    }
}

#[get("/attempts/user")]
pub async fn my_attempts(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempts = state.attempt_service.attempts_for_user(&auth.0).await?;
    Ok(HttpResponse::Ok().json(attempts))
}

#[get("/attempts/quiz/{quiz_id}")]
pub async fn quiz_attempts(
    state: web::Data<AppState>,
    quiz_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempts = state
        .attempt_service
        .attempts_for_quiz(&auth.0, &quiz_id)
        .await?;
    Ok(HttpResponse::Ok().json(attempts))
}

#[get("/attempts/{id}")]
pub async fn get_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempt = state.attempt_service.get_attempt(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(attempt))
}
