use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{AuthenticatedUser, MaybeAuthenticated},
    errors::AppError,
    models::dto::{
        request::{CreateQuizRequest, UpdateQuizRequest},
        response::MessageResponse,
    },
};

#[post("/quizzes")]
pub async fn create_quiz(
    state: web::Data<AppState>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .create_quiz(&auth.0, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(quiz))
}

#[get("/quizzes")]
pub async fn list_quizzes(
    state: web::Data<AppState>,
    auth: MaybeAuthenticated,
) -> Result<HttpResponse, AppError> {
    let quizzes = state.quiz_service.list_quizzes(auth.0.as_ref()).await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

#[get("/quizzes/user")]
pub async fn my_quizzes(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quizzes = state.quiz_service.my_quizzes(&auth.0).await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

#[get("/quizzes/user/{user_id}")]
pub async fn quizzes_by_user(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
    auth: MaybeAuthenticated,
) -> Result<HttpResponse, AppError> {
    let quizzes = state
        .quiz_service
        .quizzes_by_user(auth.0.as_ref(), &user_id)
        .await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

#[get("/quizzes/{id}")]
pub async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: MaybeAuthenticated,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_quiz(auth.0.as_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[put("/quizzes/{id}")]
pub async fn update_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .update_quiz(&auth.0, &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[delete("/quizzes/{id}")]
pub async fn delete_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.quiz_service.delete_quiz(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Quiz deleted")))
}
