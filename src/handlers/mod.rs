pub mod admin_handler;
pub mod attempt_handler;
pub mod auth_handler;
pub mod health_handler;
pub mod quiz_handler;

use actix_web::{error, web, HttpRequest};

use crate::errors::AppError;

/// Registers every route plus the extractor error handlers. Literal paths
/// are registered before the `{id}` patterns that would otherwise shadow
/// them.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(health_handler::health_check)
        .service(auth_handler::register)
        .service(auth_handler::login)
        .service(quiz_handler::create_quiz)
        .service(quiz_handler::list_quizzes)
        .service(quiz_handler::my_quizzes)
        .service(quiz_handler::quizzes_by_user)
        .service(quiz_handler::get_quiz)
        .service(quiz_handler::update_quiz)
        .service(quiz_handler::delete_quiz)
        .service(attempt_handler::submit_attempt)
        .service(attempt_handler::my_attempts)
        .service(attempt_handler::quiz_attempts)
        .service(attempt_handler::get_attempt)
        .service(admin_handler::list_users)
        .service(admin_handler::update_user_role)
        .service(admin_handler::delete_user)
        .service(admin_handler::platform_stats);
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::InvalidArgument(format!("Invalid request body: {}", err)).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::InvalidArgument(format!("Invalid path: {}", err)).into()
}
