use actix_web::{delete, get, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{request::UpdateRoleRequest, response::MessageResponse},
};

#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let users = state.admin_service.list_users(&auth.0).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[put("/admin/users/{id}")]
pub async fn update_user_role(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateRoleRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state
        .admin_service
        .update_role(&auth.0, &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/admin/users/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.admin_service.delete_user(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("User deleted")))
}

#[get("/admin/stats")]
pub async fn platform_stats(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let stats = state.admin_service.platform_stats(&auth.0).await?;
    Ok(HttpResponse::Ok().json(stats))
}
