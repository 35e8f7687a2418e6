use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    match state.store_health.health_check().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "ok",
            database: "connected",
            version: env!("CARGO_PKG_VERSION"),
        }),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "error",
                database: "disconnected",
                version: env!("CARGO_PKG_VERSION"),
            })
        }
    }
}
