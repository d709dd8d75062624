pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod payments;

use actix_web::HttpResponse;
use serde_json::json;

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up"),
    ),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
