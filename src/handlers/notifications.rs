use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::catalog::NotificationView;
use crate::domain::ports::Store;
use crate::errors::AppError;
use crate::handlers::orders::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub has_viewed: bool,
}

impl From<NotificationView> for NotificationResponse {
    fn from(n: NotificationView) -> Self {
        Self {
            id: n.id,
            title: n.title,
            message: n.message,
            created_at: n.created_at,
            has_viewed: n.has_viewed,
        }
    }
}

/// GET /notifications
///
/// Newest first, each flagged with whether the caller has read it.
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Notifications for the caller", body = Vec<NotificationResponse>),
        (status = 401, description = "Missing bearer identity"),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn list_notifications<S: Store>(
    state: web::Data<AppState<S>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let views = web::block(move || state.notifications.for_user(user.id()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<NotificationResponse> =
        views.into_iter().map(NotificationResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /notifications/{id}/read
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification UUID"),
    ),
    responses(
        (status = 200, description = "Marked as read", body = MessageResponse),
        (status = 401, description = "Missing bearer identity"),
        (status = 404, description = "Notification not found"),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_read<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    web::block(move || state.notifications.mark_read(user.id(), id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Notification marked as read.".to_string(),
    }))
}
