use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderLineView, OrderView};
use crate::domain::ports::Store;
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddLineRequest {
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLineRequest {
    pub order_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveLineRequest {
    pub order_item_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub size_id: Uuid,
    pub size_name: String,
    pub quantity: i32,
    /// Units of this size still in stock.
    pub available_stock: i32,
    /// Decimal price as a string, e.g. "125.00"
    pub unit_price: String,
    pub total_price: String,
}

impl From<OrderLineView> for OrderLineResponse {
    fn from(line: OrderLineView) -> Self {
        Self {
            total_price: line.line_total().to_string(),
            unit_price: line.unit_price.to_string(),
            id: line.id,
            product_id: line.product_id,
            product_name: line.product_name,
            size_id: line.variant_id,
            size_name: line.size_name,
            quantity: line.quantity,
            available_stock: line.available_stock,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: String,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineResponse>,
    pub total_price: String,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            is_paid: order.is_paid,
            created_at: order.created_at,
            items: order.lines.into_iter().map(OrderLineResponse::from).collect(),
            total_price: order.total_price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveOrderResponse {
    pub order: OrderResponse,
    pub payment_link: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateLineResponse {
    pub message: String,
    pub order_item: OrderLineResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /order/add
///
/// Reserves stock and adds it to the caller's cart. Adding a size that is
/// already in the cart merges into the existing line.
#[utoipa::path(
    post,
    path = "/order/add",
    request_body = AddLineRequest,
    responses(
        (status = 201, description = "New line added to the cart", body = OrderLineResponse),
        (status = 200, description = "Existing line increased", body = OrderLineResponse),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 401, description = "Missing bearer identity"),
        (status = 404, description = "Invalid size or product"),
    ),
    security(("bearer" = [])),
    tag = "order"
)]
pub async fn add_line<S: Store>(
    state: web::Data<AppState<S>>,
    user: AuthenticatedUser,
    body: web::Json<AddLineRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let added = web::block(move || {
        state
            .orders
            .add_line(user.id(), body.product_id, body.size_id, body.quantity)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let line = OrderLineResponse::from(added.line);
    if added.created {
        Ok(HttpResponse::Created().json(line))
    } else {
        Ok(HttpResponse::Ok().json(line))
    }
}

/// PATCH /order/update
///
/// Sets a cart line to a new quantity. Growing the line reserves the
/// difference, shrinking it gives the difference back to stock.
#[utoipa::path(
    patch,
    path = "/order/update",
    request_body = UpdateLineRequest,
    responses(
        (status = 200, description = "Line updated", body = UpdateLineResponse),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 401, description = "Missing bearer identity"),
        (status = 404, description = "Line not found or not part of the caller's active order"),
    ),
    security(("bearer" = [])),
    tag = "order"
)]
pub async fn update_line<S: Store>(
    state: web::Data<AppState<S>>,
    user: AuthenticatedUser,
    body: web::Json<UpdateLineRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let line = web::block(move || {
        state
            .orders
            .update_line(user.id(), body.order_item_id, body.quantity)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(UpdateLineResponse {
        message: "OrderItem updated successfully.".to_string(),
        order_item: line.into(),
    }))
}

/// DELETE /order/remove
#[utoipa::path(
    delete,
    path = "/order/remove",
    request_body = RemoveLineRequest,
    responses(
        (status = 200, description = "Line removed and its stock released", body = MessageResponse),
        (status = 401, description = "Missing bearer identity"),
        (status = 404, description = "Line not found or not part of the caller's active order"),
    ),
    security(("bearer" = [])),
    tag = "order"
)]
pub async fn remove_line<S: Store>(
    state: web::Data<AppState<S>>,
    user: AuthenticatedUser,
    body: web::Json<RemoveLineRequest>,
) -> Result<HttpResponse, AppError> {
    let line_id = body.into_inner().order_item_id;

    web::block(move || state.orders.remove_line(user.id(), line_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "OrderItem removed successfully.".to_string(),
    }))
}

/// GET /order/active
///
/// Returns the caller's unpaid order priced at current product prices,
/// together with a checkout link for its total.
#[utoipa::path(
    get,
    path = "/order/active",
    responses(
        (status = 200, description = "Active order found", body = ActiveOrderResponse),
        (status = 401, description = "Missing bearer identity"),
        (status = 404, description = "No active order found"),
    ),
    security(("bearer" = [])),
    tag = "order"
)]
pub async fn active_order<S: Store>(
    state: web::Data<AppState<S>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let data = state.clone();
    let order = web::block(move || data.orders.get_active_order(user.id()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| match e {
            DomainError::OrderNotFound => AppError::NotFound("No active order found.".to_string()),
            other => other.into(),
        })?;

    let payment_link = state
        .payment_links
        .link(order.id, &order.user_id, &order.total_price)?;

    Ok(HttpResponse::Ok().json(ActiveOrderResponse {
        order: order.into(),
        payment_link,
    }))
}

/// GET /order/items
///
/// Lines of the caller's active order; empty when there is none.
#[utoipa::path(
    get,
    path = "/order/items",
    responses(
        (status = 200, description = "Lines of the active order", body = Vec<OrderLineResponse>),
        (status = 401, description = "Missing bearer identity"),
    ),
    security(("bearer" = [])),
    tag = "order"
)]
pub async fn list_items<S: Store>(
    state: web::Data<AppState<S>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let lines = web::block(move || state.orders.list_active_lines(user.id()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let items: Vec<OrderLineResponse> = lines.into_iter().map(OrderLineResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}
