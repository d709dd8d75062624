use actix_web::{web, HttpRequest, HttpResponse};
use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::payment::PaymentAck;
use crate::domain::ports::Store;
use crate::errors::AppError;
use crate::state::AppState;

pub const WEBHOOK_TOKEN_HEADER: &str = "X-Webhook-Token";

// ── Request / response DTOs ──────────────────────────────────────────────────

/// A transaction callback from the payment provider.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PaymentWebhook {
    Created {
        transaction_id: String,
        order_id: Uuid,
        /// Amount in minor currency units.
        amount: i64,
    },
    Succeeded {
        transaction_id: String,
    },
    Cancelled {
        transaction_id: String,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResult {
    pub transaction_id: String,
    pub order_id: Option<Uuid>,
    /// One of `created`, `succeeded`, `cancelled`.
    pub state: String,
}

impl From<PaymentAck> for WebhookResult {
    fn from(ack: PaymentAck) -> Self {
        Self {
            transaction_id: ack.transaction_id,
            order_id: ack.order_id,
            state: ack.state.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub result: WebhookResult,
}

fn check_token(req: &HttpRequest, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let given = req
        .headers()
        .get(WEBHOOK_TOKEN_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if constant_time_eq(given, expected.as_bytes()) {
        Ok(())
    } else {
        log::warn!("payment webhook rejected: bad or missing {}", WEBHOOK_TOKEN_HEADER);
        Err(AppError::Unauthenticated)
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payments/webhook
///
/// Applies a provider callback to the order it pays for. Success marks the
/// order paid; cancellation returns its stock and reopens it.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body = PaymentWebhook,
    params(
        ("X-Webhook-Token" = Option<String>, Header, description = "Shared secret, required when configured"),
    ),
    responses(
        (status = 200, description = "Callback applied", body = WebhookResponse),
        (status = 400, description = "Amount does not match the order total"),
        (status = 401, description = "Webhook token missing or wrong"),
        (status = 404, description = "Transaction or order not found"),
        (status = 409, description = "Order already paid or transaction already cancelled"),
    ),
    tag = "payments"
)]
pub async fn webhook<S: Store>(
    state: web::Data<AppState<S>>,
    req: HttpRequest,
    body: web::Json<PaymentWebhook>,
) -> Result<HttpResponse, AppError> {
    check_token(&req, state.webhook_token.as_deref())?;
    let event = body.into_inner();

    let ack = web::block(move || match event {
        PaymentWebhook::Created {
            transaction_id,
            order_id,
            amount,
        } => state
            .payments
            .on_payment_created(&transaction_id, order_id, amount),
        PaymentWebhook::Succeeded { transaction_id } => {
            state.payments.on_payment_succeeded(&transaction_id)
        }
        PaymentWebhook::Cancelled { transaction_id } => {
            state.payments.on_payment_cancelled(&transaction_id)
        }
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(WebhookResponse { result: ack.into() }))
}
