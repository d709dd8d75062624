use actix_web::error::{JsonPayloadError, PathError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Only {available} items are available for this size.")]
    InsufficientStock { available: i32 },

    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InsufficientStock { available } => {
                AppError::InsufficientStock { available }
            }
            DomainError::InvalidQuantity | DomainError::AmountMismatch { .. } => {
                AppError::Validation(e.to_string())
            }
            DomainError::LineNotFound
            | DomainError::OrderNotFound
            | DomainError::ProductOrVariantNotFound
            | DomainError::NotFound(_) => AppError::NotFound(e.to_string()),
            DomainError::AlreadyPaid | DomainError::TransactionCancelled => {
                AppError::Conflict(e.to_string())
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InsufficientStock { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::InsufficientStock { available } => json!({
                "error": self.to_string(),
                "available": available
            }),
            AppError::Internal(msg) => {
                log::error!("request failed: {}", msg);
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Rejects malformed JSON bodies with the usual `{"error"}` body.
pub fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("bad JSON body on {}: {}", req.path(), err);
    AppError::Validation(err.to_string()).into()
}

pub fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("bad path parameter on {}: {}", req.path(), err);
    AppError::Validation(err.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order not found.".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthenticated_returns_401() {
        assert_eq!(
            AppError::Unauthenticated.error_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn stock_and_quantity_errors_are_bad_requests() {
        let stock: AppError = DomainError::InsufficientStock { available: 2 }.into();
        let quantity: AppError = DomainError::InvalidQuantity.into();
        assert_eq!(stock.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(quantity.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(quantity.to_string(), "Quantity must be greater than zero.");
    }

    #[test]
    fn amount_mismatch_is_a_validation_error() {
        let err: AppError = DomainError::AmountMismatch {
            expected: 18000,
            actual: 9000,
        }
        .into();
        assert_eq!(
            err,
            AppError::Validation(
                "Payment amount 9000 does not match the order total 18000.".to_string()
            )
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn lookup_failures_map_to_not_found() {
        for err in [
            DomainError::LineNotFound,
            DomainError::OrderNotFound,
            DomainError::ProductOrVariantNotFound,
            DomainError::NotFound("Product"),
        ] {
            let app_err: AppError = err.into();
            assert_eq!(app_err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn payment_state_clashes_map_to_conflict() {
        let paid: AppError = DomainError::AlreadyPaid.into();
        let cancelled: AppError = DomainError::TransactionCancelled.into();
        assert_eq!(paid, AppError::Conflict("Order is already paid.".to_string()));
        assert_eq!(cancelled.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn domain_internal_maps_to_app_internal() {
        let app_err: AppError = DomainError::Internal("oops".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[actix_web::test]
    async fn insufficient_stock_body_carries_available() {
        let resp = AppError::InsufficientStock { available: 2 }.error_response();
        let body = to_bytes(resp.into_body()).await.expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value["available"], 2);
        assert_eq!(value["error"], "Only 2 items are available for this size.");
    }

    #[actix_web::test]
    async fn internal_body_hides_the_cause() {
        let resp = AppError::Internal("connection refused".to_string()).error_response();
        let body = to_bytes(resp.into_body()).await.expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value["error"], "Internal server error");
    }
}
