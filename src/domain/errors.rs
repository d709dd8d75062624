use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Only {available} items are available for this size.")]
    InsufficientStock { available: i32 },
    #[error("Quantity must be greater than zero.")]
    InvalidQuantity,
    #[error("OrderItem not found or not part of your active order.")]
    LineNotFound,
    #[error("Order not found.")]
    OrderNotFound,
    #[error("Order is already paid.")]
    AlreadyPaid,
    #[error("Transaction is already cancelled.")]
    TransactionCancelled,
    #[error("Payment amount {actual} does not match the order total {expected}.")]
    AmountMismatch { expected: i64, actual: i64 },
    #[error("Invalid size or product.")]
    ProductOrVariantNotFound,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Internal error: {0}")]
    Internal(String),
}
