use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

/// An order row as the store hands it out, without its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: Uuid,
    pub user_id: String,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub label: String,
    pub count: i32,
}

/// A line joined with its product and variant. `unit_price` is the product's
/// current price, so totals follow price changes while the order is unpaid.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_id: Uuid,
    pub size_name: String,
    pub quantity: i32,
    pub available_stock: i32,
    pub unit_price: BigDecimal,
}

impl OrderLineView {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: String,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
    pub total_price: BigDecimal,
}

impl OrderView {
    pub fn new(order: OrderRecord, lines: Vec<OrderLineView>) -> Self {
        let total_price = total_price(&lines);
        Self {
            id: order.id,
            user_id: order.user_id,
            is_paid: order.is_paid,
            created_at: order.created_at,
            lines,
            total_price,
        }
    }
}

/// Result of adding to the cart: the merged line and whether it is new.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedLine {
    pub line: OrderLineView,
    pub created: bool,
}

pub fn validate_quantity(quantity: i32) -> Result<i32, DomainError> {
    if quantity <= 0 {
        return Err(DomainError::InvalidQuantity);
    }
    Ok(quantity)
}

pub fn total_price(lines: &[OrderLineView]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + line.line_total())
}
