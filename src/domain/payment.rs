use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::OrderRecord;

/// The three callbacks the payment provider delivers for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    Created,
    Succeeded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Unpaid,
    Paid,
}

impl OrderState {
    pub fn of(order: &OrderRecord) -> Self {
        if order.is_paid {
            OrderState::Paid
        } else {
            OrderState::Unpaid
        }
    }

    /// Next state of the order after `event`. Creation never moves the order;
    /// cancellation always lands on `Unpaid`.
    pub fn apply(self, event: PaymentEvent) -> Result<OrderState, DomainError> {
        match (self, event) {
            (OrderState::Paid, PaymentEvent::Created | PaymentEvent::Succeeded) => {
                Err(DomainError::AlreadyPaid)
            }
            (OrderState::Unpaid, PaymentEvent::Created) => Ok(OrderState::Unpaid),
            (OrderState::Unpaid, PaymentEvent::Succeeded) => Ok(OrderState::Paid),
            (_, PaymentEvent::Cancelled) => Ok(OrderState::Unpaid),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Created,
    Succeeded,
    Cancelled,
}

impl TransactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionState::Created => "created",
            TransactionState::Succeeded => "succeeded",
            TransactionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TransactionState::Created),
            "succeeded" => Ok(TransactionState::Succeeded),
            "cancelled" => Ok(TransactionState::Cancelled),
            other => Err(DomainError::Internal(format!(
                "unknown transaction state '{other}'"
            ))),
        }
    }
}

/// A provider transaction and the order it pays for. `order_id` is empty once
/// the order row has been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub provider_transaction_id: String,
    pub order_id: Option<Uuid>,
    pub amount: i64,
    pub state: TransactionState,
}

/// Acknowledgment returned to the provider for every handled callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAck {
    pub transaction_id: String,
    pub order_id: Option<Uuid>,
    pub state: TransactionState,
}

impl From<&TransactionRecord> for PaymentAck {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            transaction_id: record.provider_transaction_id.clone(),
            order_id: record.order_id,
            state: record.state,
        }
    }
}

/// Converts a price into minor currency units (x100), rounding half-up.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| DomainError::Internal(format!("amount {amount} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaid_order_becomes_paid_on_success() {
        assert_eq!(
            OrderState::Unpaid.apply(PaymentEvent::Succeeded),
            Ok(OrderState::Paid)
        );
    }

    #[test]
    fn paid_order_rejects_second_success() {
        assert_eq!(
            OrderState::Paid.apply(PaymentEvent::Succeeded),
            Err(DomainError::AlreadyPaid)
        );
    }

    #[test]
    fn created_event_does_not_move_unpaid_order() {
        assert_eq!(
            OrderState::Unpaid.apply(PaymentEvent::Created),
            Ok(OrderState::Unpaid)
        );
        assert_eq!(
            OrderState::Paid.apply(PaymentEvent::Created),
            Err(DomainError::AlreadyPaid)
        );
    }

    #[test]
    fn cancellation_always_returns_to_unpaid() {
        assert_eq!(
            OrderState::Paid.apply(PaymentEvent::Cancelled),
            Ok(OrderState::Unpaid)
        );
        assert_eq!(
            OrderState::Unpaid.apply(PaymentEvent::Cancelled),
            Ok(OrderState::Unpaid)
        );
    }

    #[test]
    fn transaction_state_parses_its_own_output() {
        for state in [
            TransactionState::Created,
            TransactionState::Succeeded,
            TransactionState::Cancelled,
        ] {
            assert_eq!(state.as_str().parse::<TransactionState>(), Ok(state));
        }
        assert!("refunded".parse::<TransactionState>().is_err());
    }

    #[test]
    fn minor_units_round_half_up() {
        let amount: BigDecimal = "12.345".parse().expect("valid decimal");
        assert_eq!(to_minor_units(&amount), Ok(1235));
        assert_eq!(to_minor_units(&BigDecimal::from(7)), Ok(700));
    }
}
