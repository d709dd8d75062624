use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::OrderRecord;
use crate::domain::payment::{
    to_minor_units, OrderState, PaymentAck, PaymentEvent, TransactionRecord, TransactionState,
};
use crate::domain::ports::{OrderRepository, OrderTx};

/// Drives orders through UNPAID -> PAID -> UNPAID from provider callbacks.
pub struct PaymentService<R> {
    repo: Arc<R>,
}

impl<R> Clone for PaymentService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: OrderRepository> PaymentService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Records which order a provider transaction pays for. The order itself
    /// does not change. `amount` must equal the order total in minor units.
    pub fn on_payment_created(
        &self,
        transaction_id: &str,
        order_id: Uuid,
        amount: i64,
    ) -> Result<PaymentAck, DomainError> {
        let result = self.repo.transaction(|tx| {
            if let Some(existing) = tx.find_transaction(transaction_id)? {
                log::info!(
                    "payment transaction {} already recorded in state {}",
                    transaction_id,
                    existing.state
                );
                return Ok(PaymentAck::from(&existing));
            }

            let order = tx
                .lock_order(order_id)?
                .ok_or(DomainError::OrderNotFound)?;
            OrderState::of(&order).apply(PaymentEvent::Created)?;

            let expected = to_minor_units(&tx.order_view(order.clone())?.total_price)?;
            if amount != expected {
                log::warn!(
                    "payment transaction {} for order {} carries {} but the order totals {}",
                    transaction_id,
                    order.id,
                    amount,
                    expected
                );
                return Err(DomainError::AmountMismatch {
                    expected,
                    actual: amount,
                });
            }

            let record = tx.insert_transaction(transaction_id, order.id, amount)?;
            log::info!(
                "payment transaction {} created for order {} amount {}",
                transaction_id,
                order.id,
                amount
            );
            Ok(PaymentAck::from(&record))
        });
        report_integrity_fault(transaction_id, &result);
        result
    }

    /// Marks the order paid. Stock was reserved when the lines were added, so
    /// the ledger is not touched.
    pub fn on_payment_succeeded(&self, transaction_id: &str) -> Result<PaymentAck, DomainError> {
        let result = self.repo.transaction(|tx| {
            let (record, order) = resolve(tx, transaction_id)?;
            if record.state == TransactionState::Cancelled {
                return Err(DomainError::TransactionCancelled);
            }
            OrderState::of(&order).apply(PaymentEvent::Succeeded)?;

            tx.set_paid(order.id, true)?;
            tx.set_transaction_state(transaction_id, TransactionState::Succeeded)?;
            log::info!(
                "order {} of user {} paid by transaction {}",
                order.id,
                order.user_id,
                transaction_id
            );
            Ok(PaymentAck {
                transaction_id: transaction_id.to_string(),
                order_id: Some(order.id),
                state: TransactionState::Succeeded,
            })
        });
        report_integrity_fault(transaction_id, &result);
        result
    }

    /// Releases every reserved unit of the order, clears its lines and returns
    /// it to unpaid. If the user opened a new cart in the meantime, the emptied
    /// order is deleted so that only one unpaid order remains.
    pub fn on_payment_cancelled(&self, transaction_id: &str) -> Result<PaymentAck, DomainError> {
        let result = self.repo.transaction(|tx| {
            let record = tx
                .find_transaction(transaction_id)?
                .ok_or(DomainError::OrderNotFound)?;
            if record.state == TransactionState::Cancelled {
                log::info!("payment transaction {} already cancelled", transaction_id);
                return Ok(PaymentAck::from(&record));
            }

            let order_id = record.order_id.ok_or(DomainError::OrderNotFound)?;
            let order = tx
                .lock_order(order_id)?
                .ok_or(DomainError::OrderNotFound)?;
            // A transaction that never paid cannot take back an order that
            // another transaction paid.
            if record.state == TransactionState::Created && order.is_paid {
                tx.set_transaction_state(transaction_id, TransactionState::Cancelled)?;
                log::info!(
                    "payment transaction {} cancelled unpaid; order {} stays paid",
                    transaction_id,
                    order.id
                );
                return Ok(PaymentAck {
                    transaction_id: transaction_id.to_string(),
                    order_id: Some(order.id),
                    state: TransactionState::Cancelled,
                });
            }
            OrderState::of(&order).apply(PaymentEvent::Cancelled)?;

            let lines = tx.order_lines(order.id)?;
            for line in &lines {
                tx.release(line.variant_id, line.quantity)?;
            }
            tx.delete_order_lines(order.id)?;

            let kept = reopen(tx, &order)?;
            tx.set_transaction_state(transaction_id, TransactionState::Cancelled)?;
            log::info!(
                "payment transaction {} cancelled: released {} lines of order {}",
                transaction_id,
                lines.len(),
                order.id
            );
            Ok(PaymentAck {
                transaction_id: transaction_id.to_string(),
                order_id: kept,
                state: TransactionState::Cancelled,
            })
        });
        report_integrity_fault(transaction_id, &result);
        result
    }
}

fn resolve(
    tx: &mut dyn OrderTx,
    transaction_id: &str,
) -> Result<(TransactionRecord, OrderRecord), DomainError> {
    let record = tx
        .find_transaction(transaction_id)?
        .ok_or(DomainError::OrderNotFound)?;
    let order_id = record.order_id.ok_or(DomainError::OrderNotFound)?;
    let order = tx
        .lock_order(order_id)?
        .ok_or(DomainError::OrderNotFound)?;
    Ok((record, order))
}

/// Puts a cancelled order back as the user's cart, unless another cart exists.
fn reopen(tx: &mut dyn OrderTx, order: &OrderRecord) -> Result<Option<Uuid>, DomainError> {
    if !order.is_paid {
        tx.touch_order(order.id)?;
        return Ok(Some(order.id));
    }
    match tx.find_unpaid_order(&order.user_id)? {
        Some(other) if other.id != order.id => {
            tx.delete_order(order.id)?;
            Ok(None)
        }
        _ => {
            tx.set_paid(order.id, false)?;
            Ok(Some(order.id))
        }
    }
}

fn report_integrity_fault<T>(transaction_id: &str, result: &Result<T, DomainError>) {
    if let Err(DomainError::OrderNotFound) = result {
        log::error!(
            "payment transaction {} does not resolve to an order",
            transaction_id
        );
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::application::order_service::OrderService;
    use crate::infrastructure::memory::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        orders: OrderService<InMemoryStore>,
        payments: PaymentService<InMemoryStore>,
        product: Uuid,
        variant: Uuid,
    }

    fn fixture(stock: i32) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let category = store.add_category("Shoes");
        let product = store.add_product(category, "Sneaker", BigDecimal::from(90));
        let variant = store.add_variant(product, "42", stock);
        Fixture {
            orders: OrderService::new(Arc::clone(&store)),
            payments: PaymentService::new(Arc::clone(&store)),
            store,
            product,
            variant,
        }
    }

    impl Fixture {
        fn count(&self) -> i32 {
            self.store.variant_count(self.variant).expect("variant exists")
        }

        fn checkout(&self, user: &str, quantity: i32, transaction_id: &str) -> Uuid {
            self.orders
                .add_line(user, self.product, self.variant, quantity)
                .expect("add");
            let order = self.orders.get_active_order(user).expect("order");
            let amount = to_minor_units(&order.total_price).expect("amount");
            self.payments
                .on_payment_created(transaction_id, order.id, amount)
                .expect("created");
            order.id
        }
    }

    #[test]
    fn created_event_leaves_order_unpaid() {
        let f = fixture(5);
        let order_id = f.checkout("u1", 2, "tx-1");

        let order = f.orders.get_active_order("u1").expect("still active");
        assert_eq!(order.id, order_id);
        assert!(!order.is_paid);
        assert_eq!(f.count(), 3);
    }

    #[test]
    fn repeated_created_event_is_acknowledged_once() {
        let f = fixture(5);
        let order_id = f.checkout("u1", 1, "tx-1");

        let ack = f
            .payments
            .on_payment_created("tx-1", order_id, 9000)
            .expect("repeat is fine");
        assert_eq!(ack.state, TransactionState::Created);
        assert_eq!(ack.order_id, Some(order_id));
    }

    #[test]
    fn created_with_wrong_amount_is_rejected() {
        let f = fixture(5);
        f.orders
            .add_line("u1", f.product, f.variant, 2)
            .expect("add");
        let order = f.orders.get_active_order("u1").expect("order");

        assert_eq!(
            f.payments.on_payment_created("tx-1", order.id, 9000),
            Err(DomainError::AmountMismatch {
                expected: 18000,
                actual: 9000
            })
        );
        assert_eq!(
            f.payments.on_payment_succeeded("tx-1"),
            Err(DomainError::OrderNotFound)
        );
    }

    #[test]
    fn abandoned_transaction_cancelled_after_another_paid_keeps_the_order_paid() {
        let f = fixture(5);
        let order_id = f.checkout("u1", 2, "tx-abandoned");
        let amount = to_minor_units(&BigDecimal::from(180)).expect("amount");
        f.payments
            .on_payment_created("tx-paid", order_id, amount)
            .expect("second transaction");
        f.payments.on_payment_succeeded("tx-paid").expect("paid");
        assert_eq!(f.count(), 3);

        let ack = f
            .payments
            .on_payment_cancelled("tx-abandoned")
            .expect("cancel");
        assert_eq!(ack.state, TransactionState::Cancelled);
        assert_eq!(ack.order_id, Some(order_id));
        assert_eq!(f.count(), 3);
        assert_eq!(f.store.reserved_quantity(f.variant), 0);
        assert_eq!(
            f.orders.get_active_order("u1"),
            Err(DomainError::OrderNotFound)
        );
        assert_eq!(
            f.payments.on_payment_succeeded("tx-paid"),
            Err(DomainError::AlreadyPaid)
        );
    }

    #[test]
    fn repeated_created_event_skips_the_amount_check() {
        let f = fixture(5);
        let order_id = f.checkout("u1", 1, "tx-1");

        let ack = f
            .payments
            .on_payment_created("tx-1", order_id, 1)
            .expect("repeat is fine");
        assert_eq!(ack.state, TransactionState::Created);
        assert_eq!(ack.order_id, Some(order_id));
    }

    #[test]
    fn created_for_unknown_order_is_not_found() {
        let f = fixture(5);
        assert_eq!(
            f.payments.on_payment_created("tx-1", Uuid::new_v4(), 100),
            Err(DomainError::OrderNotFound)
        );
    }

    #[test]
    fn success_marks_paid_without_touching_stock() {
        let f = fixture(5);
        let order_id = f.checkout("u1", 2, "tx-1");

        let ack = f.payments.on_payment_succeeded("tx-1").expect("paid");
        assert_eq!(ack.order_id, Some(order_id));
        assert_eq!(ack.state, TransactionState::Succeeded);
        assert_eq!(f.count(), 3);
        assert_eq!(
            f.orders.get_active_order("u1"),
            Err(DomainError::OrderNotFound)
        );
        assert_eq!(f.store.reserved_quantity(f.variant), 0);
    }

    #[test]
    fn second_success_fails_with_already_paid() {
        let f = fixture(5);
        f.checkout("u1", 2, "tx-1");

        f.payments.on_payment_succeeded("tx-1").expect("first");
        assert_eq!(
            f.payments.on_payment_succeeded("tx-1"),
            Err(DomainError::AlreadyPaid)
        );
        assert_eq!(f.count(), 3);
    }

    #[test]
    fn paid_order_gets_a_fresh_cart_on_next_add() {
        let f = fixture(5);
        let paid = f.checkout("u1", 2, "tx-1");
        f.payments.on_payment_succeeded("tx-1").expect("paid");

        f.orders
            .add_line("u1", f.product, f.variant, 1)
            .expect("new cart");
        let active = f.orders.get_active_order("u1").expect("active");
        assert_ne!(active.id, paid);
        assert_eq!(active.lines.len(), 1);
    }

    #[test]
    fn cancelling_unpaid_order_releases_and_clears_lines() {
        let f = fixture(4);
        let order_id = f.checkout("u1", 4, "tx-1");
        assert_eq!(f.count(), 0);

        let ack = f.payments.on_payment_cancelled("tx-1").expect("cancel");
        assert_eq!(ack.order_id, Some(order_id));
        assert_eq!(f.count(), 4);
        let order = f.orders.get_active_order("u1").expect("reopened");
        assert_eq!(order.id, order_id);
        assert!(!order.is_paid);
        assert!(order.lines.is_empty());
    }

    #[test]
    fn cancelling_paid_order_restores_stock_and_unpays() {
        let f = fixture(4);
        let order_id = f.checkout("u1", 4, "tx-1");
        f.payments.on_payment_succeeded("tx-1").expect("paid");

        f.payments.on_payment_cancelled("tx-1").expect("cancel");
        assert_eq!(f.count(), 4);
        let order = f.orders.get_active_order("u1").expect("reopened");
        assert_eq!(order.id, order_id);
        assert!(order.lines.is_empty());
    }

    #[test]
    fn cancelling_paid_order_while_new_cart_exists_keeps_the_new_cart() {
        let f = fixture(10);
        f.checkout("u1", 4, "tx-1");
        f.payments.on_payment_succeeded("tx-1").expect("paid");
        f.orders
            .add_line("u1", f.product, f.variant, 1)
            .expect("new cart");
        let cart = f.orders.get_active_order("u1").expect("cart");

        let ack = f.payments.on_payment_cancelled("tx-1").expect("cancel");
        assert_eq!(ack.order_id, None);
        assert_eq!(f.count(), 9);
        let active = f.orders.get_active_order("u1").expect("cart survives");
        assert_eq!(active.id, cart.id);
        assert_eq!(active.lines.len(), 1);
    }

    #[test]
    fn repeated_cancellation_releases_once() {
        let f = fixture(4);
        f.checkout("u1", 3, "tx-1");

        f.payments.on_payment_cancelled("tx-1").expect("cancel");
        let ack = f.payments.on_payment_cancelled("tx-1").expect("repeat");
        assert_eq!(ack.state, TransactionState::Cancelled);
        assert_eq!(f.count(), 4);
    }

    #[test]
    fn success_after_cancellation_is_rejected() {
        let f = fixture(4);
        f.checkout("u1", 3, "tx-1");
        f.payments.on_payment_cancelled("tx-1").expect("cancel");

        assert_eq!(
            f.payments.on_payment_succeeded("tx-1"),
            Err(DomainError::TransactionCancelled)
        );
    }

    #[test]
    fn unknown_transaction_is_order_not_found() {
        let f = fixture(4);
        assert_eq!(
            f.payments.on_payment_succeeded("missing"),
            Err(DomainError::OrderNotFound)
        );
        assert_eq!(
            f.payments.on_payment_cancelled("missing"),
            Err(DomainError::OrderNotFound)
        );
    }
}
