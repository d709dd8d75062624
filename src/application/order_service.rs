use std::cmp::Ordering;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{validate_quantity, AddedLine, LineRecord, OrderLineView, OrderView};
use crate::domain::ports::{OrderRepository, OrderTx};

/// The per-user cart: one unpaid order whose lines hold reserved stock.
pub struct OrderService<R> {
    repo: Arc<R>,
}

impl<R> Clone for OrderService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Reserves `quantity` more units of the variant and adds them to the
    /// user's cart, merging with an existing line for the same size.
    pub fn add_line(
        &self,
        user_id: &str,
        product_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<AddedLine, DomainError> {
        let quantity = validate_quantity(quantity)?;

        let result = self.repo.transaction(|tx| {
            tx.find_variant(product_id, variant_id)?
                .ok_or(DomainError::ProductOrVariantNotFound)?;

            let order = tx.get_or_create_unpaid_order(user_id)?;
            let existing = tx.find_line(order.id, product_id, variant_id)?;

            // Only the delta is reserved; the existing quantity already is.
            tx.reserve(variant_id, quantity)?;

            let (line_id, created) = match existing {
                Some(line) => {
                    let merged = line
                        .quantity
                        .checked_add(quantity)
                        .ok_or(DomainError::InvalidQuantity)?;
                    tx.set_line_quantity(line.id, merged)?;
                    (line.id, false)
                }
                None => {
                    let line = tx.insert_line(order.id, product_id, variant_id, quantity)?;
                    (line.id, true)
                }
            };
            tx.touch_order(order.id)?;

            Ok(AddedLine {
                line: tx.line_view(line_id)?,
                created,
            })
        });

        match &result {
            Ok(added) => log::info!(
                "user {} reserved {} of variant {} (line {}, now {})",
                user_id,
                quantity,
                variant_id,
                added.line.id,
                added.line.quantity
            ),
            Err(DomainError::InsufficientStock { available }) => log::warn!(
                "user {} asked for {} of variant {} but only {} left",
                user_id,
                quantity,
                variant_id,
                available
            ),
            Err(_) => {}
        }
        result
    }

    /// Sets a line to `quantity`, reserving or releasing the difference.
    pub fn update_line(
        &self,
        user_id: &str,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<OrderLineView, DomainError> {
        let quantity = validate_quantity(quantity)?;

        self.repo.transaction(|tx| {
            let line = locked_line(tx, user_id, line_id)?;

            let delta = quantity - line.quantity;
            match delta.cmp(&0) {
                Ordering::Greater => {
                    tx.reserve(line.variant_id, delta)?;
                }
                Ordering::Less => {
                    tx.release(line.variant_id, -delta)?;
                }
                Ordering::Equal => {}
            }

            tx.set_line_quantity(line.id, quantity)?;
            tx.touch_order(line.order_id)?;
            log::info!(
                "user {} set line {} from {} to {}",
                user_id,
                line.id,
                line.quantity,
                quantity
            );
            tx.line_view(line.id)
        })
    }

    /// Drops a line and puts its reserved stock back.
    pub fn remove_line(&self, user_id: &str, line_id: Uuid) -> Result<(), DomainError> {
        self.repo.transaction(|tx| {
            let line = locked_line(tx, user_id, line_id)?;

            tx.release(line.variant_id, line.quantity)?;
            tx.delete_line(line.id)?;
            tx.touch_order(line.order_id)?;
            log::info!(
                "user {} removed line {} releasing {} of variant {}",
                user_id,
                line.id,
                line.quantity,
                line.variant_id
            );
            Ok(())
        })
    }

    pub fn get_active_order(&self, user_id: &str) -> Result<OrderView, DomainError> {
        self.repo.transaction(|tx| {
            let order = tx
                .find_unpaid_order(user_id)?
                .ok_or(DomainError::OrderNotFound)?;
            tx.order_view(order)
        })
    }

    /// Lines of the active order; empty when the user has no cart yet.
    pub fn list_active_lines(&self, user_id: &str) -> Result<Vec<OrderLineView>, DomainError> {
        self.repo.transaction(|tx| match tx.find_unpaid_order(user_id)? {
            Some(order) => Ok(tx.order_view(order)?.lines),
            None => Ok(Vec::new()),
        })
    }
}

/// Resolves a line the user may still edit and locks its order, so a payment
/// callback for the same order waits for this transaction.
fn locked_line(
    tx: &mut dyn OrderTx,
    user_id: &str,
    line_id: Uuid,
) -> Result<LineRecord, DomainError> {
    let order_id = tx
        .find_owned_line(user_id, line_id)?
        .ok_or(DomainError::LineNotFound)?
        .order_id;

    tx.lock_order(order_id)?
        .filter(|order| !order.is_paid && order.user_id == user_id)
        .ok_or(DomainError::LineNotFound)?;

    // Re-read under the lock; the quantity may have moved since.
    tx.find_owned_line(user_id, line_id)?
        .ok_or(DomainError::LineNotFound)
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::infrastructure::memory::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: OrderService<InMemoryStore>,
        product: Uuid,
        variant: Uuid,
    }

    fn fixture(stock: i32) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let category = store.add_category("Hoodies");
        let product = store.add_product(category, "Black hoodie", BigDecimal::from(250));
        let variant = store.add_variant(product, "M", stock);
        Fixture {
            service: OrderService::new(Arc::clone(&store)),
            store,
            product,
            variant,
        }
    }

    impl Fixture {
        fn count(&self) -> i32 {
            self.store.variant_count(self.variant).expect("variant exists")
        }

        fn conserved(&self) -> i32 {
            self.count() + self.store.reserved_quantity(self.variant)
        }
    }

    #[test]
    fn second_shopper_cannot_take_reserved_stock() {
        let f = fixture(5);

        let added = f
            .service
            .add_line("u1", f.product, f.variant, 3)
            .expect("first add succeeds");
        assert!(added.created);
        assert_eq!(f.count(), 2);

        let err = f
            .service
            .add_line("u2", f.product, f.variant, 3)
            .expect_err("second add exceeds stock");
        assert_eq!(err, DomainError::InsufficientStock { available: 2 });
        assert_eq!(f.count(), 2);
        assert_eq!(f.conserved(), 5);
    }

    #[test]
    fn adding_same_size_twice_merges_into_one_line() {
        let f = fixture(10);

        let first = f.service.add_line("u1", f.product, f.variant, 2).expect("add");
        let second = f.service.add_line("u1", f.product, f.variant, 3).expect("add");

        assert!(!second.created);
        assert_eq!(second.line.id, first.line.id);
        assert_eq!(second.line.quantity, 5);
        assert_eq!(f.count(), 5);
        let order = f.service.get_active_order("u1").expect("active order");
        assert_eq!(order.lines.len(), 1);
    }

    #[test]
    fn update_reserves_only_the_increase() {
        let f = fixture(5);
        let line = f.service.add_line("u1", f.product, f.variant, 2).expect("add").line;
        assert_eq!(f.count(), 3);

        let updated = f.service.update_line("u1", line.id, 5).expect("update");
        assert_eq!(updated.quantity, 5);
        assert_eq!(f.count(), 0);
        assert_eq!(f.conserved(), 5);
    }

    #[test]
    fn update_down_releases_the_difference() {
        let f = fixture(5);
        let line = f.service.add_line("u1", f.product, f.variant, 4).expect("add").line;

        f.service.update_line("u1", line.id, 1).expect("update");
        assert_eq!(f.count(), 4);
    }

    #[test]
    fn update_beyond_stock_fails_and_keeps_line() {
        let f = fixture(5);
        let line = f.service.add_line("u1", f.product, f.variant, 2).expect("add").line;

        let err = f.service.update_line("u1", line.id, 6).expect_err("too many");
        assert_eq!(err, DomainError::InsufficientStock { available: 3 });
        let order = f.service.get_active_order("u1").expect("active order");
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(f.count(), 3);
    }

    #[test]
    fn update_rejects_non_positive_quantity() {
        let f = fixture(5);
        let line = f.service.add_line("u1", f.product, f.variant, 2).expect("add").line;

        assert_eq!(
            f.service.update_line("u1", line.id, 0),
            Err(DomainError::InvalidQuantity)
        );
    }

    #[test]
    fn remove_restores_stock() {
        let f = fixture(5);
        let line = f.service.add_line("u1", f.product, f.variant, 2).expect("add").line;

        f.service.remove_line("u1", line.id).expect("remove");
        assert_eq!(f.count(), 5);
        let order = f.service.get_active_order("u1").expect("order kept");
        assert!(order.lines.is_empty());
    }

    #[test]
    fn lines_of_other_users_are_not_found() {
        let f = fixture(5);
        let line = f.service.add_line("u1", f.product, f.variant, 2).expect("add").line;

        assert_eq!(
            f.service.update_line("u2", line.id, 3),
            Err(DomainError::LineNotFound)
        );
        assert_eq!(
            f.service.remove_line("u2", line.id),
            Err(DomainError::LineNotFound)
        );
        assert_eq!(f.count(), 3);
    }

    #[test]
    fn add_rejects_variant_of_another_product() {
        let f = fixture(5);
        let category = f.store.add_category("Caps");
        let other = f.store.add_product(category, "Cap", BigDecimal::from(10));

        assert_eq!(
            f.service.add_line("u1", other, f.variant, 1),
            Err(DomainError::ProductOrVariantNotFound)
        );
        assert_eq!(
            f.service.add_line("u1", f.product, Uuid::new_v4(), 1),
            Err(DomainError::ProductOrVariantNotFound)
        );
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let f = fixture(5);
        assert_eq!(
            f.service.add_line("u1", f.product, f.variant, 0),
            Err(DomainError::InvalidQuantity)
        );
        assert_eq!(f.count(), 5);
    }

    #[test]
    fn active_order_total_follows_live_prices() {
        let f = fixture(5);
        f.service.add_line("u1", f.product, f.variant, 2).expect("add");
        assert_eq!(
            f.service.get_active_order("u1").expect("order").total_price,
            BigDecimal::from(500)
        );

        f.store.set_price(f.product, BigDecimal::from(300));
        assert_eq!(
            f.service.get_active_order("u1").expect("order").total_price,
            BigDecimal::from(600)
        );
    }

    #[test]
    fn no_active_order_before_first_add() {
        let f = fixture(5);
        assert_eq!(
            f.service.get_active_order("u1"),
            Err(DomainError::OrderNotFound)
        );
        assert!(f.service.list_active_lines("u1").expect("lines").is_empty());
    }

    #[test]
    fn count_never_goes_negative_over_mixed_operations() {
        let f = fixture(4);
        let a = f.service.add_line("u1", f.product, f.variant, 3).expect("add").line;
        let _ = f.service.add_line("u2", f.product, f.variant, 2);
        let b = f.service.add_line("u2", f.product, f.variant, 1).expect("add").line;
        let _ = f.service.update_line("u1", a.id, 4);
        f.service.update_line("u1", a.id, 1).expect("shrink");
        let _ = f.service.update_line("u2", b.id, 9);
        f.service.update_line("u2", b.id, 3).expect("grow");
        f.service.remove_line("u1", a.id).expect("remove");

        assert!(f.count() >= 0);
        assert_eq!(f.conserved(), 4);
    }

    #[test]
    fn concurrent_adds_never_oversell() {
        const SHOPPERS: usize = 16;
        const STOCK: i32 = 5;
        let f = fixture(STOCK);
        let barrier = Arc::new(Barrier::new(SHOPPERS));

        let handles: Vec<_> = (0..SHOPPERS)
            .map(|i| {
                let service = f.service.clone();
                let barrier = Arc::clone(&barrier);
                let (product, variant) = (f.product, f.variant);
                thread::spawn(move || {
                    barrier.wait();
                    service.add_line(&format!("user-{i}"), product, variant, 1)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::InsufficientStock { .. })))
            .count();

        assert_eq!(successes, STOCK as usize);
        assert_eq!(rejected, SHOPPERS - STOCK as usize);
        assert_eq!(f.count(), 0);
    }
}
