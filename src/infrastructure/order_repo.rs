use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{LineRecord, OrderLineView, OrderRecord, OrderView, VariantRecord};
use crate::domain::payment::{TransactionRecord, TransactionState};
use crate::domain::ports::{OrderRepository, OrderTx};
use crate::schema::{order_lines, orders, payment_transactions, product_variants, products};

use super::models::{
    NewOrderLineRow, NewOrderRow, NewPaymentTransactionRow, OrderLineRow, OrderRow,
    PaymentTransactionRow, VariantRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselStore {
    pub(super) pool: DbPool,
}

impl DieselStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn OrderTx) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<_, DomainError, _>(|conn| f(&mut DieselTx { conn }))
    }
}

/// A connection with an open transaction.
pub struct DieselTx<'c> {
    pub(super) conn: &'c mut PgConnection,
}

type LineJoin = (OrderLineRow, String, BigDecimal, String, i32);

fn line_view((line, product_name, price, label, count): LineJoin) -> OrderLineView {
    OrderLineView {
        id: line.id,
        product_id: line.product_id,
        product_name,
        variant_id: line.variant_id,
        size_name: label,
        quantity: line.quantity,
        available_stock: count,
        unit_price: price,
    }
}

impl DieselTx<'_> {
    fn unpaid_order(&mut self, user_id: &str, lock: bool) -> QueryResult<Option<OrderRow>> {
        let query = orders::table
            .filter(orders::user_id.eq(user_id))
            .filter(orders::is_paid.eq(false))
            .select(OrderRow::as_select());
        if lock {
            query.for_update().first(self.conn).optional()
        } else {
            query.first(self.conn).optional()
        }
    }
}

impl OrderTx for DieselTx<'_> {
    fn find_variant(
        &mut self,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<VariantRecord>, DomainError> {
        let row = product_variants::table
            .filter(product_variants::id.eq(variant_id))
            .filter(product_variants::product_id.eq(product_id))
            .select(VariantRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(VariantRecord::from))
    }

    fn get_or_create_unpaid_order(&mut self, user_id: &str) -> Result<OrderRecord, DomainError> {
        if let Some(order) = self.unpaid_order(user_id, true)? {
            return Ok(order.into());
        }

        // The partial unique index turns a concurrent first add into a no-op
        // here; the select below then picks up the winner's row.
        diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                id: Uuid::new_v4(),
                user_id,
                is_paid: false,
            })
            .on_conflict_do_nothing()
            .execute(self.conn)?;

        self.unpaid_order(user_id, true)?
            .map(OrderRecord::from)
            .ok_or_else(|| DomainError::Internal(format!("no unpaid order for user {user_id}")))
    }

    fn find_unpaid_order(&mut self, user_id: &str) -> Result<Option<OrderRecord>, DomainError> {
        Ok(self.unpaid_order(user_id, false)?.map(OrderRecord::from))
    }

    fn lock_order(&mut self, order_id: Uuid) -> Result<Option<OrderRecord>, DomainError> {
        let row = orders::table
            .find(order_id)
            .select(OrderRow::as_select())
            .for_update()
            .first(self.conn)
            .optional()?;
        Ok(row.map(OrderRecord::from))
    }

    fn set_paid(&mut self, order_id: Uuid, is_paid: bool) -> Result<(), DomainError> {
        diesel::update(orders::table.find(order_id))
            .set((orders::is_paid.eq(is_paid), orders::updated_at.eq(Utc::now())))
            .execute(self.conn)?;
        Ok(())
    }

    fn touch_order(&mut self, order_id: Uuid) -> Result<(), DomainError> {
        diesel::update(orders::table.find(order_id))
            .set(orders::updated_at.eq(Utc::now()))
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_order(&mut self, order_id: Uuid) -> Result<(), DomainError> {
        diesel::delete(orders::table.find(order_id)).execute(self.conn)?;
        Ok(())
    }

    fn find_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<LineRecord>, DomainError> {
        let row = order_lines::table
            .filter(order_lines::order_id.eq(order_id))
            .filter(order_lines::product_id.eq(product_id))
            .filter(order_lines::variant_id.eq(variant_id))
            .select(OrderLineRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(LineRecord::from))
    }

    fn find_owned_line(
        &mut self,
        user_id: &str,
        line_id: Uuid,
    ) -> Result<Option<LineRecord>, DomainError> {
        let row = order_lines::table
            .inner_join(orders::table)
            .filter(order_lines::id.eq(line_id))
            .filter(orders::user_id.eq(user_id))
            .filter(orders::is_paid.eq(false))
            .select(OrderLineRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(LineRecord::from))
    }

    fn order_lines(&mut self, order_id: Uuid) -> Result<Vec<LineRecord>, DomainError> {
        let rows = order_lines::table
            .filter(order_lines::order_id.eq(order_id))
            .order(order_lines::variant_id.asc())
            .select(OrderLineRow::as_select())
            .load(self.conn)?;
        Ok(rows.into_iter().map(LineRecord::from).collect())
    }

    fn insert_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<LineRecord, DomainError> {
        let row = diesel::insert_into(order_lines::table)
            .values(&NewOrderLineRow {
                id: Uuid::new_v4(),
                order_id,
                product_id,
                variant_id,
                quantity,
            })
            .returning(OrderLineRow::as_returning())
            .get_result(self.conn)?;
        Ok(row.into())
    }

    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        diesel::update(order_lines::table.find(line_id))
            .set(order_lines::quantity.eq(quantity))
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError> {
        diesel::delete(order_lines::table.find(line_id)).execute(self.conn)?;
        Ok(())
    }

    fn delete_order_lines(&mut self, order_id: Uuid) -> Result<(), DomainError> {
        diesel::delete(order_lines::table.filter(order_lines::order_id.eq(order_id)))
            .execute(self.conn)?;
        Ok(())
    }

    fn line_view(&mut self, line_id: Uuid) -> Result<OrderLineView, DomainError> {
        let row = order_lines::table
            .inner_join(products::table)
            .inner_join(product_variants::table)
            .filter(order_lines::id.eq(line_id))
            .select((
                OrderLineRow::as_select(),
                products::name,
                products::price,
                product_variants::label,
                product_variants::count,
            ))
            .first::<LineJoin>(self.conn)?;
        Ok(line_view(row))
    }

    fn order_view(&mut self, order: OrderRecord) -> Result<OrderView, DomainError> {
        let rows = order_lines::table
            .inner_join(products::table)
            .inner_join(product_variants::table)
            .filter(order_lines::order_id.eq(order.id))
            .order(order_lines::created_at.asc())
            .select((
                OrderLineRow::as_select(),
                products::name,
                products::price,
                product_variants::label,
                product_variants::count,
            ))
            .load::<LineJoin>(self.conn)?;
        Ok(OrderView::new(
            order,
            rows.into_iter().map(line_view).collect(),
        ))
    }

    fn find_transaction(
        &mut self,
        provider_transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, DomainError> {
        let row = payment_transactions::table
            .filter(payment_transactions::provider_transaction_id.eq(provider_transaction_id))
            .select(PaymentTransactionRow::as_select())
            .for_update()
            .first(self.conn)
            .optional()?;
        row.map(transaction_record).transpose()
    }

    fn insert_transaction(
        &mut self,
        provider_transaction_id: &str,
        order_id: Uuid,
        amount: i64,
    ) -> Result<TransactionRecord, DomainError> {
        let row = diesel::insert_into(payment_transactions::table)
            .values(&NewPaymentTransactionRow {
                id: Uuid::new_v4(),
                provider_transaction_id,
                order_id: Some(order_id),
                amount,
                state: TransactionState::Created.as_str(),
            })
            .returning(PaymentTransactionRow::as_returning())
            .get_result(self.conn)?;
        transaction_record(row)
    }

    fn set_transaction_state(
        &mut self,
        provider_transaction_id: &str,
        state: TransactionState,
    ) -> Result<(), DomainError> {
        diesel::update(
            payment_transactions::table
                .filter(payment_transactions::provider_transaction_id.eq(provider_transaction_id)),
        )
        .set((
            payment_transactions::state.eq(state.as_str()),
            payment_transactions::updated_at.eq(Utc::now()),
        ))
        .execute(self.conn)?;
        Ok(())
    }
}

fn transaction_record(row: PaymentTransactionRow) -> Result<TransactionRecord, DomainError> {
    Ok(TransactionRecord {
        state: row.state.parse()?,
        provider_transaction_id: row.provider_transaction_id,
        order_id: row.order_id,
        amount: row.amount,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bigdecimal::BigDecimal;

    use crate::application::order_service::OrderService;
    use crate::application::payment_service::PaymentService;
    use crate::domain::errors::DomainError;
    use crate::infrastructure::test_db::migrated_store;

    #[tokio::test]
    #[ignore = "needs Docker for the Postgres container"]
    async fn reservation_and_release_move_stock() {
        let (_container, store) = migrated_store().await;
        let category = store.create_category("Hoodies").expect("category");
        let product = store
            .create_product(category, "Black hoodie", BigDecimal::from(250))
            .expect("product");
        let variant = store.create_variant(product, "M", 5).expect("variant");
        let orders = OrderService::new(Arc::new(store.clone()));

        let line = orders.add_line("u1", product, variant, 3).expect("add").line;
        assert_eq!(store.variant_count(variant).expect("count"), 2);

        assert_eq!(
            orders.add_line("u2", product, variant, 3),
            Err(DomainError::InsufficientStock { available: 2 })
        );

        orders.update_line("u1", line.id, 5).expect("grow");
        assert_eq!(store.variant_count(variant).expect("count"), 0);

        orders.remove_line("u1", line.id).expect("remove");
        assert_eq!(store.variant_count(variant).expect("count"), 5);
    }

    #[tokio::test]
    #[ignore = "needs Docker for the Postgres container"]
    async fn concurrent_adds_sell_exactly_the_stock() {
        let (_container, store) = migrated_store().await;
        let category = store.create_category("Caps").expect("category");
        let product = store
            .create_product(category, "Cap", BigDecimal::from(10))
            .expect("product");
        let variant = store.create_variant(product, "One size", 3).expect("variant");
        let orders = OrderService::new(Arc::new(store.clone()));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let orders = orders.clone();
                tokio::task::spawn_blocking(move || {
                    orders.add_line(&format!("user-{i}"), product, variant, 1)
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.expect("join") {
                Ok(_) => successes += 1,
                Err(DomainError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 3);
        assert_eq!(store.variant_count(variant).expect("count"), 0);
    }

    #[tokio::test]
    #[ignore = "needs Docker for the Postgres container"]
    async fn payment_cycle_is_idempotent_and_restores_stock() {
        let (_container, store) = migrated_store().await;
        let category = store.create_category("Shoes").expect("category");
        let product = store
            .create_product(category, "Sneaker", BigDecimal::from(90))
            .expect("product");
        let variant = store.create_variant(product, "42", 4).expect("variant");
        let shared = Arc::new(store.clone());
        let orders = OrderService::new(Arc::clone(&shared));
        let payments = PaymentService::new(shared);

        orders.add_line("u1", product, variant, 4).expect("add");
        let order = orders.get_active_order("u1").expect("active");
        payments
            .on_payment_created("tx-1", order.id, 36000)
            .expect("created");
        payments.on_payment_succeeded("tx-1").expect("paid");
        assert_eq!(
            payments.on_payment_succeeded("tx-1"),
            Err(DomainError::AlreadyPaid)
        );
        assert_eq!(store.variant_count(variant).expect("count"), 0);

        payments.on_payment_cancelled("tx-1").expect("cancelled");
        assert_eq!(store.variant_count(variant).expect("count"), 4);
        let reopened = orders.get_active_order("u1").expect("reopened");
        assert_eq!(reopened.id, order.id);
        assert!(reopened.lines.is_empty());
    }
}
