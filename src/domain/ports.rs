use uuid::Uuid;

use super::catalog::{CategoryView, LikeOutcome, NotificationView, ProductView};
use super::errors::DomainError;
use super::order::{LineRecord, OrderLineView, OrderRecord, OrderView, VariantRecord};
use super::payment::{TransactionRecord, TransactionState};

/// Per-variant stock. Both operations must be atomic with respect to other
/// reservations of the same variant.
pub trait InventoryLedger {
    /// Takes `quantity` units out of stock and returns what is left.
    /// Fails with `InsufficientStock` without touching the count when fewer
    /// than `quantity` units remain.
    fn reserve(&mut self, variant_id: Uuid, quantity: i32) -> Result<i32, DomainError>;

    /// Puts `quantity` units back and returns the new count.
    fn release(&mut self, variant_id: Uuid, quantity: i32) -> Result<i32, DomainError>;
}

/// Operations available inside one store transaction. Methods named `lock_*`
/// or `get_or_create_*` hold the order row until the transaction ends.
pub trait OrderTx: InventoryLedger {
    fn find_variant(
        &mut self,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<VariantRecord>, DomainError>;

    fn get_or_create_unpaid_order(&mut self, user_id: &str) -> Result<OrderRecord, DomainError>;
    fn find_unpaid_order(&mut self, user_id: &str) -> Result<Option<OrderRecord>, DomainError>;
    fn lock_order(&mut self, order_id: Uuid) -> Result<Option<OrderRecord>, DomainError>;
    fn set_paid(&mut self, order_id: Uuid, is_paid: bool) -> Result<(), DomainError>;
    fn touch_order(&mut self, order_id: Uuid) -> Result<(), DomainError>;
    fn delete_order(&mut self, order_id: Uuid) -> Result<(), DomainError>;

    fn find_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<LineRecord>, DomainError>;
    /// A line of an unpaid order belonging to `user_id`.
    fn find_owned_line(
        &mut self,
        user_id: &str,
        line_id: Uuid,
    ) -> Result<Option<LineRecord>, DomainError>;
    fn order_lines(&mut self, order_id: Uuid) -> Result<Vec<LineRecord>, DomainError>;
    fn insert_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<LineRecord, DomainError>;
    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError>;
    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError>;
    fn delete_order_lines(&mut self, order_id: Uuid) -> Result<(), DomainError>;

    fn line_view(&mut self, line_id: Uuid) -> Result<OrderLineView, DomainError>;
    fn order_view(&mut self, order: OrderRecord) -> Result<OrderView, DomainError>;

    /// Looks up and locks a provider transaction.
    fn find_transaction(
        &mut self,
        provider_transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, DomainError>;
    fn insert_transaction(
        &mut self,
        provider_transaction_id: &str,
        order_id: Uuid,
        amount: i64,
    ) -> Result<TransactionRecord, DomainError>;
    fn set_transaction_state(
        &mut self,
        provider_transaction_id: &str,
        state: TransactionState,
    ) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Runs `f` in one transaction; an `Err` from `f` rolls everything back.
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn OrderTx) -> Result<T, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn list_categories(&self, viewer: Option<&str>) -> Result<Vec<CategoryView>, DomainError>;
    fn find_category(
        &self,
        id: Uuid,
        viewer: Option<&str>,
    ) -> Result<Option<CategoryView>, DomainError>;
    fn list_products(&self, viewer: Option<&str>) -> Result<Vec<ProductView>, DomainError>;
    fn find_product(
        &self,
        id: Uuid,
        viewer: Option<&str>,
    ) -> Result<Option<ProductView>, DomainError>;
    fn liked_products(&self, user_id: &str) -> Result<Vec<ProductView>, DomainError>;
    fn toggle_like(&self, user_id: &str, product_id: Uuid) -> Result<LikeOutcome, DomainError>;
}

pub trait NotificationRepository: Send + Sync + 'static {
    /// Newest first.
    fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationView>, DomainError>;
    fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<(), DomainError>;
}

/// Everything the HTTP layer needs from a backing store.
pub trait Store: OrderRepository + CatalogRepository + NotificationRepository {}

impl<T> Store for T where T: OrderRepository + CatalogRepository + NotificationRepository {}
