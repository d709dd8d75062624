//! A store kept entirely in process memory.
//!
//! Every transaction runs on a private copy of the state under one mutex and
//! is written back only when it succeeds, which gives the same all-or-nothing
//! and serialization guarantees the PostgreSQL adapter gets from row locks.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::catalog::{
    CategoryView, LikeOutcome, NotificationView, ProductView, VariantView,
};
use crate::domain::errors::DomainError;
use crate::domain::order::{LineRecord, OrderLineView, OrderRecord, OrderView, VariantRecord};
use crate::domain::payment::{TransactionRecord, TransactionState};
use crate::domain::ports::{
    CatalogRepository, InventoryLedger, NotificationRepository, OrderRepository, OrderTx,
};

#[derive(Debug, Clone)]
struct Category {
    id: Uuid,
    name: String,
}

#[derive(Debug, Clone)]
struct Product {
    id: Uuid,
    category_id: Uuid,
    name: String,
    price: BigDecimal,
    description: String,
    image: Option<String>,
}

#[derive(Debug, Clone)]
struct Notification {
    id: Uuid,
    title: String,
    message: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct State {
    categories: Vec<Category>,
    products: Vec<Product>,
    variants: HashMap<Uuid, VariantRecord>,
    orders: HashMap<Uuid, OrderRecord>,
    lines: HashMap<Uuid, LineRecord>,
    transactions: HashMap<String, TransactionRecord>,
    likes: HashMap<(Uuid, String), bool>,
    notifications: Vec<Notification>,
    reads: HashSet<(Uuid, String)>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("in-memory store lock poisoned".to_string()))
    }

    // Seeding and inspection helpers read through a poisoned lock.

    fn seed(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_category(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.seed().categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_product(&self, category_id: Uuid, name: &str, price: BigDecimal) -> Uuid {
        let id = Uuid::new_v4();
        self.seed().products.push(Product {
            id,
            category_id,
            name: name.to_string(),
            price,
            description: String::new(),
            image: None,
        });
        id
    }

    pub fn add_variant(&self, product_id: Uuid, label: &str, count: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.seed().variants.insert(
            id,
            VariantRecord {
                id,
                product_id,
                label: label.to_string(),
                count,
            },
        );
        id
    }

    pub fn add_notification(&self, title: &str, message: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.seed().notifications.push(Notification {
            id,
            title: title.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        });
        id
    }

    pub fn set_price(&self, product_id: Uuid, price: BigDecimal) {
        if let Some(product) = self.seed().products.iter_mut().find(|p| p.id == product_id) {
            product.price = price;
        }
    }

    pub fn variant_count(&self, variant_id: Uuid) -> Option<i32> {
        self.seed().variants.get(&variant_id).map(|v| v.count)
    }

    /// Units of a variant held by lines of unpaid orders.
    pub fn reserved_quantity(&self, variant_id: Uuid) -> i32 {
        let state = self.seed();
        state
            .lines
            .values()
            .filter(|line| line.variant_id == variant_id)
            .filter(|line| {
                state
                    .orders
                    .get(&line.order_id)
                    .is_some_and(|order| !order.is_paid)
            })
            .map(|line| line.quantity)
            .sum()
    }
}

impl State {
    fn product_view(&self, product: &Product, viewer: Option<&str>) -> ProductView {
        let mut sizes: Vec<VariantView> = self
            .variants
            .values()
            .filter(|v| v.product_id == product.id)
            .map(|v| VariantView {
                id: v.id,
                label: v.label.clone(),
                count: v.count,
            })
            .collect();
        sizes.sort_by(|a, b| a.label.cmp(&b.label));

        let liked_by_user = viewer.is_some_and(|user| {
            self.likes
                .get(&(product.id, user.to_string()))
                .copied()
                .unwrap_or(false)
        });

        ProductView {
            id: product.id,
            category_id: product.category_id,
            name: product.name.clone(),
            price: product.price.clone(),
            description: product.description.clone(),
            image: product.image.clone(),
            sizes,
            liked_by_user,
        }
    }

    fn products_where(
        &self,
        viewer: Option<&str>,
        keep: impl Fn(&Product) -> bool,
    ) -> Vec<ProductView> {
        let mut products: Vec<ProductView> = self
            .products
            .iter()
            .filter(|p| keep(p))
            .map(|p| self.product_view(p, viewer))
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products
    }

    fn category_view(&self, category: &Category, viewer: Option<&str>) -> CategoryView {
        CategoryView {
            id: category.id,
            name: category.name.clone(),
            products: self.products_where(viewer, |p| p.category_id == category.id),
        }
    }
}

struct MemoryTx<'s> {
    state: &'s mut State,
}

impl MemoryTx<'_> {
    fn variant_mut(&mut self, variant_id: Uuid) -> Result<&mut VariantRecord, DomainError> {
        self.state
            .variants
            .get_mut(&variant_id)
            .ok_or(DomainError::ProductOrVariantNotFound)
    }

    fn order_mut(&mut self, order_id: Uuid) -> Result<&mut OrderRecord, DomainError> {
        self.state
            .orders
            .get_mut(&order_id)
            .ok_or(DomainError::OrderNotFound)
    }
}

impl InventoryLedger for MemoryTx<'_> {
    fn reserve(&mut self, variant_id: Uuid, quantity: i32) -> Result<i32, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity);
        }
        let variant = self.variant_mut(variant_id)?;
        if variant.count < quantity {
            return Err(DomainError::InsufficientStock {
                available: variant.count,
            });
        }
        variant.count -= quantity;
        Ok(variant.count)
    }

    fn release(&mut self, variant_id: Uuid, quantity: i32) -> Result<i32, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity);
        }
        let variant = self.variant_mut(variant_id)?;
        variant.count += quantity;
        Ok(variant.count)
    }
}

impl OrderTx for MemoryTx<'_> {
    fn find_variant(
        &mut self,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<VariantRecord>, DomainError> {
        Ok(self
            .state
            .variants
            .get(&variant_id)
            .filter(|v| v.product_id == product_id)
            .cloned())
    }

    fn get_or_create_unpaid_order(&mut self, user_id: &str) -> Result<OrderRecord, DomainError> {
        if let Some(order) = self.find_unpaid_order(user_id)? {
            return Ok(order);
        }
        let now = Utc::now();
        let order = OrderRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            is_paid: false,
            created_at: now,
            updated_at: now,
        };
        self.state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn find_unpaid_order(&mut self, user_id: &str) -> Result<Option<OrderRecord>, DomainError> {
        Ok(self
            .state
            .orders
            .values()
            .find(|o| o.user_id == user_id && !o.is_paid)
            .cloned())
    }

    fn lock_order(&mut self, order_id: Uuid) -> Result<Option<OrderRecord>, DomainError> {
        Ok(self.state.orders.get(&order_id).cloned())
    }

    fn set_paid(&mut self, order_id: Uuid, is_paid: bool) -> Result<(), DomainError> {
        let order = self.order_mut(order_id)?;
        order.is_paid = is_paid;
        order.updated_at = Utc::now();
        Ok(())
    }

    fn touch_order(&mut self, order_id: Uuid) -> Result<(), DomainError> {
        self.order_mut(order_id)?.updated_at = Utc::now();
        Ok(())
    }

    fn delete_order(&mut self, order_id: Uuid) -> Result<(), DomainError> {
        self.state.orders.remove(&order_id);
        self.state.lines.retain(|_, line| line.order_id != order_id);
        for record in self.state.transactions.values_mut() {
            if record.order_id == Some(order_id) {
                record.order_id = None;
            }
        }
        Ok(())
    }

    fn find_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<LineRecord>, DomainError> {
        Ok(self
            .state
            .lines
            .values()
            .find(|l| {
                l.order_id == order_id && l.product_id == product_id && l.variant_id == variant_id
            })
            .cloned())
    }

    fn find_owned_line(
        &mut self,
        user_id: &str,
        line_id: Uuid,
    ) -> Result<Option<LineRecord>, DomainError> {
        let Some(line) = self.state.lines.get(&line_id) else {
            return Ok(None);
        };
        let owned = self
            .state
            .orders
            .get(&line.order_id)
            .is_some_and(|o| o.user_id == user_id && !o.is_paid);
        Ok(owned.then(|| line.clone()))
    }

    fn order_lines(&mut self, order_id: Uuid) -> Result<Vec<LineRecord>, DomainError> {
        let mut lines: Vec<LineRecord> = self
            .state
            .lines
            .values()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.variant_id);
        Ok(lines)
    }

    fn insert_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<LineRecord, DomainError> {
        let line = LineRecord {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            variant_id,
            quantity,
        };
        self.state.lines.insert(line.id, line.clone());
        Ok(line)
    }

    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let line = self
            .state
            .lines
            .get_mut(&line_id)
            .ok_or(DomainError::LineNotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError> {
        self.state.lines.remove(&line_id);
        Ok(())
    }

    fn delete_order_lines(&mut self, order_id: Uuid) -> Result<(), DomainError> {
        self.state.lines.retain(|_, line| line.order_id != order_id);
        Ok(())
    }

    fn line_view(&mut self, line_id: Uuid) -> Result<OrderLineView, DomainError> {
        let line = self
            .state
            .lines
            .get(&line_id)
            .ok_or(DomainError::LineNotFound)?;
        let product = self
            .state
            .products
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or(DomainError::ProductOrVariantNotFound)?;
        let variant = self
            .state
            .variants
            .get(&line.variant_id)
            .ok_or(DomainError::ProductOrVariantNotFound)?;
        Ok(OrderLineView {
            id: line.id,
            product_id: product.id,
            product_name: product.name.clone(),
            variant_id: variant.id,
            size_name: variant.label.clone(),
            quantity: line.quantity,
            available_stock: variant.count,
            unit_price: product.price.clone(),
        })
    }

    fn order_view(&mut self, order: OrderRecord) -> Result<OrderView, DomainError> {
        let mut lines = self.order_lines(order.id)?;
        lines.sort_by_key(|l| l.id);
        let views = lines
            .iter()
            .map(|l| self.line_view(l.id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OrderView::new(order, views))
    }

    fn find_transaction(
        &mut self,
        provider_transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, DomainError> {
        Ok(self.state.transactions.get(provider_transaction_id).cloned())
    }

    fn insert_transaction(
        &mut self,
        provider_transaction_id: &str,
        order_id: Uuid,
        amount: i64,
    ) -> Result<TransactionRecord, DomainError> {
        let record = TransactionRecord {
            provider_transaction_id: provider_transaction_id.to_string(),
            order_id: Some(order_id),
            amount,
            state: TransactionState::Created,
        };
        self.state
            .transactions
            .insert(record.provider_transaction_id.clone(), record.clone());
        Ok(record)
    }

    fn set_transaction_state(
        &mut self,
        provider_transaction_id: &str,
        state: TransactionState,
    ) -> Result<(), DomainError> {
        let record = self
            .state
            .transactions
            .get_mut(provider_transaction_id)
            .ok_or(DomainError::OrderNotFound)?;
        record.state = state;
        Ok(())
    }
}

impl OrderRepository for InMemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn OrderTx) -> Result<T, DomainError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let out = f(&mut MemoryTx {
            state: &mut working,
        })?;
        *guard = working;
        Ok(out)
    }
}

impl CatalogRepository for InMemoryStore {
    fn list_categories(&self, viewer: Option<&str>) -> Result<Vec<CategoryView>, DomainError> {
        let state = self.lock()?;
        let mut categories: Vec<CategoryView> = state
            .categories
            .iter()
            .map(|c| state.category_view(c, viewer))
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn find_category(
        &self,
        id: Uuid,
        viewer: Option<&str>,
    ) -> Result<Option<CategoryView>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| state.category_view(c, viewer)))
    }

    fn list_products(&self, viewer: Option<&str>) -> Result<Vec<ProductView>, DomainError> {
        Ok(self.lock()?.products_where(viewer, |_| true))
    }

    fn find_product(
        &self,
        id: Uuid,
        viewer: Option<&str>,
    ) -> Result<Option<ProductView>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| state.product_view(p, viewer)))
    }

    fn liked_products(&self, user_id: &str) -> Result<Vec<ProductView>, DomainError> {
        let state = self.lock()?;
        Ok(state.products_where(Some(user_id), |p| {
            state
                .likes
                .get(&(p.id, user_id.to_string()))
                .copied()
                .unwrap_or(false)
        }))
    }

    fn toggle_like(&self, user_id: &str, product_id: Uuid) -> Result<LikeOutcome, DomainError> {
        let mut state = self.lock()?;
        if !state.products.iter().any(|p| p.id == product_id) {
            return Err(DomainError::NotFound("Product"));
        }
        let key = (product_id, user_id.to_string());
        let outcome = match state.likes.get(&key).copied() {
            Some(current) => LikeOutcome {
                is_like: !current,
                created: false,
            },
            None => LikeOutcome {
                is_like: true,
                created: true,
            },
        };
        state.likes.insert(key, outcome.is_like);
        Ok(outcome)
    }
}

impl NotificationRepository for InMemoryStore {
    fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationView>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .rev()
            .map(|n| NotificationView {
                id: n.id,
                title: n.title.clone(),
                message: n.message.clone(),
                created_at: n.created_at,
                has_viewed: state.reads.contains(&(n.id, user_id.to_string())),
            })
            .collect())
    }

    fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        if !state.notifications.iter().any(|n| n.id == notification_id) {
            return Err(DomainError::NotFound("Notification"));
        }
        state.reads.insert((notification_id, user_id.to_string()));
        Ok(())
    }
}
