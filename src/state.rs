use std::sync::Arc;

use crate::application::catalog_service::{CatalogService, NotificationService};
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::config::PaymentConfig;
use crate::domain::ports::Store;
use crate::payment_link::PaymentLinkBuilder;

/// Shared per-app state handed to every handler as `web::Data<AppState<S>>`.
pub struct AppState<S> {
    pub orders: OrderService<S>,
    pub payments: PaymentService<S>,
    pub catalog: CatalogService<S>,
    pub notifications: NotificationService<S>,
    pub payment_links: PaymentLinkBuilder,
    pub webhook_token: Option<String>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: Arc<S>, payment: &PaymentConfig) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            payments: PaymentService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            notifications: NotificationService::new(store),
            payment_links: PaymentLinkBuilder::new(payment),
            webhook_token: payment.webhook_token.clone(),
        }
    }
}
