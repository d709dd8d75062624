use std::sync::Arc;

use uuid::Uuid;

use crate::domain::catalog::{CategoryView, LikeOutcome, NotificationView, ProductView};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogRepository, NotificationRepository};

pub struct CatalogService<R> {
    repo: Arc<R>,
}

impl<R> Clone for CatalogService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn categories(&self, viewer: Option<&str>) -> Result<Vec<CategoryView>, DomainError> {
        self.repo.list_categories(viewer)
    }

    pub fn category(&self, id: Uuid, viewer: Option<&str>) -> Result<CategoryView, DomainError> {
        self.repo
            .find_category(id, viewer)?
            .ok_or(DomainError::NotFound("Category"))
    }

    pub fn products(&self, viewer: Option<&str>) -> Result<Vec<ProductView>, DomainError> {
        self.repo.list_products(viewer)
    }

    pub fn product(&self, id: Uuid, viewer: Option<&str>) -> Result<ProductView, DomainError> {
        self.repo
            .find_product(id, viewer)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn liked_products(&self, user_id: &str) -> Result<Vec<ProductView>, DomainError> {
        self.repo.liked_products(user_id)
    }

    pub fn toggle_like(&self, user_id: &str, product_id: Uuid) -> Result<LikeOutcome, DomainError> {
        let outcome = self.repo.toggle_like(user_id, product_id)?;
        log::debug!(
            "user {} {} product {}",
            user_id,
            if outcome.is_like { "liked" } else { "unliked" },
            product_id
        );
        Ok(outcome)
    }
}

pub struct NotificationService<R> {
    repo: Arc<R>,
}

impl<R> Clone for NotificationService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: NotificationRepository> NotificationService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn for_user(&self, user_id: &str) -> Result<Vec<NotificationView>, DomainError> {
        self.repo.list_for_user(user_id)
    }

    pub fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<(), DomainError> {
        self.repo.mark_read(user_id, notification_id)
    }
}
