use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantView {
    pub id: Uuid,
    pub label: String,
    pub count: i32,
}

impl VariantView {
    pub fn is_available(&self) -> bool {
        self.count > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductView {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub description: String,
    pub image: Option<String>,
    pub sizes: Vec<VariantView>,
    /// Whether the viewing user currently likes the product; false when anonymous.
    pub liked_by_user: bool,
}

impl ProductView {
    pub fn total_count(&self) -> i64 {
        self.sizes.iter().map(|s| i64::from(s.count)).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub products: Vec<ProductView>,
}

/// Outcome of toggling a like mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub is_like: bool,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub has_viewed: bool,
}
