use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::catalog::{CategoryView, ProductView, VariantView};
use crate::domain::ports::Store;
use crate::errors::AppError;
use crate::state::AppState;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct SizeResponse {
    pub size_id: Uuid,
    pub size_name: String,
    pub count: i32,
    pub is_available: bool,
}

impl From<VariantView> for SizeResponse {
    fn from(v: VariantView) -> Self {
        Self {
            is_available: v.is_available(),
            size_id: v.id,
            size_name: v.label,
            count: v.count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub price: String,
    pub description: String,
    pub image: Option<String>,
    pub sizes: Vec<SizeResponse>,
    pub total_count: i64,
    pub liked_by_user: bool,
}

impl From<ProductView> for ProductResponse {
    fn from(p: ProductView) -> Self {
        Self {
            total_count: p.total_count(),
            id: p.id,
            category_id: p.category_id,
            name: p.name,
            price: p.price.to_string(),
            description: p.description,
            image: p.image,
            sizes: p.sizes.into_iter().map(SizeResponse::from).collect(),
            liked_by_user: p.liked_by_user,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub products: Vec<ProductResponse>,
}

impl From<CategoryView> for CategoryResponse {
    fn from(c: CategoryView) -> Self {
        Self {
            id: c.id,
            name: c.name,
            products: c.products.into_iter().map(ProductResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeResponse {
    pub message: String,
    pub is_like: bool,
}

fn products(views: Vec<ProductView>) -> Vec<ProductResponse> {
    views.into_iter().map(ProductResponse::from).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /categories
///
/// Anonymous callers are served too; `liked_by_user` is then always false.
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "All categories with their products", body = Vec<CategoryResponse>),
    ),
    tag = "catalog"
)]
pub async fn list_categories<S: Store>(
    state: web::Data<AppState<S>>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let viewer = user.map(|u| u.0);

    let categories = web::block(move || state.catalog.categories(viewer.as_deref()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<CategoryResponse> = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /categories/{id}
#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category UUID"),
    ),
    responses(
        (status = 200, description = "Category found", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    tag = "catalog"
)]
pub async fn get_category<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<Uuid>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let viewer = user.map(|u| u.0);

    let category = web::block(move || state.catalog.category(id, viewer.as_deref()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "All products", body = Vec<ProductResponse>),
    ),
    tag = "catalog"
)]
pub async fn list_products<S: Store>(
    state: web::Data<AppState<S>>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let viewer = user.map(|u| u.0);

    let views = web::block(move || state.catalog.products(viewer.as_deref()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(products(views)))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn get_product<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<Uuid>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let viewer = user.map(|u| u.0);

    let product = web::block(move || state.catalog.product(id, viewer.as_deref()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// POST /products/like/{product_id}
///
/// Flips the caller's like mark. The first like of a product answers 201.
#[utoipa::path(
    post,
    path = "/products/like/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 201, description = "First like recorded", body = LikeResponse),
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 401, description = "Missing bearer identity"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn toggle_like<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let outcome = web::block(move || state.catalog.toggle_like(user.id(), product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body = LikeResponse {
        message: if outcome.is_like { "Product liked!" } else { "Product unliked!" }.to_string(),
        is_like: outcome.is_like,
    };
    if outcome.created {
        Ok(HttpResponse::Created().json(body))
    } else {
        Ok(HttpResponse::Ok().json(body))
    }
}

/// GET /liked-products
#[utoipa::path(
    get,
    path = "/liked-products",
    responses(
        (status = 200, description = "Products the caller likes", body = Vec<ProductResponse>),
        (status = 401, description = "Missing bearer identity"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn liked_products<S: Store>(
    state: web::Data<AppState<S>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let views = web::block(move || state.catalog.liked_products(user.id()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(products(views)))
}
