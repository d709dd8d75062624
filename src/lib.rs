pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod payment_link;
pub mod schema;
pub mod state;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::domain::ports::Store;
use crate::state::AppState;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("migrations failed: {}", e)))?;
    Ok(())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::orders::add_line,
        handlers::orders::update_line,
        handlers::orders::remove_line,
        handlers::orders::active_order,
        handlers::orders::list_items,
        handlers::payments::webhook,
        handlers::catalog::list_categories,
        handlers::catalog::get_category,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::toggle_like,
        handlers::catalog::liked_products,
        handlers::notifications::list_notifications,
        handlers::notifications::mark_read,
    ),
    components(schemas(
        handlers::orders::AddLineRequest,
        handlers::orders::UpdateLineRequest,
        handlers::orders::RemoveLineRequest,
        handlers::orders::OrderLineResponse,
        handlers::orders::OrderResponse,
        handlers::orders::ActiveOrderResponse,
        handlers::orders::UpdateLineResponse,
        handlers::orders::MessageResponse,
        handlers::payments::PaymentWebhook,
        handlers::payments::WebhookResult,
        handlers::payments::WebhookResponse,
        handlers::catalog::SizeResponse,
        handlers::catalog::ProductResponse,
        handlers::catalog::CategoryResponse,
        handlers::catalog::LikeResponse,
        handlers::notifications::NotificationResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "order", description = "Cart and active order"),
        (name = "payments", description = "Payment provider callbacks"),
        (name = "catalog", description = "Categories, products and likes"),
        (name = "notifications", description = "Broadcast notifications"),
    )
)]
pub struct ApiDoc;

/// Registers every route against the store type `S`.
pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(errors::json_error))
        .app_data(web::PathConfig::default().error_handler(errors::path_error))
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/order")
                .route("/add", web::post().to(handlers::orders::add_line::<S>))
                .route("/update", web::patch().to(handlers::orders::update_line::<S>))
                .route("/remove", web::delete().to(handlers::orders::remove_line::<S>))
                .route("/active", web::get().to(handlers::orders::active_order::<S>))
                .route("/items", web::get().to(handlers::orders::list_items::<S>)),
        )
        .route(
            "/payments/webhook",
            web::post().to(handlers::payments::webhook::<S>),
        )
        .service(
            web::scope("/categories")
                .route("", web::get().to(handlers::catalog::list_categories::<S>))
                .route("/{id}", web::get().to(handlers::catalog::get_category::<S>)),
        )
        .service(
            web::scope("/products")
                .route("", web::get().to(handlers::catalog::list_products::<S>))
                .route(
                    "/like/{product_id}",
                    web::post().to(handlers::catalog::toggle_like::<S>),
                )
                .route("/{id}", web::get().to(handlers::catalog::get_product::<S>)),
        )
        .route(
            "/liked-products",
            web::get().to(handlers::catalog::liked_products::<S>),
        )
        .service(
            web::scope("/notifications")
                .route("", web::get().to(handlers::notifications::list_notifications::<S>))
                .route(
                    "/{id}/read",
                    web::post().to(handlers::notifications::mark_read::<S>),
                ),
        );
}

/// Build and return an actix-web `Server` bound to the configured address.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server<S: Store>(
    store: Arc<S>,
    config: &AppConfig,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(AppState::new(store, &config.payment));
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure::<S>)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((config.host.clone(), config.port))?
    .run())
}
