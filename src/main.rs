use std::io;
use std::sync::Arc;

use dotenvy::dotenv;
use storefront_service::config::AppConfig;
use storefront_service::infrastructure::DieselStore;
use storefront_service::{build_server, create_pool, run_migrations};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config =
        AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let pool = create_pool(&config.database_url, config.pool_size)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    run_migrations(&pool).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    if config.payment.webhook_token.is_none() {
        log::warn!(
            "PAYMENT_WEBHOOK_TOKEN is not set; payment callbacks are accepted unauthenticated"
        );
    }
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(Arc::new(DieselStore::new(pool)), &config)?.await
}
