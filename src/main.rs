//! Storefront backend entry point.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::api::{self, AppState};
use storefront::config::AppConfig;
use storefront::media::{CloudinaryHost, ImageHost, InlineImageHost};
use storefront::messaging::EventPublisher;
use storefront::payments::{PaymentGateway, StripeGateway};
use storefront::storage::{MemoryStore, PgStore, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let stores = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            store.migrate().await?;
            Stores::from_backend(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, data will not survive a restart");
            Stores::from_backend(Arc::new(MemoryStore::new()))
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; domain events will not be published");
                None
            }
        },
        None => None,
    };

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(config.stripe.clone())?);
    let images: Arc<dyn ImageHost> = match config.cloudinary.clone() {
        Some(cloudinary) => Arc::new(CloudinaryHost::new(cloudinary)?),
        None => {
            tracing::info!("Cloudinary not configured; uploads are returned as data URIs");
            Arc::new(InlineImageHost)
        }
    };

    let port = config.port;
    let app = api::router(AppState::new(config, stores, gateway, images, EventPublisher::new(nats)));

    tracing::info!("storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
