//! cart-server
//!
//! Axum server creating Stripe hosted Checkout sessions for cart contents.
//! Browser-side carts post their items here and redirect to the returned URL.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cart_checkout::{SessionClient, StripeSessionClient};

use crate::config::ServerConfig;
use crate::handlers::{create_checkout_session, health_check};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    // Initialize payments
    let sessions = match StripeSessionClient::from_env() {
        Ok(client) => {
            tracing::info!("✓ Stripe configured");
            Some(Arc::new(client) as Arc<dyn SessionClient>)
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - checkout disabled ({e})");
            tracing::warn!("  Set STRIPE_SECRET_KEY in .env");
            None
        }
    };

    let addr = config.bind_addr.clone();
    tracing::info!(success_url = %config.success_url(), cancel_url = %config.cancel_url(), "Redirect defaults");

    let state = AppState {
        sessions,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("cart-server running on http://{}", addr);
    tracing::info!("  GET  /health                       - Health check");
    tracing::info!("  POST /api/create-checkout-session  - Create checkout session");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/create-checkout-session", post(create_checkout_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
