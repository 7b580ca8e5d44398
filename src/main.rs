//! AI API gateway
//!
//! Exposes summarization, keyword extraction, image captioning and analysis,
//! moderation, translation, transcription, and document Q&A as uniform REST
//! endpoints backed by interchangeable AI providers.

mod api;
mod config;
mod document;
mod error;
mod ops;
mod prompts;
mod providers;
mod registry;
#[cfg(test)]
mod testing;
mod validate;

use api::{cors_layer, create_router, AppState};
use config::{Capability, GatewayConfig};
use registry::ServiceRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ai_api_gateway=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = GatewayConfig::from_env();
    if config.access_token.is_none() && !config.dev_mode {
        tracing::error!("DEFAULT_ACCESS_TOKEN is not set");
        return Err("DEFAULT_ACCESS_TOKEN is not set".into());
    }
    if config.dev_mode {
        tracing::warn!("Development mode: bearer auth disabled");
    }

    // Service registry
    let registry = Arc::new(ServiceRegistry::from_config(config.services)?);
    for capability in [
        Capability::TextGeneration,
        Capability::Vision,
        Capability::Moderation,
        Capability::Translation,
        Capability::Transcription,
    ] {
        match registry.primary_service(capability) {
            Some(service) => tracing::info!(capability = %capability, primary = %service.name(), "Capability available"),
            None => tracing::warn!(capability = %capability, "No enabled service for capability"),
        }
    }

    // Create router
    let access_token = if config.dev_mode { None } else { config.access_token };
    let state = AppState::new(registry, access_token);
    let app = create_router(state)
        .layer(cors_layer(config.cors_origins.as_deref()))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("AI API gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
