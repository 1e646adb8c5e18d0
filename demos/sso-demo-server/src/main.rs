use anyhow::{Context, Result};
use sso_identity_oidc::{OidcConfig, build_auth_service};
use sso_identity_session::{InMemorySessions, SessionConfig};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod routes;

use routes::{AppState, create_router};

/// Configuration for the demo server
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub oidc: OidcConfig,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            oidc: OidcConfig::from_env().context("Invalid GOVBR_* provider configuration")?,
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting SSO demo server");

    let auth = build_auth_service(config.oidc.clone())
        .context("Failed to initialize the authentication service")?;
    let sessions = InMemorySessions::new(SessionConfig::default());

    let cleanup_sessions = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_sessions.cleanup_expired().await;
        }
    });

    let app = create_router(AppState { auth, sessions });

    let bind_addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Server running on http://{}", bind_addr);
    info!("OAuth2 redirect URI: {}", config.oidc.redirect_uri);
    if config.oidc.retain_access_token {
        warn!("Access tokens are kept in sessions for photo retrieval");
    }

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
