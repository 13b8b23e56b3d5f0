//! Sanctuary AV - storefront and back-office service

use anyhow::Result;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sanctuary_av::api::{self, AppState};
use sanctuary_av::config::AppConfig;
use sanctuary_av::repository::{MemoryRepository, PgRepository, Repository};
use sanctuary_av::services::{ContentGenerator, EventBus, HttpContentGenerator, HttpMailer, LogMailer, Mailer};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env()?;
    if config.uses_insecure_secret() && config.admin.password_hash.is_some() {
        tracing::warn!("admin login is enabled with the default JWT secret");
    }

    let repo: Arc<dyn Repository> = match config.database_url.as_deref() {
        Some(url) => {
            let pg = PgRepository::connect(url).await?;
            pg.migrate().await?;
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemoryRepository::new())
        }
    };
    let events = EventBus::connect(config.nats_url.as_deref()).await;
    let mailer: Arc<dyn Mailer> = match config.mail.clone() {
        Some(mail) => Arc::new(HttpMailer::new(mail)),
        None => Arc::new(LogMailer),
    };
    let ai = config.ai.clone().map(|ai| Arc::new(HttpContentGenerator::new(ai)) as Arc<dyn ContentGenerator>);
    let port = config.port;
    let state = AppState { repo, events, mailer, ai, config: Arc::new(config) };

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("🚀 Sanctuary AV listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
