mod config;
mod db;
mod errors;
mod models;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::services::mailer::Mailer;
use crate::services::payments::GatewayClient;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting MakerMart backend server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  if app_config.seed_db {
    if let Err(e) = db::seed_db(&db_pool).await {
      tracing::error!(error = %e, "Failed to seed database.");
    }
  }

  let http_client = match reqwest::Client::builder()
    .timeout(std::time::Duration::from_secs(10))
    .build()
  {
    Ok(client) => client,
    Err(e) => {
      tracing::error!(error = %e, "Failed to build HTTP client.");
      panic!("HTTP client error: {}", e);
    }
  };

  let mailer = Arc::new(Mailer::new(
    app_config.email_api_base.clone(),
    app_config.email_api_key.clone(),
    app_config.email_sender.clone(),
    http_client.clone(),
  ));

  let gateway = Arc::new(GatewayClient::new(
    app_config.gateway_api_base.clone(),
    app_config.gateway_key_id.clone(),
    app_config.gateway_key_secret.clone(),
    http_client.clone(),
  ));

  let app_state = AppState {
    db_pool: db_pool.clone(),
    config: app_config.clone(),
    http_client,
    mailer,
    gateway,
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::routes::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
