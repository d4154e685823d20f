use crate::config::AppConfig;
use crate::services::mailer::Mailer;
use crate::services::payments::GatewayClient;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub config: Arc<AppConfig>,
  pub http_client: reqwest::Client,
  pub mailer: Arc<Mailer>,
  pub gateway: Arc<GatewayClient>,
}
