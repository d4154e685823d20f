use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  // JWT session tokens
  pub jwt_secret: String,
  pub access_token_ttl_secs: i64,
  pub refresh_token_ttl_secs: i64,

  // Payment gateway (Razorpay-compatible wire protocol)
  pub gateway_api_base: String,
  pub gateway_key_id: String,
  pub gateway_key_secret: String,

  // Google social login
  pub google_client_id: String,

  // Transactional email HTTP API
  pub email_api_base: String,
  pub email_api_key: String,
  pub email_sender: String,
  pub admin_notification_email: String,

  // Delivery estimation
  pub store_address: String,
  pub store_lat: f64,
  pub store_lon: f64,
  pub delivery_radius_km: f64,

  // Optional: for seeding DB on startup
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let jwt_secret = get_env("JWT_SECRET")?;
    let access_token_ttl_secs = get_env("ACCESS_TOKEN_TTL_SECS")
      .unwrap_or_else(|_| "900".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid ACCESS_TOKEN_TTL_SECS: {}", e)))?;
    let refresh_token_ttl_secs = get_env("REFRESH_TOKEN_TTL_SECS")
      .unwrap_or_else(|_| "604800".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid REFRESH_TOKEN_TTL_SECS: {}", e)))?;

    let gateway_api_base = get_env("GATEWAY_API_BASE").unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());
    let gateway_key_id = get_env("GATEWAY_KEY_ID")?;
    let gateway_key_secret = get_env("GATEWAY_KEY_SECRET")?;

    let google_client_id = get_env("GOOGLE_CLIENT_ID").unwrap_or_default();

    let email_api_base = get_env("EMAIL_API_BASE").unwrap_or_else(|_| "https://api.brevo.com/v3".to_string());
    let email_api_key = get_env("EMAIL_API_KEY").unwrap_or_default();
    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "noreply@makermart.example".to_string());
    let admin_notification_email =
      get_env("ADMIN_NOTIFICATION_EMAIL").unwrap_or_else(|_| "orders@makermart.example".to_string());

    let store_address = get_env("STORE_ADDRESS").unwrap_or_else(|_| "Ayapakkam, Chennai".to_string());
    let store_lat = get_env("STORE_LAT")
      .unwrap_or_else(|_| "13.1067".to_string())
      .parse::<f64>()
      .map_err(|e| AppError::Config(format!("Invalid STORE_LAT: {}", e)))?;
    let store_lon = get_env("STORE_LON")
      .unwrap_or_else(|_| "80.1444".to_string())
      .parse::<f64>()
      .map_err(|e| AppError::Config(format!("Invalid STORE_LON: {}", e)))?;
    let delivery_radius_km = get_env("DELIVERY_RADIUS_KM")
      .unwrap_or_else(|_| "100".to_string())
      .parse::<f64>()
      .map_err(|e| AppError::Config(format!("Invalid DELIVERY_RADIUS_KM: {}", e)))?;

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      jwt_secret,
      access_token_ttl_secs,
      refresh_token_ttl_secs,
      gateway_api_base,
      gateway_key_id,
      gateway_key_secret,
      google_client_id,
      email_api_base,
      email_api_key,
      email_sender,
      admin_notification_email,
      store_address,
      store_lat,
      store_lon,
      delivery_radius_km,
      seed_db,
    })
  }
}
