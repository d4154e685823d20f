use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub price_cents: i64,
  /// JSON array of image URLs.
  pub images: serde_json::Value,
  pub stock: i32,
  pub is_innovative_project: bool,
  /// Cleared (not cascaded) when the category is deleted.
  pub category_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}
