use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Hard cap on gallery size per workshop.
pub const MAX_WORKSHOP_IMAGES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workshop {
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub date: NaiveDate,
  pub location: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkshopImage {
  pub id: Uuid,
  pub workshop_id: Uuid,
  pub image_url: String,
}
