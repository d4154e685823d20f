use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Workshop/training enquiry submitted from the public site, optionally
/// tied to a specific listed workshop.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkshopEnquiry {
  pub id: Uuid,
  pub workshop_id: Option<Uuid>,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub message: String,
  pub created_at: DateTime<Utc>,
}
