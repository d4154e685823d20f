use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub is_staff: bool,
  pub is_superuser: bool,
  pub date_joined: DateTime<Utc>,
}

impl User {
  /// Superusers always carry staff privileges, even if the flag was never set.
  pub fn is_admin(&self) -> bool {
    self.is_staff || self.is_superuser
  }
}

/// Contact and shipping details kept separately from the auth record,
/// one row per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
  pub user_id: Uuid,
  pub phone: String,
  pub address_line1: String,
  pub address_line2: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
}
