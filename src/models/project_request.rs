use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "project_type_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
  Robotics,
  Iot,
  Pcb,
  Drone,
  Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "project_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
  New,
  InProgress,
  Completed,
  Rejected,
}

impl ProjectStatus {
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "new" => Some(ProjectStatus::New),
      "in_progress" => Some(ProjectStatus::InProgress),
      "completed" => Some(ProjectStatus::Completed),
      "rejected" => Some(ProjectStatus::Rejected),
      _ => None,
    }
  }
}

/// Custom-project intake record submitted from the public site.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProjectRequest {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub project_title: String,
  pub project_type: ProjectType,
  pub description: String,
  pub status: ProjectStatus,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_rejects_unknown_statuses() {
    assert_eq!(ProjectStatus::parse("in_progress"), Some(ProjectStatus::InProgress));
    assert_eq!(ProjectStatus::parse("archived"), None);
  }
}
