use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ProjectRequest, ProjectStatus, ProjectType};
use crate::services::mailer;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

const PROJECT_COLUMNS: &str = "id, name, email, phone, project_title, project_type, description, status, created_at";

#[derive(Deserialize, Debug)]
pub struct CreateProjectPayload {
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub project_title: String,
  pub project_type: ProjectType,
  pub description: String,
}

/// Public intake endpoint; notifies the store inbox in the background.
#[instrument(name = "handler::create_project_request", skip(state, payload), fields(project_title = %payload.project_title))]
pub async fn create_project_request(
  state: web::Data<AppState>,
  payload: web::Json<CreateProjectPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.name.is_empty() || payload.email.is_empty() || payload.project_title.is_empty() {
    return Err(AppError::Validation(
      "Name, email and project title are required.".to_string(),
    ));
  }

  let request: ProjectRequest = sqlx::query_as(&format!(
    "INSERT INTO project_requests (id, name, email, phone, project_title, project_type, description, status, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, 'new', NOW()) RETURNING {}",
    PROJECT_COLUMNS
  ))
  .bind(Uuid::new_v4())
  .bind(&payload.name)
  .bind(&payload.email)
  .bind(&payload.phone)
  .bind(&payload.project_title)
  .bind(payload.project_type)
  .bind(&payload.description)
  .fetch_one(&state.db_pool)
  .await?;

  let (subject, html) = mailer::project_request_notification(
    &request.name,
    &request.email,
    request.phone.as_deref(),
    &request.project_title,
    &serde_json::to_string(&request.project_type).unwrap_or_default(),
    &request.description,
  );
  state
    .mailer
    .send_fire_and_forget(state.config.admin_notification_email.clone(), subject, html);

  info!(request_id = %request.id, "Project request created.");
  Ok(HttpResponse::Created().json(request))
}

#[instrument(name = "handler::list_project_requests", skip(state, _admin))]
pub async fn list_project_requests(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let requests: Vec<ProjectRequest> = sqlx::query_as(&format!(
    "SELECT {} FROM project_requests ORDER BY created_at DESC",
    PROJECT_COLUMNS
  ))
  .fetch_all(&state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(requests))
}

#[derive(Deserialize, Debug)]
pub struct UpdateProjectStatusPayload {
  pub status: String,
}

#[instrument(name = "handler::update_project_request_status", skip(state, _admin, payload), fields(request_id = %path.as_ref()))]
pub async fn update_project_request_status(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateProjectStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let status =
    ProjectStatus::parse(&payload.status).ok_or_else(|| AppError::Validation("Invalid status".to_string()))?;

  let request_id = path.into_inner();
  let request: Option<ProjectRequest> = sqlx::query_as(&format!(
    "UPDATE project_requests SET status = $1 WHERE id = $2 RETURNING {}",
    PROJECT_COLUMNS
  ))
  .bind(status)
  .bind(request_id)
  .fetch_optional(&state.db_pool)
  .await?;

  request
    .map(|r| HttpResponse::Ok().json(r))
    .ok_or_else(|| AppError::NotFound("Request not found".to_string()))
}

#[instrument(name = "handler::delete_project_request", skip(state, _admin), fields(request_id = %path.as_ref()))]
pub async fn delete_project_request(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let request_id = path.into_inner();
  let result = sqlx::query("DELETE FROM project_requests WHERE id = $1")
    .bind(request_id)
    .execute(&state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Request not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({"message": "Request deleted successfully"})))
}
