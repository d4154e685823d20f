use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::WorkshopEnquiry;
use crate::services::mailer;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
pub struct CreateEnquiryPayload {
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub message: String,
  pub workshop_id: Option<Uuid>,
}

/// Public enquiry form; the store inbox is notified in the background.
#[instrument(name = "handler::create_enquiry", skip(state, payload), fields(email = %payload.email))]
pub async fn create_enquiry(
  state: web::Data<AppState>,
  payload: web::Json<CreateEnquiryPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.name.is_empty() || payload.email.is_empty() {
    return Err(AppError::Validation("Name and email are required.".to_string()));
  }

  let workshop_title: Option<String> = match payload.workshop_id {
    Some(id) => {
      sqlx::query_scalar("SELECT title FROM workshops WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
    }
    None => None,
  };

  let enquiry: WorkshopEnquiry = sqlx::query_as(
    "INSERT INTO workshop_enquiries (id, workshop_id, name, email, phone, message, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
     RETURNING id, workshop_id, name, email, phone, message, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(payload.workshop_id)
  .bind(&payload.name)
  .bind(&payload.email)
  .bind(&payload.phone)
  .bind(&payload.message)
  .fetch_one(&state.db_pool)
  .await?;

  let (subject, html) = mailer::enquiry_notification(
    &enquiry.name,
    &enquiry.email,
    enquiry.phone.as_deref(),
    workshop_title.as_deref(),
    &enquiry.message,
  );
  state
    .mailer
    .send_fire_and_forget(state.config.admin_notification_email.clone(), subject, html);

  info!(enquiry_id = %enquiry.id, "Workshop enquiry created.");
  Ok(HttpResponse::Created().json(enquiry))
}

#[instrument(name = "handler::list_enquiries", skip(state, _admin))]
pub async fn list_enquiries(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let enquiries: Vec<WorkshopEnquiry> = sqlx::query_as(
    "SELECT id, workshop_id, name, email, phone, message, created_at \
     FROM workshop_enquiries ORDER BY created_at DESC",
  )
  .fetch_all(&state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(enquiries))
}
