use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::workshop::MAX_WORKSHOP_IMAGES;
use crate::models::{Workshop, WorkshopImage};
use crate::state::AppState;
use crate::web::extractors::AdminUser;

async fn fetch_images(state: &AppState, workshop_id: Uuid) -> Result<Vec<WorkshopImage>, AppError> {
  let images = sqlx::query_as("SELECT id, workshop_id, image_url FROM workshop_images WHERE workshop_id = $1")
    .bind(workshop_id)
    .fetch_all(&state.db_pool)
    .await?;
  Ok(images)
}

async fn workshop_json(state: &AppState, workshop: Workshop) -> Result<serde_json::Value, AppError> {
  let images = fetch_images(state, workshop.id).await?;
  Ok(json!({
    "id": workshop.id,
    "title": workshop.title,
    "description": workshop.description,
    "date": workshop.date,
    "location": workshop.location,
    "created_at": workshop.created_at,
    "images": images,
  }))
}

#[instrument(name = "handler::list_workshops", skip(state))]
pub async fn list_workshops(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let workshops: Vec<Workshop> =
    sqlx::query_as("SELECT id, title, description, date, location, created_at FROM workshops ORDER BY date DESC")
      .fetch_all(&state.db_pool)
      .await?;

  let mut result = Vec::with_capacity(workshops.len());
  for workshop in workshops {
    result.push(workshop_json(&state, workshop).await?);
  }
  Ok(HttpResponse::Ok().json(result))
}

#[instrument(name = "handler::get_workshop", skip(state), fields(workshop_id = %path.as_ref()))]
pub async fn get_workshop(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let workshop_id = path.into_inner();
  let workshop: Option<Workshop> =
    sqlx::query_as("SELECT id, title, description, date, location, created_at FROM workshops WHERE id = $1")
      .bind(workshop_id)
      .fetch_optional(&state.db_pool)
      .await?;

  match workshop {
    Some(w) => Ok(HttpResponse::Ok().json(workshop_json(&state, w).await?)),
    None => Err(AppError::NotFound(format!("Workshop with ID {} not found.", workshop_id))),
  }
}

#[derive(Deserialize, Debug)]
pub struct WorkshopPayload {
  pub title: String,
  pub description: String,
  pub date: chrono::NaiveDate,
  pub location: String,
  #[serde(default)]
  pub image_urls: Vec<String>,
}

#[instrument(name = "handler::create_workshop", skip(state, _admin, payload), fields(title = %payload.title))]
pub async fn create_workshop(
  state: web::Data<AppState>,
  _admin: AdminUser,
  payload: web::Json<WorkshopPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.title.is_empty() {
    return Err(AppError::Validation("Workshop title is required.".to_string()));
  }
  if payload.image_urls.len() > MAX_WORKSHOP_IMAGES {
    return Err(AppError::Validation(format!(
      "Maximum {} images allowed per workshop.",
      MAX_WORKSHOP_IMAGES
    )));
  }

  let mut tx = state.db_pool.begin().await?;
  let workshop: Workshop = sqlx::query_as(
    "INSERT INTO workshops (id, title, description, date, location, created_at) \
     VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING id, title, description, date, location, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(&payload.title)
  .bind(&payload.description)
  .bind(payload.date)
  .bind(&payload.location)
  .fetch_one(&mut *tx)
  .await?;

  for url in &payload.image_urls {
    sqlx::query("INSERT INTO workshop_images (id, workshop_id, image_url) VALUES ($1, $2, $3)")
      .bind(Uuid::new_v4())
      .bind(workshop.id)
      .bind(url)
      .execute(&mut *tx)
      .await?;
  }
  tx.commit().await?;

  info!(workshop_id = %workshop.id, "Workshop created.");
  Ok(HttpResponse::Created().json(workshop_json(&state, workshop).await?))
}

#[instrument(name = "handler::update_workshop", skip(state, _admin, payload), fields(workshop_id = %path.as_ref()))]
pub async fn update_workshop(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  payload: web::Json<WorkshopPayload>,
) -> Result<HttpResponse, AppError> {
  let workshop_id = path.into_inner();

  let mut tx = state.db_pool.begin().await?;
  let workshop: Option<Workshop> = sqlx::query_as(
    "UPDATE workshops SET title = $1, description = $2, date = $3, location = $4 WHERE id = $5 \
     RETURNING id, title, description, date, location, created_at",
  )
  .bind(&payload.title)
  .bind(&payload.description)
  .bind(payload.date)
  .bind(&payload.location)
  .bind(workshop_id)
  .fetch_optional(&mut *tx)
  .await?;
  let workshop = workshop.ok_or_else(|| AppError::NotFound(format!("Workshop with ID {} not found.", workshop_id)))?;

  // New images are appended; current + new must fit the cap.
  let current_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workshop_images WHERE workshop_id = $1")
    .bind(workshop_id)
    .fetch_one(&mut *tx)
    .await?;
  if current_count as usize + payload.image_urls.len() > MAX_WORKSHOP_IMAGES {
    return Err(AppError::Validation(format!(
      "Maximum {} images allowed per workshop.",
      MAX_WORKSHOP_IMAGES
    )));
  }

  for url in &payload.image_urls {
    sqlx::query("INSERT INTO workshop_images (id, workshop_id, image_url) VALUES ($1, $2, $3)")
      .bind(Uuid::new_v4())
      .bind(workshop_id)
      .bind(url)
      .execute(&mut *tx)
      .await?;
  }
  tx.commit().await?;

  Ok(HttpResponse::Ok().json(workshop_json(&state, workshop).await?))
}

#[instrument(name = "handler::delete_workshop", skip(state, _admin), fields(workshop_id = %path.as_ref()))]
pub async fn delete_workshop(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let workshop_id = path.into_inner();
  let result = sqlx::query("DELETE FROM workshops WHERE id = $1")
    .bind(workshop_id)
    .execute(&state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Workshop with ID {} not found.", workshop_id)));
  }
  Ok(HttpResponse::Ok().json(json!({"detail": "Workshop deleted"})))
}

#[derive(Deserialize, Debug)]
pub struct DeleteImagePayload {
  pub image_id: Uuid,
}

#[instrument(name = "handler::delete_workshop_image", skip(state, _admin, payload), fields(workshop_id = %path.as_ref(), image_id = %payload.image_id))]
pub async fn delete_workshop_image(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  payload: web::Json<DeleteImagePayload>,
) -> Result<HttpResponse, AppError> {
  let workshop_id = path.into_inner();
  let result = sqlx::query("DELETE FROM workshop_images WHERE id = $1 AND workshop_id = $2")
    .bind(payload.image_id)
    .bind(workshop_id)
    .execute(&state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Image not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({"status": "Image deleted"})))
}
