use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::Profile;
use crate::services::{auth, mailer};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::handlers::auth_handlers::fetch_user_by_id;

async fn fetch_profile(state: &AppState, user_id: uuid::Uuid) -> Result<Option<Profile>, AppError> {
  let profile = sqlx::query_as(
    "SELECT user_id, phone, address_line1, address_line2, city, state, pincode FROM profiles WHERE user_id = $1",
  )
  .bind(user_id)
  .fetch_optional(&state.db_pool)
  .await?;
  Ok(profile)
}

#[instrument(name = "handler::current_user", skip(state), fields(user_id = %auth_user.user_id))]
pub async fn current_user(state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let user = fetch_user_by_id(&state, auth_user.user_id).await?;
  let profile = fetch_profile(&state, auth_user.user_id).await?;

  Ok(HttpResponse::Ok().json(json!({
    "id": user.id,
    "username": user.username,
    "email": user.email,
    "first_name": user.first_name,
    "last_name": user.last_name,
    "is_staff": user.is_staff,
    "is_superuser": user.is_superuser,
    "profile": profile,
  })))
}

#[derive(Deserialize, Debug)]
pub struct UpdateProfilePayload {
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub address_line1: Option<String>,
  pub address_line2: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub pincode: Option<String>,
}

/// Partial update: absent fields keep their stored values.
#[instrument(name = "handler::update_profile", skip(state, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_profile(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<UpdateProfilePayload>,
) -> Result<HttpResponse, AppError> {
  let mut tx = state.db_pool.begin().await?;

  sqlx::query(
    "UPDATE users SET \
       first_name = COALESCE($1, first_name), \
       last_name = COALESCE($2, last_name), \
       email = COALESCE($3, email) \
     WHERE id = $4",
  )
  .bind(&payload.first_name)
  .bind(&payload.last_name)
  .bind(&payload.email)
  .bind(auth_user.user_id)
  .execute(&mut *tx)
  .await?;

  sqlx::query(
    "UPDATE profiles SET \
       phone = COALESCE($1, phone), \
       address_line1 = COALESCE($2, address_line1), \
       address_line2 = COALESCE($3, address_line2), \
       city = COALESCE($4, city), \
       state = COALESCE($5, state), \
       pincode = COALESCE($6, pincode) \
     WHERE user_id = $7",
  )
  .bind(&payload.phone)
  .bind(&payload.address_line1)
  .bind(&payload.address_line2)
  .bind(&payload.city)
  .bind(&payload.state)
  .bind(&payload.pincode)
  .bind(auth_user.user_id)
  .execute(&mut *tx)
  .await?;

  tx.commit().await?;
  Ok(HttpResponse::Ok().json(json!({"detail": "Profile updated"})))
}

#[derive(Deserialize, Debug)]
pub struct ChangePasswordPayload {
  pub old_password: String,
  pub new_password: String,
}

#[instrument(name = "handler::change_password", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn change_password(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<ChangePasswordPayload>,
) -> Result<HttpResponse, AppError> {
  let user = fetch_user_by_id(&state, auth_user.user_id).await?;

  if !auth::verify_password(&user.password_hash, &payload.old_password)? {
    return Err(AppError::Validation("Old password is incorrect".to_string()));
  }
  auth::validate_password_strength(&payload.new_password)?;

  let new_hash = auth::hash_password(&payload.new_password)?;
  sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
    .bind(&new_hash)
    .bind(user.id)
    .execute(&state.db_pool)
    .await?;

  info!(user_id = %user.id, "Password changed.");
  Ok(HttpResponse::Ok().json(json!({"detail": "Password changed successfully"})))
}

#[derive(Deserialize, Debug)]
pub struct SubscribePayload {
  pub email: String,
}

/// Public endpoint; there is no subscriber table, the welcome email is the
/// whole feature.
#[instrument(name = "handler::subscribe_newsletter", skip(state, payload), fields(email = %payload.email))]
pub async fn subscribe_newsletter(
  state: web::Data<AppState>,
  payload: web::Json<SubscribePayload>,
) -> Result<HttpResponse, AppError> {
  if payload.email.is_empty() {
    return Err(AppError::Validation("Email is required".to_string()));
  }

  let (subject, html) = mailer::newsletter_welcome_email();
  state.mailer.send_fire_and_forget(payload.email.clone(), subject, html);

  Ok(HttpResponse::Ok().json(json!({"detail": "Subscribed successfully! Check your email."})))
}
