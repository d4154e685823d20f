use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::User;
use crate::services::{auth, google, mailer};
use crate::state::AppState;

const USER_COLUMNS: &str =
  "id, username, email, first_name, last_name, password_hash, is_staff, is_superuser, date_joined";

pub(crate) async fn fetch_user_by_id(state: &AppState, user_id: uuid::Uuid) -> Result<User, AppError> {
  let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await?;
  user.ok_or_else(|| AppError::Auth("User account no longer exists.".to_string()))
}

async fn fetch_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
  let user = sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
    .bind(email)
    .fetch_optional(&state.db_pool)
    .await?;
  Ok(user)
}

async fn username_taken(state: &AppState, username: &str) -> Result<bool, AppError> {
  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
    .bind(username)
    .fetch_one(&state.db_pool)
    .await?;
  Ok(exists)
}

fn user_summary(user: &User) -> serde_json::Value {
  json!({
    "id": user.id,
    "username": user.username,
    "email": user.email,
    "isAdmin": user.is_admin(),
  })
}

/// Creates the user row plus its profile row and returns the user.
async fn insert_user_with_profile(
  state: &AppState,
  username: &str,
  email: &str,
  first_name: &str,
  last_name: &str,
  password_hash: &str,
  profile: &ProfileFields,
) -> Result<User, AppError> {
  let mut tx = state.db_pool.begin().await?;

  let user: User = sqlx::query_as(&format!(
    "INSERT INTO users (id, username, email, first_name, last_name, password_hash, is_staff, is_superuser, date_joined) \
     VALUES ($1, $2, $3, $4, $5, $6, FALSE, FALSE, NOW()) RETURNING {}",
    USER_COLUMNS
  ))
  .bind(uuid::Uuid::new_v4())
  .bind(username)
  .bind(email)
  .bind(first_name)
  .bind(last_name)
  .bind(password_hash)
  .fetch_one(&mut *tx)
  .await?;

  sqlx::query(
    "INSERT INTO profiles (user_id, phone, address_line1, address_line2, city, state, pincode) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)",
  )
  .bind(user.id)
  .bind(&profile.phone)
  .bind(&profile.address_line1)
  .bind(&profile.address_line2)
  .bind(&profile.city)
  .bind(&profile.state)
  .bind(&profile.pincode)
  .execute(&mut *tx)
  .await?;

  tx.commit().await?;
  Ok(user)
}

#[derive(Deserialize, Debug, Default)]
pub struct ProfileFields {
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address_line1: String,
  #[serde(default)]
  pub address_line2: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub pincode: String,
}

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
  pub username: String,
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(flatten)]
  pub profile: ProfileFields,
}

#[instrument(name = "handler::register", skip(state, payload), fields(username = %payload.username))]
pub async fn register(
  state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.username.is_empty() || payload.email.is_empty() {
    return Err(AppError::Validation("Username and email are required.".to_string()));
  }
  if username_taken(&state, &payload.username).await? {
    return Err(AppError::Validation("Username already exists".to_string()));
  }
  if fetch_user_by_email(&state, &payload.email).await?.is_some() {
    return Err(AppError::Validation("Email already exists".to_string()));
  }
  auth::validate_password_strength(&payload.password)?;

  let password_hash = auth::hash_password(&payload.password)?;
  let user = insert_user_with_profile(
    &state,
    &payload.username,
    &payload.email,
    &payload.first_name,
    &payload.last_name,
    &password_hash,
    &payload.profile,
  )
  .await?;

  let (subject, html) = mailer::welcome_email(&user.first_name);
  state.mailer.send_fire_and_forget(user.email.clone(), subject, html);

  info!(user_id = %user.id, "User registered.");
  Ok(HttpResponse::Created().json(json!({"detail": "User registered successfully"})))
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  pub username: String,
  pub password: String,
}

#[instrument(name = "handler::login", skip(state, payload), fields(username = %payload.username))]
pub async fn login(state: web::Data<AppState>, payload: web::Json<LoginPayload>) -> Result<HttpResponse, AppError> {
  let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
    .bind(&payload.username)
    .fetch_optional(&state.db_pool)
    .await?;

  let Some(user) = user else {
    // Same response as a bad password; do not reveal which part failed.
    return Err(AppError::Auth("Invalid credentials.".to_string()));
  };

  if !auth::verify_password(&user.password_hash, &payload.password)? {
    warn!(user_id = %user.id, "Login rejected: password mismatch.");
    return Err(AppError::Auth("Invalid credentials.".to_string()));
  }

  let tokens = auth::issue_token_pair(
    &state.config.jwt_secret,
    &user,
    state.config.access_token_ttl_secs,
    state.config.refresh_token_ttl_secs,
  )?;

  Ok(HttpResponse::Ok().json(json!({
    "access": tokens.access,
    "refresh": tokens.refresh,
    "user": user_summary(&user),
  })))
}

#[derive(Deserialize, Debug)]
pub struct RefreshPayload {
  pub refresh: String,
}

#[instrument(name = "handler::refresh_token", skip_all)]
pub async fn refresh_token(
  state: web::Data<AppState>,
  payload: web::Json<RefreshPayload>,
) -> Result<HttpResponse, AppError> {
  let access = auth::refresh_access_token(
    &state.config.jwt_secret,
    &payload.refresh,
    state.config.access_token_ttl_secs,
  )?;
  Ok(HttpResponse::Ok().json(json!({"access": access})))
}

#[derive(Deserialize, Debug)]
pub struct GoogleLoginPayload {
  pub token: String,
}

#[instrument(name = "handler::google_login", skip_all)]
pub async fn google_login(
  state: web::Data<AppState>,
  payload: web::Json<GoogleLoginPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.token.is_empty() {
    return Err(AppError::Validation("No token provided".to_string()));
  }

  let google_user = google::verify_token(&state.http_client, &payload.token, &state.config.google_client_id)
    .await?
    .ok_or_else(|| AppError::Validation("Invalid Google Token".to_string()))?;

  if google_user.email.is_empty() {
    return Err(AppError::Validation("Email not found in token".to_string()));
  }

  match fetch_user_by_email(&state, &google_user.email).await? {
    Some(user) => {
      let tokens = auth::issue_token_pair(
        &state.config.jwt_secret,
        &user,
        state.config.access_token_ttl_secs,
        state.config.refresh_token_ttl_secs,
      )?;
      Ok(HttpResponse::Ok().json(json!({
        "access": tokens.access,
        "refresh": tokens.refresh,
        "user": user_summary(&user),
      })))
    }
    None => {
      // Unknown email: the client completes signup with a username/password.
      info!("Google login for a new user; requesting signup completion.");
      Ok(HttpResponse::Ok().json(json!({
        "is_new_user": true,
        "email": google_user.email,
        "first_name": google_user.given_name,
        "last_name": google_user.family_name,
      })))
    }
  }
}

#[derive(Deserialize, Debug)]
pub struct GoogleSignupPayload {
  pub token: String,
  pub username: String,
  pub password: String,
}

#[instrument(name = "handler::complete_google_signup", skip_all, fields(username = %payload.username))]
pub async fn complete_google_signup(
  state: web::Data<AppState>,
  payload: web::Json<GoogleSignupPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.token.is_empty() || payload.username.is_empty() || payload.password.is_empty() {
    return Err(AppError::Validation("All fields are required".to_string()));
  }

  // Re-verify the token so the email genuinely belongs to this session.
  let google_user = google::verify_token(&state.http_client, &payload.token, &state.config.google_client_id)
    .await?
    .ok_or_else(|| AppError::Validation("Invalid or expired Google Token".to_string()))?;

  if fetch_user_by_email(&state, &google_user.email).await?.is_some() {
    return Err(AppError::Validation(
      "User with this email already exists. Please login.".to_string(),
    ));
  }
  if username_taken(&state, &payload.username).await? {
    return Err(AppError::Validation("Username is already taken".to_string()));
  }
  auth::validate_password_strength(&payload.password)?;

  let password_hash = auth::hash_password(&payload.password)?;
  let user = insert_user_with_profile(
    &state,
    &payload.username,
    &google_user.email,
    &google_user.given_name,
    &google_user.family_name,
    &password_hash,
    &ProfileFields::default(),
  )
  .await?;

  let tokens = auth::issue_token_pair(
    &state.config.jwt_secret,
    &user,
    state.config.access_token_ttl_secs,
    state.config.refresh_token_ttl_secs,
  )?;

  let (subject, html) = mailer::welcome_email(&user.first_name);
  state.mailer.send_fire_and_forget(user.email.clone(), subject, html);

  info!(user_id = %user.id, "Google signup completed.");
  Ok(HttpResponse::Ok().json(json!({
    "access": tokens.access,
    "refresh": tokens.refresh,
    "user": user_summary(&user),
  })))
}
