//! Request extractors for authenticated and admin users.

use actix_web::{web, FromRequest, HttpRequest};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::auth;
use crate::state::AppState;

/// Identity decoded from the `Authorization: Bearer <access token>` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub is_staff: bool,
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;

  let header = req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .ok_or_else(|| AppError::Auth("Missing Authorization header.".to_string()))?;

  let token = header
    .strip_prefix("Bearer ")
    .ok_or_else(|| AppError::Auth("Expected a Bearer token.".to_string()))?;

  let claims = auth::decode_token(&state.config.jwt_secret, token)?;
  if claims.kind != "access" {
    return Err(AppError::Auth("Expected an access token.".to_string()));
  }

  Ok(AuthenticatedUser {
    user_id: claims.sub,
    is_staff: claims.is_staff,
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let result = authenticate(req);
    if let Err(e) = &result {
      warn!(error = %e, "Request authentication failed.");
    }
    futures_util::future::ready(result)
  }
}

/// An authenticated user that additionally carries staff privileges.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let result = authenticate(req).and_then(|user| {
      if user.is_staff {
        Ok(AdminUser(user))
      } else {
        Err(AppError::Forbidden("Admin privileges required.".to_string()))
      }
    });
    futures_util::future::ready(result)
  }
}
