//! Password hashing, password policy, and HS256 session tokens.

use crate::errors::{AppError, Result};
use crate::models::User;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, error, instrument};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Hashes a plain-text password using Argon2 with a random salt.
#[instrument(name = "auth::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty for hashing.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  let argon2_hasher = Argon2::default();

  match argon2_hasher.hash_password(password.as_bytes(), &salt) {
    Ok(password_hash_obj) => Ok(password_hash_obj.to_string()),
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Verifies a plain-text password against a stored Argon2 hash.
/// Returns `Ok(false)` on a plain mismatch; errors only for malformed input.
#[instrument(name = "auth::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool> {
  if hashed_password_str.is_empty() {
    return Err(AppError::Auth("Invalid stored password format (empty).".to_string()));
  }
  if provided_password.is_empty() {
    return Err(AppError::Auth("Provided password cannot be empty.".to_string()));
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Policy applied everywhere a password is set: at least 8 characters,
/// one uppercase, one lowercase, and one special character.
pub fn validate_password_strength(password: &str) -> Result<()> {
  if password.len() < 8 {
    return Err(AppError::Validation(
      "Password must be at least 8 characters long".to_string(),
    ));
  }
  if !password.chars().any(|c| c.is_ascii_uppercase()) {
    return Err(AppError::Validation(
      "Password must contain at least one uppercase letter".to_string(),
    ));
  }
  if !password.chars().any(|c| c.is_ascii_lowercase()) {
    return Err(AppError::Validation(
      "Password must contain at least one lowercase letter".to_string(),
    ));
  }
  if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
    return Err(AppError::Validation(
      "Password must contain at least one special character".to_string(),
    ));
  }
  Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
  pub sub: Uuid,
  pub iat: i64,
  pub exp: i64,
  /// "access" or "refresh".
  pub kind: String,
  pub is_staff: bool,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
  pub access: String,
  pub refresh: String,
}

fn sign(secret: &str, signing_input: &str) -> Result<Vec<u8>> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("HMAC key setup failed: {}", e)))?;
  mac.update(signing_input.as_bytes());
  Ok(mac.finalize().into_bytes().to_vec())
}

/// Issues a compact HS256 JWT for the given claims.
pub fn encode_token(secret: &str, claims: &Claims) -> Result<String> {
  let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
  let payload = serde_json::to_vec(claims).map_err(|e| AppError::Internal(format!("Claims encoding failed: {}", e)))?;
  let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
  let signing_input = format!("{}.{}", header_b64, payload_b64);
  let sig_b64 = URL_SAFE_NO_PAD.encode(sign(secret, &signing_input)?);
  Ok(format!("{}.{}", signing_input, sig_b64))
}

/// Verifies signature and expiry, returning the claims.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims> {
  let mut parts = token.split('.');
  let (header_b64, payload_b64, sig_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
    (Some(h), Some(p), Some(s), None) => (h, p, s),
    _ => return Err(AppError::Auth("Malformed token.".to_string())),
  };

  let signing_input = format!("{}.{}", header_b64, payload_b64);
  let sig = URL_SAFE_NO_PAD
    .decode(sig_b64)
    .map_err(|_| AppError::Auth("Malformed token signature.".to_string()))?;

  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("HMAC key setup failed: {}", e)))?;
  mac.update(signing_input.as_bytes());
  mac
    .verify_slice(&sig)
    .map_err(|_| AppError::Auth("Invalid token signature.".to_string()))?;

  let payload = URL_SAFE_NO_PAD
    .decode(payload_b64)
    .map_err(|_| AppError::Auth("Malformed token payload.".to_string()))?;
  let claims: Claims =
    serde_json::from_slice(&payload).map_err(|_| AppError::Auth("Malformed token claims.".to_string()))?;

  if claims.exp <= chrono::Utc::now().timestamp() {
    return Err(AppError::Auth("Token has expired.".to_string()));
  }
  Ok(claims)
}

fn issue_token(secret: &str, user_id: Uuid, is_staff: bool, kind: &str, ttl_secs: i64) -> Result<String> {
  let now = chrono::Utc::now().timestamp();
  let claims = Claims {
    sub: user_id,
    iat: now,
    exp: now + ttl_secs,
    kind: kind.to_string(),
    is_staff,
  };
  encode_token(secret, &claims)
}

/// Issues the access/refresh pair returned by login and social signup.
pub fn issue_token_pair(secret: &str, user: &User, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Result<TokenPair> {
  Ok(TokenPair {
    access: issue_token(secret, user.id, user.is_admin(), "access", access_ttl_secs)?,
    refresh: issue_token(secret, user.id, user.is_admin(), "refresh", refresh_ttl_secs)?,
  })
}

/// Exchanges a valid refresh token for a fresh access token.
pub fn refresh_access_token(secret: &str, refresh_token: &str, access_ttl_secs: i64) -> Result<String> {
  let claims = decode_token(secret, refresh_token)?;
  if claims.kind != "refresh" {
    return Err(AppError::Auth("Expected a refresh token.".to_string()));
  }
  issue_token(secret, claims.sub, claims.is_staff, "access", access_ttl_secs)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "unit-test-secret";

  fn claims(kind: &str, exp_offset: i64) -> Claims {
    let now = chrono::Utc::now().timestamp();
    Claims {
      sub: Uuid::new_v4(),
      iat: now,
      exp: now + exp_offset,
      kind: kind.to_string(),
      is_staff: false,
    }
  }

  #[test]
  fn password_hash_verify_round_trip() {
    let hash = hash_password("Corr3ct!Horse").unwrap();
    assert!(verify_password(&hash, "Corr3ct!Horse").unwrap());
    assert!(!verify_password(&hash, "wrong-password").unwrap());
  }

  #[test]
  fn empty_password_is_rejected() {
    assert!(hash_password("").is_err());
  }

  #[test]
  fn password_policy_requires_all_character_classes() {
    assert!(validate_password_strength("Str0ng!pass").is_ok());
    assert!(validate_password_strength("short!A").is_err()); // too short
    assert!(validate_password_strength("alllower!123").is_err()); // no uppercase
    assert!(validate_password_strength("ALLUPPER!123").is_err()); // no lowercase
    assert!(validate_password_strength("NoSpecial123").is_err()); // no special
  }

  #[test]
  fn token_round_trip_preserves_claims() {
    let c = claims("access", 3600);
    let token = encode_token(SECRET, &c).unwrap();
    let decoded = decode_token(SECRET, &token).unwrap();
    assert_eq!(decoded, c);
  }

  #[test]
  fn expired_token_is_rejected() {
    let c = claims("access", -10);
    let token = encode_token(SECRET, &c).unwrap();
    let err = decode_token(SECRET, &token).unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let token = encode_token(SECRET, &claims("access", 3600)).unwrap();
    assert!(decode_token("other-secret", &token).is_err());
  }

  #[test]
  fn tampered_payload_is_rejected() {
    let token = encode_token(SECRET, &claims("access", 3600)).unwrap();
    let mut parts: Vec<&str> = token.split('.').collect();
    let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"00000000-0000-0000-0000-000000000000","iat":0,"exp":99999999999,"kind":"access","is_staff":true}"#);
    parts[1] = &forged;
    assert!(decode_token(SECRET, &parts.join(".")).is_err());
  }

  #[test]
  fn refresh_exchange_requires_refresh_kind() {
    let access = encode_token(SECRET, &claims("access", 3600)).unwrap();
    assert!(refresh_access_token(SECRET, &access, 900).is_err());

    let refresh = encode_token(SECRET, &claims("refresh", 3600)).unwrap();
    let new_access = refresh_access_token(SECRET, &refresh, 900).unwrap();
    let decoded = decode_token(SECRET, &new_access).unwrap();
    assert_eq!(decoded.kind, "access");
  }

  #[test]
  fn garbage_tokens_are_rejected() {
    assert!(decode_token(SECRET, "not-a-token").is_err());
    assert!(decode_token(SECRET, "a.b").is_err());
    assert!(decode_token(SECRET, "a.b.c.d").is_err());
  }
}
