//! Google token verification for social login.
//!
//! Two-step verification, cheapest first: tokens shaped like a JWT are
//! checked against the `tokeninfo` endpoint (with an audience check);
//! anything else is treated as an OAuth access token and resolved through
//! the `userinfo` endpoint.

use crate::errors::Result;
use serde::Deserialize;
use tracing::{instrument, warn};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUser {
  pub email: String,
  #[serde(default)]
  pub given_name: String,
  #[serde(default)]
  pub family_name: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
  #[serde(default)]
  aud: String,
  email: String,
  #[serde(default)]
  given_name: String,
  #[serde(default)]
  family_name: String,
}

/// ID tokens are JWTs: three dot-separated segments. Access tokens are
/// opaque strings.
pub fn looks_like_id_token(token: &str) -> bool {
  token.matches('.').count() == 2
}

/// Returns `None` when the token cannot be verified by either leg.
#[instrument(name = "google::verify_token", skip_all)]
pub async fn verify_token(http: &reqwest::Client, token: &str, expected_client_id: &str) -> Result<Option<GoogleUser>> {
  if looks_like_id_token(token) {
    match verify_id_token(http, token, expected_client_id).await {
      Ok(Some(user)) => return Ok(Some(user)),
      Ok(None) => {} // fall through to the access-token leg
      Err(e) => warn!(error = %e, "ID-token verification errored; trying userinfo endpoint."),
    }
  }
  verify_access_token(http, token).await
}

async fn verify_id_token(http: &reqwest::Client, token: &str, expected_client_id: &str) -> Result<Option<GoogleUser>> {
  let resp = http.get(TOKENINFO_URL).query(&[("id_token", token)]).send().await?;
  if !resp.status().is_success() {
    return Ok(None);
  }
  let info: TokenInfo = match resp.json().await {
    Ok(info) => info,
    Err(_) => return Ok(None),
  };
  if !expected_client_id.is_empty() && info.aud != expected_client_id {
    warn!("Google ID token audience mismatch.");
    return Ok(None);
  }
  Ok(Some(GoogleUser {
    email: info.email,
    given_name: info.given_name,
    family_name: info.family_name,
  }))
}

async fn verify_access_token(http: &reqwest::Client, token: &str) -> Result<Option<GoogleUser>> {
  let resp = http.get(USERINFO_URL).query(&[("access_token", token)]).send().await?;
  if !resp.status().is_success() {
    return Ok(None);
  }
  Ok(resp.json::<GoogleUser>().await.ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn jwt_shape_detection() {
    assert!(looks_like_id_token("aaa.bbb.ccc"));
    assert!(!looks_like_id_token("ya29.opaque-access-token"));
    assert!(!looks_like_id_token("a.b.c.d"));
    assert!(!looks_like_id_token(""));
  }

  #[test]
  fn tokeninfo_payload_parses_with_missing_names() {
    let info: TokenInfo =
      serde_json::from_str(r#"{"aud":"client-123","email":"dev@example.com"}"#).unwrap();
    assert_eq!(info.aud, "client-123");
    assert_eq!(info.email, "dev@example.com");
    assert_eq!(info.given_name, "");
  }
}
