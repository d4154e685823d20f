//! Transactional email over an HTTP API (Brevo-style).
//!
//! Product flows never block on email: `send_fire_and_forget` spawns the
//! request and logs failures. A missing API key downgrades the mailer to
//! log-only mode so local development works without credentials.

use crate::errors::{AppError, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct Mailer {
  api_base: String,
  api_key: String,
  sender: String,
  http: reqwest::Client,
}

impl Mailer {
  pub fn new(api_base: String, api_key: String, sender: String, http: reqwest::Client) -> Self {
    Self {
      api_base,
      api_key,
      sender,
      http,
    }
  }

  #[instrument(name = "mailer::send", skip(self, html_body), fields(to = %to, subject = %subject))]
  pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
    if self.api_key.is_empty() {
      info!("Email API key not configured; logging email instead of sending.");
      return Ok(());
    }

    let url = format!("{}/smtp/email", self.api_base);
    let resp = self
      .http
      .post(&url)
      .header("api-key", &self.api_key)
      .json(&json!({
        "sender": { "email": self.sender },
        "to": [{ "email": to }],
        "subject": subject,
        "htmlContent": html_body,
      }))
      .send()
      .await
      .map_err(|e| AppError::Email(format!("Email send request failed: {}", e)))?;

    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(AppError::Email(format!("Email API returned {}: {}", status, body)));
    }

    info!("Email sent successfully.");
    Ok(())
  }

  /// Spawns the send so callers never wait on (or fail because of) email.
  pub fn send_fire_and_forget(self: &Arc<Self>, to: String, subject: String, html_body: String) {
    let mailer = Arc::clone(self);
    tokio::spawn(async move {
      if let Err(e) = mailer.send(&to, &subject, &html_body).await {
        warn!(error = %e, to = %to, subject = %subject, "Background email send failed.");
      }
    });
  }
}

/// Formats integer minor units as a rupee amount, e.g. 123450 -> "₹1234.50".
pub fn format_money(cents: i64) -> String {
  format!("₹{}.{:02}", cents / 100, (cents % 100).abs())
}

pub fn welcome_email(first_name: &str) -> (String, String) {
  let name = if first_name.is_empty() { "Customer" } else { first_name };
  let subject = "Welcome to MakerMart 🎉".to_string();
  let html = format!(
    "<h2>Welcome, {}!</h2>\
     <p>Your MakerMart account is ready. Browse kits, boards and parts, or send us a custom project request.</p>\
     <p>— The MakerMart team, {}</p>",
    name,
    chrono::Utc::now().format("%Y"),
  );
  (subject, html)
}

pub fn newsletter_welcome_email() -> (String, String) {
  (
    "Welcome to the Inner Circle 🚀 | MakerMart".to_string(),
    "<h2>You're in!</h2><p>Expect build guides, workshop invites and early access to new kits.</p>".to_string(),
  )
}

/// Order confirmation with an items table, mirroring the storefront receipt.
pub fn order_confirmation_email(
  first_name: &str,
  order_ref: &str,
  lines: &[(String, i32, i64)],
  total_cents: i64,
  payment_method: &str,
) -> (String, String) {
  let name = if first_name.is_empty() { "Customer" } else { first_name };
  let mut items_html =
    String::from("<table width='100%' cellpadding='6' cellspacing='0' style='border-collapse:collapse;'>");
  for (title, qty, price_cents) in lines {
    items_html.push_str(&format!(
      "<tr style=\"border-bottom:1px solid #eee;\">\
       <td>{}</td><td align=\"center\">{}</td><td align=\"right\">{}</td></tr>",
      title,
      qty,
      format_money(*price_cents),
    ));
  }
  items_html.push_str("</table>");

  let subject = format!("Order Confirmation - MakerMart #{}", order_ref);
  let html = format!(
    "<h2>Thanks for your order, {}!</h2>\
     <p>Order <strong>{}</strong> ({}) has been received.</p>\
     {}\
     <p>Total: <strong>{}</strong></p>",
    name,
    order_ref,
    payment_method,
    items_html,
    format_money(total_cents),
  );
  (subject, html)
}

pub fn order_status_email(first_name: &str, order_ref: &str, status: &str) -> (String, String) {
  let name = if first_name.is_empty() { "Customer" } else { first_name };
  let subject = format!("Order Update - MakerMart #{}", order_ref);
  let html = format!(
    "<h2>Hi {},</h2><p>Your order <strong>{}</strong> is now <strong>{}</strong>.</p>",
    name, order_ref, status,
  );
  (subject, html)
}

pub fn project_request_notification(
  name: &str,
  email: &str,
  phone: Option<&str>,
  project_title: &str,
  project_type: &str,
  description: &str,
) -> (String, String) {
  let subject = format!("New Project Request: {}", project_title);
  let html = format!(
    "<h2>New project request received</h2>\
     <p>Name: {}<br>Email: {}<br>Phone: {}<br>Type: {}</p>\
     <p>Description:</p><p>{}</p>\
     <p>Log in to the admin dashboard to view details.</p>",
    name,
    email,
    phone.unwrap_or("N/A"),
    project_type,
    description,
  );
  (subject, html)
}

pub fn enquiry_notification(
  name: &str,
  email: &str,
  phone: Option<&str>,
  workshop_title: Option<&str>,
  message: &str,
) -> (String, String) {
  let subject = format!("New Workshop Enquiry from {}", name);
  let html = format!(
    "<h2>New workshop enquiry</h2>\
     <p>Name: {}<br>Email: {}<br>Phone: {}<br>Workshop: {}</p>\
     <p>Message:</p><p>{}</p>",
    name,
    email,
    phone.unwrap_or("N/A"),
    workshop_title.unwrap_or("N/A"),
    message,
  );
  (subject, html)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn money_formatting_pads_minor_units() {
    assert_eq!(format_money(123450), "₹1234.50");
    assert_eq!(format_money(5), "₹0.05");
    assert_eq!(format_money(100), "₹1.00");
    assert_eq!(format_money(0), "₹0.00");
  }

  #[test]
  fn order_confirmation_lists_every_line_and_the_total() {
    let lines = vec![
      ("Line Follower Kit".to_string(), 2, 149900_i64),
      ("Servo Pack".to_string(), 1, 49900_i64),
    ];
    let (subject, html) = order_confirmation_email("Asha", "MAKERMART-2026-A1B2C3", &lines, 349700, "COD");
    assert!(subject.contains("MAKERMART-2026-A1B2C3"));
    assert!(html.contains("Line Follower Kit"));
    assert!(html.contains("Servo Pack"));
    assert!(html.contains("₹3497.00"));
    assert!(html.contains("Asha"));
  }

  #[test]
  fn empty_first_name_falls_back_to_customer() {
    let (_, html) = welcome_email("");
    assert!(html.contains("Customer"));
    let (_, html) = order_status_email("", "MAKERMART-2026-XYZ123", "shipped");
    assert!(html.contains("Customer"));
    assert!(html.contains("shipped"));
  }

  #[test]
  fn intake_notifications_handle_missing_optionals() {
    let (subject, html) = project_request_notification("Ravi", "ravi@example.com", None, "Hexapod", "robotics", "6-leg walker");
    assert!(subject.contains("Hexapod"));
    assert!(html.contains("N/A"));

    let (_, html) = enquiry_notification("Meera", "meera@example.com", Some("98400"), None, "College workshop");
    assert!(html.contains("98400"));
    assert!(html.contains("N/A"));
  }
}
