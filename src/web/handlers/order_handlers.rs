use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Order, OrderItem, OrderStatus, PaymentMethod};
use crate::services::checkout::{self, NewOrder, NewOrderLine};
use crate::services::geo::{self, AddressInput};
use crate::services::mailer;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::handlers::auth_handlers::fetch_user_by_id;

const ORDER_COLUMNS: &str = "id, user_id, order_ref, status, total_amount_cents, shipping_address, \
   payment_method, gateway_order_id, gateway_payment_id, is_priority, priority_hours, created_at";

#[derive(Deserialize, Debug)]
pub struct OrderLinePayload {
  pub product_id: Uuid,
  pub qty: i32,
}

#[derive(Deserialize, Debug)]
pub struct CreateOrderPayload {
  pub items: Vec<OrderLinePayload>,
  pub total_amount_cents: i64,
  pub shipping_address: serde_json::Value,
  #[serde(default)]
  pub is_priority: bool,
  pub priority_hours: Option<i32>,
}

fn to_lines(items: &[OrderLinePayload]) -> Vec<NewOrderLine> {
  items
    .iter()
    .map(|i| NewOrderLine {
      product_id: i.product_id,
      qty: i.qty,
    })
    .collect()
}

/// Best-effort: remember the shipping address on the profile for next time.
/// Failure is logged and never fails the order.
async fn auto_save_address(state: &AppState, user_id: Uuid, shipping: &serde_json::Value) {
  let field = |key: &str| shipping.get(key).and_then(|v| v.as_str()).map(str::to_string);
  let result = sqlx::query(
    "UPDATE profiles SET \
       address_line1 = COALESCE($1, address_line1), \
       city = COALESCE($2, city), \
       state = COALESCE($3, state), \
       pincode = COALESCE($4, pincode), \
       phone = COALESCE($5, phone) \
     WHERE user_id = $6",
  )
  .bind(field("address_line1"))
  .bind(field("city"))
  .bind(field("state"))
  .bind(field("pincode"))
  .bind(field("phone"))
  .bind(user_id)
  .execute(&state.db_pool)
  .await;

  if let Err(e) = result {
    warn!(error = %e, user_id = %user_id, "Failed to auto-save profile address.");
  }
}

async fn send_confirmation_email(state: &AppState, user_id: Uuid, placed: &checkout::PlacedOrder, method: &str) {
  match fetch_user_by_id(state, user_id).await {
    Ok(user) => {
      let (subject, html) = mailer::order_confirmation_email(
        &user.first_name,
        &placed.order.order_ref,
        &placed.lines,
        placed.order.total_amount_cents,
        method,
      );
      state.mailer.send_fire_and_forget(user.email, subject, html);
    }
    Err(e) => warn!(error = %e, "Skipping confirmation email: could not load user."),
  }
}

/// COD checkout. Online payments go through `initiate_payment` /
/// `verify_payment`; the final order row for those is only created after
/// the signature check passes.
#[instrument(name = "handler::create_order", skip(state, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_order(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CreateOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let placed = checkout::place_order(
    &state.db_pool,
    NewOrder {
      user_id: auth_user.user_id,
      lines: to_lines(&payload.items),
      total_amount_cents: payload.total_amount_cents,
      shipping_address: payload.shipping_address.clone(),
      payment_method: PaymentMethod::Cod,
      initial_status: OrderStatus::Pending,
      gateway_order_id: None,
      gateway_payment_id: None,
      is_priority: payload.is_priority,
      priority_hours: payload.priority_hours,
    },
  )
  .await?;

  auto_save_address(&state, auth_user.user_id, &payload.shipping_address).await;
  send_confirmation_email(&state, auth_user.user_id, &placed, "COD").await;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "order_id": placed.order.id,
    "order_ref": placed.order.order_ref,
  })))
}

#[derive(Deserialize, Debug)]
pub struct InitiatePaymentPayload {
  pub amount_cents: i64,
}

/// Creates a gateway-side order only. Deliberately no local order row:
/// a failed or abandoned payment must leave nothing behind.
#[instrument(name = "handler::initiate_payment", skip(state, payload), fields(user_id = %auth_user.user_id, amount_cents = %payload.amount_cents))]
pub async fn initiate_payment(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<InitiatePaymentPayload>,
) -> Result<HttpResponse, AppError> {
  let receipt = format!("receipt_order_{}", chrono::Utc::now().timestamp());
  let gateway_order = state.gateway.create_order(payload.amount_cents, "INR", &receipt).await?;

  Ok(HttpResponse::Ok().json(json!({
    "id": gateway_order.id,
    "amount": gateway_order.amount,
    "currency": gateway_order.currency,
    "keyId": state.gateway.key_id(),
  })))
}

#[derive(Deserialize, Debug)]
pub struct VerifyPaymentPayload {
  pub gateway_order_id: String,
  pub gateway_payment_id: String,
  pub gateway_signature: String,
  #[serde(flatten)]
  pub order: CreateOrderPayload,
}

#[instrument(name = "handler::verify_payment", skip(state, payload), fields(user_id = %auth_user.user_id, gateway_order_id = %payload.gateway_order_id))]
pub async fn verify_payment(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<VerifyPaymentPayload>,
) -> Result<HttpResponse, AppError> {
  if !state.gateway.verify_payment_signature(
    &payload.gateway_order_id,
    &payload.gateway_payment_id,
    &payload.gateway_signature,
  ) {
    warn!("Payment signature mismatch; no order will be created.");
    return Err(AppError::Validation("Signature Mismatch".to_string()));
  }

  // Same placement logic as COD, but the order is born paid and carries
  // the gateway ids.
  let placed = checkout::place_order(
    &state.db_pool,
    NewOrder {
      user_id: auth_user.user_id,
      lines: to_lines(&payload.order.items),
      total_amount_cents: payload.order.total_amount_cents,
      shipping_address: payload.order.shipping_address.clone(),
      payment_method: PaymentMethod::Online,
      initial_status: OrderStatus::Paid,
      gateway_order_id: Some(payload.gateway_order_id.clone()),
      gateway_payment_id: Some(payload.gateway_payment_id.clone()),
      is_priority: payload.order.is_priority,
      priority_hours: payload.order.priority_hours,
    },
  )
  .await?;

  auto_save_address(&state, auth_user.user_id, &payload.order.shipping_address).await;
  send_confirmation_email(&state, auth_user.user_id, &placed, "ONLINE").await;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "order_id": placed.order.id,
    "order_ref": placed.order.order_ref,
  })))
}

async fn fetch_items(state: &AppState, order_id: Uuid) -> Result<Vec<OrderItem>, AppError> {
  let items = sqlx::query_as(
    "SELECT id, order_id, product_id, product_title, quantity, price_at_purchase_cents \
     FROM order_items WHERE order_id = $1",
  )
  .bind(order_id)
  .fetch_all(&state.db_pool)
  .await?;
  Ok(items)
}

async fn order_with_items(state: &AppState, order: Order) -> Result<serde_json::Value, AppError> {
  let items = fetch_items(state, order.id).await?;
  Ok(json!({
    "id": order.id,
    "order_ref": order.order_ref,
    "status": order.status,
    "total_amount_cents": order.total_amount_cents,
    "shipping_address": order.shipping_address,
    "payment_method": order.payment_method,
    "is_priority": order.is_priority,
    "priority_hours": order.priority_hours,
    "created_at": order.created_at,
    "items": items,
  }))
}

#[instrument(name = "handler::my_orders", skip(state), fields(user_id = %auth_user.user_id))]
pub async fn my_orders(state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    ORDER_COLUMNS
  ))
  .bind(auth_user.user_id)
  .fetch_all(&state.db_pool)
  .await?;

  let mut result = Vec::with_capacity(orders.len());
  for order in orders {
    result.push(order_with_items(&state, order).await?);
  }
  Ok(HttpResponse::Ok().json(result))
}

#[instrument(name = "handler::get_order", skip(state), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn get_order(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order: Option<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders WHERE id = $1 AND user_id = $2",
    ORDER_COLUMNS
  ))
  .bind(order_id)
  .bind(auth_user.user_id)
  .fetch_optional(&state.db_pool)
  .await?;

  let order = order.ok_or_else(|| AppError::NotFound(format!("Order with ID {} not found.", order_id)))?;
  Ok(HttpResponse::Ok().json(order_with_items(&state, order).await?))
}

/// Public tracking by human-readable reference, case-insensitive.
#[instrument(name = "handler::track_order", skip(state), fields(order_ref = %path.as_ref()))]
pub async fn track_order(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
  let order_ref = path.into_inner();
  let order: Option<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders WHERE LOWER(order_ref) = LOWER($1)",
    ORDER_COLUMNS
  ))
  .bind(&order_ref)
  .fetch_optional(&state.db_pool)
  .await?;

  let order = order.ok_or_else(|| AppError::NotFound("Order ID not found.".to_string()))?;
  let items = fetch_items(&state, order.id).await?;
  let items: Vec<serde_json::Value> = items
    .iter()
    .map(|i| {
      json!({
        "product_title": i.product_title,
        "qty": i.quantity,
        "price_cents": i.price_at_purchase_cents,
      })
    })
    .collect();

  Ok(HttpResponse::Ok().json(json!({
    "order_ref": order.order_ref,
    "status": order.status,
    "total_amount_cents": order.total_amount_cents,
    "created_at": order.created_at,
    "shipping_address": order.shipping_address,
    "items": items,
    "payment_method": order.payment_method,
  })))
}

/// Tri-layer delivery estimation. Always responds 200; an unmappable
/// address or exceeded radius comes back as `allowed: false`.
#[instrument(name = "handler::delivery_estimate", skip(state, payload), fields(user_id = %auth_user.user_id))]
pub async fn delivery_estimate(
  state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<AddressInput>,
) -> Result<HttpResponse, AppError> {
  let estimate = geo::estimate_delivery(&state.http_client, &state.config, &payload).await?;
  info!("Delivery estimate computed.");
  Ok(HttpResponse::Ok().json(estimate))
}
