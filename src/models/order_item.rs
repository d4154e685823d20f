use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  /// Nullable so that deleting a product leaves historical line items intact.
  pub product_id: Option<Uuid>,
  /// Title copied at purchase time; survives product deletion.
  pub product_title: String,
  pub quantity: i32,
  pub price_at_purchase_cents: i64,
}
