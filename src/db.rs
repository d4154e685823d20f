//! Development seeding. Only runs when `SEED_DB=true`; everything here is
//! idempotent so repeated startups are safe.

use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::Result;

#[instrument(name = "db::seed", skip(pool), err(Display))]
pub async fn seed_db(pool: &PgPool) -> Result<()> {
  let category_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
    .fetch_one(pool)
    .await?;
  if category_count > 0 {
    info!("Database already has categories; skipping seed.");
    return Ok(());
  }

  let categories = [
    ("Robotics Kits", "robotics-kits"),
    ("Development Boards", "development-boards"),
    ("Sensors", "sensors"),
    ("3D Printing", "3d-printing"),
  ];

  let mut tx = pool.begin().await?;
  let mut category_ids = Vec::with_capacity(categories.len());
  for (name, slug) in categories {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3)")
      .bind(id)
      .bind(name)
      .bind(slug)
      .execute(&mut *tx)
      .await?;
    category_ids.push(id);
  }

  let products: [(&str, i64, i32, bool, usize); 3] = [
    ("Line Follower Robot Kit", 149900, 25, false, 0),
    ("MakerMart Uno R3 Board", 49900, 100, false, 1),
    ("Hexapod Walker (Innovative Build)", 899900, 5, true, 0),
  ];
  for (title, price_cents, stock, innovative, cat_idx) in products {
    sqlx::query(
      "INSERT INTO products (id, title, description, price_cents, stock, images, is_innovative_project, category_id, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())",
    )
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(format!("Seeded listing for {}.", title))
    .bind(price_cents)
    .bind(stock)
    .bind(json!([]))
    .bind(innovative)
    .bind(category_ids[cat_idx])
    .execute(&mut *tx)
    .await?;
  }
  tx.commit().await?;

  info!("Seeded categories and sample products.");
  Ok(())
}
