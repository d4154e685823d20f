use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Category, Product};
use crate::state::AppState;
use crate::web::extractors::AdminUser;

const DEFAULT_PAGE_SIZE: i64 = 18;
const MAX_PAGE_SIZE: i64 = 100;

const PRODUCT_COLUMNS: &str =
  "id, title, description, price_cents, images, stock, is_innovative_project, category_id, created_at";

/// Clamps page/page_size to sane bounds and returns `(limit, offset)`.
pub fn page_bounds(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
  let page = page.unwrap_or(1).max(1);
  let size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
  (size, (page - 1) * size)
}

/// Whitelisted ORDER BY clauses; anything unknown falls back to newest-first.
pub fn ordering_clause(ordering: Option<&str>) -> &'static str {
  match ordering {
    Some("price") => "price_cents ASC",
    Some("-price") => "price_cents DESC",
    Some("created_at") => "created_at ASC",
    Some("-created_at") => "created_at DESC",
    _ => "created_at DESC",
  }
}

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
  pub category: Option<Uuid>,
  pub q: Option<String>,
  pub is_innovative_project: Option<String>,
  pub ordering: Option<String>,
  pub page: Option<i64>,
  pub page_size: Option<i64>,
}

#[instrument(name = "handler::list_products", skip(state, query))]
pub async fn list_products(
  state: web::Data<AppState>,
  query: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let (limit, offset) = page_bounds(query.page, query.page_size);
  let innovative_only = query.is_innovative_project.as_deref() == Some("true");
  let search = query.q.as_ref().filter(|s| !s.is_empty());

  let filter_sql = "($1::uuid IS NULL OR category_id = $1) \
     AND ($2::text IS NULL OR title ILIKE '%' || $2 || '%') \
     AND (NOT $3 OR is_innovative_project)";

  let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {}", filter_sql))
    .bind(query.category)
    .bind(search)
    .bind(innovative_only)
    .fetch_one(&state.db_pool)
    .await?;

  let products: Vec<Product> = sqlx::query_as(&format!(
    "SELECT {} FROM products WHERE {} ORDER BY {} LIMIT $4 OFFSET $5",
    PRODUCT_COLUMNS,
    filter_sql,
    ordering_clause(query.ordering.as_deref()),
  ))
  .bind(query.category)
  .bind(search)
  .bind(innovative_only)
  .bind(limit)
  .bind(offset)
  .fetch_all(&state.db_pool)
  .await?;

  info!("Fetched {} of {} matching products.", products.len(), count);
  Ok(HttpResponse::Ok().json(json!({"count": count, "results": products})))
}

#[instrument(name = "handler::get_product", skip(state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();

  let product: Option<Product> = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
    .bind(product_id)
    .fetch_optional(&state.db_pool)
    .await?;

  match product {
    Some(product) => Ok(HttpResponse::Ok().json(product)),
    None => {
      warn!("Product {} not found.", product_id);
      Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)))
    }
  }
}

#[derive(Deserialize, Debug)]
pub struct ProductPayload {
  pub title: String,
  pub description: String,
  pub price_cents: i64,
  #[serde(default)]
  pub images: Vec<String>,
  pub stock: i32,
  #[serde(default)]
  pub is_innovative_project: bool,
  pub category_id: Uuid,
}

fn validate_product(payload: &ProductPayload) -> Result<(), AppError> {
  if payload.title.is_empty() {
    return Err(AppError::Validation("Product title is required.".to_string()));
  }
  if payload.price_cents <= 0 {
    return Err(AppError::Validation("Product price must be positive.".to_string()));
  }
  if payload.stock < 0 {
    return Err(AppError::Validation("Stock cannot be negative.".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::create_product", skip(state, payload, _admin), fields(title = %payload.title))]
pub async fn create_product(
  state: web::Data<AppState>,
  _admin: AdminUser,
  payload: web::Json<ProductPayload>,
) -> Result<HttpResponse, AppError> {
  validate_product(&payload)?;

  let product: Product = sqlx::query_as(&format!(
    "INSERT INTO products (id, title, description, price_cents, images, stock, is_innovative_project, category_id, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING {}",
    PRODUCT_COLUMNS
  ))
  .bind(Uuid::new_v4())
  .bind(&payload.title)
  .bind(&payload.description)
  .bind(payload.price_cents)
  .bind(serde_json::json!(payload.images))
  .bind(payload.stock)
  .bind(payload.is_innovative_project)
  .bind(payload.category_id)
  .fetch_one(&state.db_pool)
  .await?;

  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(state, payload, _admin), fields(product_id = %path.as_ref()))]
pub async fn update_product(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  payload: web::Json<ProductPayload>,
) -> Result<HttpResponse, AppError> {
  validate_product(&payload)?;
  let product_id = path.into_inner();

  let product: Option<Product> = sqlx::query_as(&format!(
    "UPDATE products SET title = $1, description = $2, price_cents = $3, images = $4, stock = $5, \
       is_innovative_project = $6, category_id = $7 WHERE id = $8 RETURNING {}",
    PRODUCT_COLUMNS
  ))
  .bind(&payload.title)
  .bind(&payload.description)
  .bind(payload.price_cents)
  .bind(serde_json::json!(payload.images))
  .bind(payload.stock)
  .bind(payload.is_innovative_project)
  .bind(payload.category_id)
  .bind(product_id)
  .fetch_optional(&state.db_pool)
  .await?;

  product
    .map(|p| HttpResponse::Ok().json(p))
    .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", product_id)))
}

#[instrument(name = "handler::delete_product", skip(state, _admin), fields(product_id = %path.as_ref()))]
pub async fn delete_product(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let result = sqlx::query("DELETE FROM products WHERE id = $1")
    .bind(product_id)
    .execute(&state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)));
  }
  Ok(HttpResponse::Ok().json(json!({"detail": "Product deleted"})))
}

// --- Categories ---

#[instrument(name = "handler::list_categories", skip(state))]
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories: Vec<Category> = sqlx::query_as("SELECT id, name, slug, image_url FROM categories ORDER BY name ASC")
    .fetch_all(&state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(categories))
}

#[instrument(name = "handler::get_category", skip(state), fields(category_id = %path.as_ref()))]
pub async fn get_category(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let category_id = path.into_inner();
  let category: Option<Category> = sqlx::query_as("SELECT id, name, slug, image_url FROM categories WHERE id = $1")
    .bind(category_id)
    .fetch_optional(&state.db_pool)
    .await?;
  category
    .map(|c| HttpResponse::Ok().json(c))
    .ok_or_else(|| AppError::NotFound(format!("Category with ID {} not found.", category_id)))
}

#[derive(Deserialize, Debug)]
pub struct CategoryPayload {
  pub name: String,
  pub slug: String,
  pub image_url: Option<String>,
}

#[instrument(name = "handler::create_category", skip(state, payload, _admin), fields(slug = %payload.slug))]
pub async fn create_category(
  state: web::Data<AppState>,
  _admin: AdminUser,
  payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.name.is_empty() || payload.slug.is_empty() {
    return Err(AppError::Validation("Category name and slug are required.".to_string()));
  }

  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1)")
    .bind(&payload.slug)
    .fetch_one(&state.db_pool)
    .await?;
  if exists {
    return Err(AppError::Validation("Category slug already exists.".to_string()));
  }

  let category: Category = sqlx::query_as(
    "INSERT INTO categories (id, name, slug, image_url) VALUES ($1, $2, $3, $4) \
     RETURNING id, name, slug, image_url",
  )
  .bind(Uuid::new_v4())
  .bind(&payload.name)
  .bind(&payload.slug)
  .bind(&payload.image_url)
  .fetch_one(&state.db_pool)
  .await?;

  Ok(HttpResponse::Created().json(category))
}

#[instrument(name = "handler::update_category", skip(state, payload, _admin), fields(category_id = %path.as_ref()))]
pub async fn update_category(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  let category_id = path.into_inner();
  let category: Option<Category> = sqlx::query_as(
    "UPDATE categories SET name = $1, slug = $2, image_url = $3 WHERE id = $4 \
     RETURNING id, name, slug, image_url",
  )
  .bind(&payload.name)
  .bind(&payload.slug)
  .bind(&payload.image_url)
  .bind(category_id)
  .fetch_optional(&state.db_pool)
  .await?;

  category
    .map(|c| HttpResponse::Ok().json(c))
    .ok_or_else(|| AppError::NotFound(format!("Category with ID {} not found.", category_id)))
}

#[instrument(name = "handler::delete_category", skip(state, _admin), fields(category_id = %path.as_ref()))]
pub async fn delete_category(
  state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let category_id = path.into_inner();
  let result = sqlx::query("DELETE FROM categories WHERE id = $1")
    .bind(category_id)
    .execute(&state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Category with ID {} not found.", category_id)));
  }
  Ok(HttpResponse::Ok().json(json!({"detail": "Category deleted"})))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_bounds_defaults_and_clamps() {
    assert_eq!(page_bounds(None, None), (18, 0));
    assert_eq!(page_bounds(Some(2), None), (18, 18));
    assert_eq!(page_bounds(Some(3), Some(10)), (10, 20));
    // page_size capped at 100, floor of 1
    assert_eq!(page_bounds(Some(1), Some(500)), (100, 0));
    assert_eq!(page_bounds(Some(1), Some(0)), (1, 0));
    // non-positive pages treated as the first page
    assert_eq!(page_bounds(Some(0), Some(10)), (10, 0));
    assert_eq!(page_bounds(Some(-4), Some(10)), (10, 0));
  }

  #[test]
  fn ordering_whitelist_blocks_arbitrary_clauses() {
    assert_eq!(ordering_clause(Some("price")), "price_cents ASC");
    assert_eq!(ordering_clause(Some("-price")), "price_cents DESC");
    assert_eq!(ordering_clause(Some("created_at")), "created_at ASC");
    assert_eq!(ordering_clause(Some("-created_at")), "created_at DESC");
    assert_eq!(ordering_clause(Some("title; DROP TABLE products")), "created_at DESC");
    assert_eq!(ordering_clause(None), "created_at DESC");
  }
}
