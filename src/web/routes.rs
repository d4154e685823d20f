use actix_web::web;

use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, enquiry_handlers, order_handlers, product_handlers, project_handlers,
  user_handlers, workshop_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called from `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Authentication
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register))
          .route("/login", web::post().to(auth_handlers::login))
          .route("/refresh", web::post().to(auth_handlers::refresh_token))
          .route("/google", web::post().to(auth_handlers::google_login))
          .route("/google/complete", web::post().to(auth_handlers::complete_google_signup)),
      )
      // Account
      .service(
        web::scope("/users")
          .route("/me", web::get().to(user_handlers::current_user))
          .route("/me", web::put().to(user_handlers::update_profile))
          .route("/me/password", web::put().to(user_handlers::change_password)),
      )
      .route(
        "/newsletter/subscribe",
        web::post().to(user_handlers::subscribe_newsletter),
      )
      // Catalog
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products))
          .route("", web::post().to(product_handlers::create_product))
          .route("/{product_id}", web::get().to(product_handlers::get_product))
          .route("/{product_id}", web::put().to(product_handlers::update_product))
          .route("/{product_id}", web::delete().to(product_handlers::delete_product)),
      )
      .service(
        web::scope("/categories")
          .route("", web::get().to(product_handlers::list_categories))
          .route("", web::post().to(product_handlers::create_category))
          .route("/{category_id}", web::get().to(product_handlers::get_category))
          .route("/{category_id}", web::put().to(product_handlers::update_category))
          .route("/{category_id}", web::delete().to(product_handlers::delete_category)),
      )
      // Cart
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart))
          .route("", web::delete().to(cart_handlers::clear_cart))
          .route("/add", web::post().to(cart_handlers::add_to_cart))
          .route("/{item_id}", web::delete().to(cart_handlers::remove_cart_item)),
      )
      // Orders and payment
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order))
          .route("/my", web::get().to(order_handlers::my_orders))
          .route("/pay/initiate", web::post().to(order_handlers::initiate_payment))
          .route("/pay/verify", web::post().to(order_handlers::verify_payment))
          .route("/track/{order_ref}", web::get().to(order_handlers::track_order))
          .route("/delivery-estimate", web::post().to(order_handlers::delivery_estimate))
          .route("/{order_id}", web::get().to(order_handlers::get_order)),
      )
      // Admin dashboards
      .service(
        web::scope("/admin")
          .route("/stats", web::get().to(admin_handlers::dashboard_stats))
          .route("/orders", web::get().to(admin_handlers::all_orders))
          .route(
            "/orders/{order_id}/status",
            web::put().to(admin_handlers::update_order_status),
          )
          .route("/users", web::get().to(admin_handlers::all_users))
          .route(
            "/users/{user_id}/status",
            web::put().to(admin_handlers::toggle_staff_status),
          ),
      )
      // Custom project intake
      .service(
        web::scope("/projects")
          .route("", web::post().to(project_handlers::create_project_request))
          .route("", web::get().to(project_handlers::list_project_requests))
          .route(
            "/{request_id}/status",
            web::patch().to(project_handlers::update_project_request_status),
          )
          .route(
            "/{request_id}",
            web::delete().to(project_handlers::delete_project_request),
          ),
      )
      // Workshops
      .service(
        web::scope("/workshops")
          .route("", web::get().to(workshop_handlers::list_workshops))
          .route("", web::post().to(workshop_handlers::create_workshop))
          .route("/{workshop_id}", web::get().to(workshop_handlers::get_workshop))
          .route("/{workshop_id}", web::put().to(workshop_handlers::update_workshop))
          .route("/{workshop_id}", web::delete().to(workshop_handlers::delete_workshop))
          .route(
            "/{workshop_id}/images/delete",
            web::post().to(workshop_handlers::delete_workshop_image),
          ),
      )
      // Workshop enquiries
      .service(
        web::scope("/enquiries")
          .route("", web::post().to(enquiry_handlers::create_enquiry))
          .route("", web::get().to(enquiry_handlers::list_enquiries)),
      ),
  );
}
