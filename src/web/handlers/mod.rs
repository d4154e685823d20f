pub mod admin_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod enquiry_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod project_handlers;
pub mod user_handlers;
pub mod workshop_handlers;
