//! Contains data structures representing database entities.

pub mod cart_item;
pub mod category;
pub mod enquiry;
pub mod order;
pub mod order_item;
pub mod product;
pub mod project_request;
pub mod user;
pub mod workshop;

// Re-export the model structs for convenient access
pub use cart_item::CartItem;
pub use category::Category;
pub use enquiry::WorkshopEnquiry;
pub use order::{Order, OrderStatus, PaymentMethod};
pub use order_item::OrderItem;
pub use product::Product;
pub use project_request::{ProjectRequest, ProjectStatus, ProjectType};
pub use user::{Profile, User};
pub use workshop::{Workshop, WorkshopImage};
