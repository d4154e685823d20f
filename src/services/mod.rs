pub mod auth;
pub mod checkout;
pub mod geo;
pub mod google;
pub mod mailer;
pub mod payments;
