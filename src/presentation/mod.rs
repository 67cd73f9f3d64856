// Presentation layer - HTTP routing, handlers and the auth gate
pub mod admin_handlers;
pub mod app_state;
pub mod auth;
pub mod handlers;
pub mod router;
