//! Session token authentication for the supply-chain platform backend.
//!
//! Accounts register or log in with a username and password and receive an
//! opaque session token. Tokens are held server-side, expire after a
//! configurable TTL, can be refreshed (the old token dies immediately) or
//! revoked, and unlock the protected resources.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod sessions;
pub mod user_handlers;

pub use config::Config;
pub use error::AuthError;
pub use service::TokenService;
pub use user_handlers::configure;
