pub mod assignments;
pub mod auth;
pub mod error;
pub mod forum;
pub mod gateway;
pub mod idp;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod roles;
pub mod routes;
pub mod security;
pub mod session;
pub mod tenant;

pub use routes::{config, AppState};
pub use security::SecurityHeaders;
