pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
