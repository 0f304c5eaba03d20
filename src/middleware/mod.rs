pub mod accept;
pub mod auth;
pub mod body;
