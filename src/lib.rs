pub mod api;
pub mod auth;
pub mod cli;
pub mod session;
pub mod vault;
