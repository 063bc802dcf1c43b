pub mod auth;
pub mod handlers;
pub mod queries;
pub mod response;
