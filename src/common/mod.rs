pub mod middleware_auth;
