pub mod auth;
pub mod graphql;
