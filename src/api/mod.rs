//! HTTP surface: router, endpoints, bearer middleware, GraphQL schema,
//! and the server lifecycle.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod schema;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::{ApiContext, Identity};
