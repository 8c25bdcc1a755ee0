//! GraphQL endpoint.
//!
//! - `POST /api` — execute a GraphQL request
//! - `GET /api` — serve the GraphiQL playground
//!
//! Both sit behind the bearer middleware; the playground itself needs a
//! token to load.

use axum::extract::State;
use axum::response::Html;
use axum::{Extension, Json};

use async_graphql::http::GraphiQLSource;

use crate::api::types::{ApiContext, Identity};

/// `POST /api` — run a query or mutation against the schema. The caller
/// identity is available to field resolvers as context data.
pub async fn handle(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(ctx.schema.execute(request.data(identity)).await)
}

/// `GET /api` — interactive playground pointed at this endpoint.
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/api").finish())
}
