//! API router.
//!
//! Two route sets: the unprotected session entry points (`/login`,
//! `/token`) and everything else behind the bearer middleware. The
//! GraphQL endpoint lives at `/api`.
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer); endpoint handlers use `State<ApiContext>` via `with_state`.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

pub fn api_router(ctx: ApiContext) -> Router {
    // Protected routes. Layers apply bottom (innermost) to top
    // (outermost); Extension must be outermost so the auth middleware
    // can extract ApiContext.
    let protected = Router::new()
        .route(
            "/api",
            get(endpoints::graphql::graphiql).post(endpoints::graphql::handle),
        )
        .route("/login/create", post(endpoints::auth::create))
        .route("/login/changepw", post(endpoints::auth::change_password))
        .route("/logout", post(endpoints::auth::logout))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    // Session entry points, reachable anonymously.
    let unprotected = Router::new()
        .route("/login", post(endpoints::auth::login))
        .route("/token", post(endpoints::auth::token))
        .with_state(ctx);

    Router::new()
        .merge(protected)
        .merge(unprotected)
        .layer(CorsLayer::permissive())
}
