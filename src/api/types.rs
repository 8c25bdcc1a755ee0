//! Shared handler state and the per-request identity extension.

use crate::api::schema::AppSchema;
use crate::auth::AuthService;

/// Everything the HTTP layer needs, cloned into each handler.
#[derive(Clone)]
pub struct ApiContext {
    pub auth: AuthService,
    pub schema: AppSchema,
}

/// Inserted into request extensions by the auth middleware once a bearer
/// token has been verified.
#[derive(Debug, Clone)]
pub struct Identity {
    pub account_id: String,
    pub username: String,
}
