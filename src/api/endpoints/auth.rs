//! Session endpoints.
//!
//! - `POST /login` — exchange credentials for a token pair
//! - `POST /token` — exchange an active refresh token for a new access token
//! - `POST /login/create` — register an account, or attach credentials to one
//! - `POST /login/changepw` — overwrite an account's password
//! - `POST /logout` — revoke a refresh token (idempotent)
//!
//! `/login` and `/token` are the only routes reachable without a bearer
//! token. Every field arrives optional so a missing one is a clean 400
//! instead of a deserialization error.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::TokenPair;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `POST /login` — validate credentials, issue an access/refresh pair.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    };
    let pair = ctx.auth.login(&username, &password).await?;
    Ok(Json(pair))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Accepted as `token` or `refreshToken`.
    #[serde(alias = "token")]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// `POST /token` — mint a fresh access token from an active refresh token.
pub async fn token(
    State(ctx): State<ApiContext>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Some(refresh_token) = req.refresh_token else {
        return Err(ApiError::BadRequest("token is required".into()));
    };
    let access_token = ctx.auth.refresh(&refresh_token).await?;
    Ok(Json(RefreshResponse { access_token }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub account_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub firstname: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub account_id: String,
}

/// `POST /login/create` — with `accountId`, attach credentials to that
/// account (200); without, register a new account (201).
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateRequest>,
) -> Result<Response, ApiError> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    };

    match req.account_id {
        Some(account_id) => {
            ctx.auth
                .set_credentials(&account_id, &username, &password)
                .await?;
            Ok(Json(CreateResponse { account_id }).into_response())
        }
        None => {
            let (Some(name), Some(firstname)) = (req.name, req.firstname) else {
                return Err(ApiError::BadRequest(
                    "name and firstname are required for a new account".into(),
                ));
            };
            let account = ctx
                .auth
                .register(&username, &password, &name, &firstname)
                .await?;
            Ok((
                StatusCode::CREATED,
                Json(CreateResponse {
                    account_id: account.id,
                }),
            )
                .into_response())
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub account_id: Option<String>,
    pub new_password: Option<String>,
}

/// `POST /login/changepw` — overwrite the password of an account that
/// already has credentials.
pub async fn change_password(
    State(ctx): State<ApiContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let (Some(account_id), Some(new_password)) = (req.account_id, req.new_password) else {
        return Err(ApiError::BadRequest(
            "accountId and newPassword are required".into(),
        ));
    };
    ctx.auth.change_password(&account_id, &new_password).await?;
    Ok(StatusCode::OK)
}

/// `POST /logout` — revoke the refresh token. Succeeds whether or not
/// the token was ever issued.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Json(req): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    let Some(refresh_token) = req.refresh_token else {
        return Err(ApiError::BadRequest("token is required".into()));
    };
    ctx.auth.logout(&refresh_token).await?;
    Ok(StatusCode::OK)
}
