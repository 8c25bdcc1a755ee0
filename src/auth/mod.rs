//! Session issuance and the refresh-token lifecycle.
//!
//! Anonymous → authenticated (access token valid) → access-expired-but-
//! refreshable → revoked. Refresh tokens are persisted at login and moved
//! to the blacklist at logout; a blacklisted token is never accepted
//! again. Unknown-user and wrong-password failures are indistinguishable
//! to the caller.

pub mod password;
pub mod token;

pub use token::{Claims, TokenKind, TokenSigner};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::db::{DocumentStore, Filter, StoreError, UpdateSpec};
use crate::models::{Account, ACCOUNTS, REFRESH_TOKENS, REVOKED_TOKENS};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    BadCredentials,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Account not found")]
    UnknownAccount,

    #[error("Refresh token rejected")]
    InvalidToken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// The pair returned by a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: DocumentStore,
    signer: TokenSigner,
}

impl AuthService {
    pub fn new(store: DocumentStore, signer: TokenSigner) -> Self {
        AuthService { store, signer }
    }

    /// Create an account with credentials attached. Fails closed on a
    /// duplicate username; the password is hashed before anything is
    /// persisted.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        name: &str,
        firstname: &str,
    ) -> Result<Account, AuthError> {
        if self.find_account_by_username(username)?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        let mut doc = serde_json::Map::new();
        doc.insert("username".into(), Value::String(username.into()));
        doc.insert(
            "password_hash".into(),
            Value::String(password::hash_password(password)),
        );
        doc.insert("name".into(), Value::String(name.into()));
        doc.insert("firstname".into(), Value::String(firstname.into()));
        let stored = self.store.collection(ACCOUNTS).insert_one(doc)?;
        let account: Account =
            serde_json::from_value(Value::Object(stored)).map_err(corrupt_account)?;
        tracing::info!(account = %account.id, "Account registered");
        Ok(account)
    }

    /// Attach or replace credentials on an existing account (the
    /// update-credentials half of the registration endpoint).
    pub async fn set_credentials(
        &self,
        account_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .find_account_by_id(account_id)?
            .ok_or(AuthError::UnknownAccount)?;
        if let Some(holder) = self.find_account_by_username(username)? {
            if holder.id != account.id {
                return Err(AuthError::UsernameTaken);
            }
        }
        let update = UpdateSpec {
            set: [
                ("username".to_string(), Value::String(username.into())),
                (
                    "password_hash".to_string(),
                    Value::String(password::hash_password(password)),
                ),
            ]
            .into_iter()
            .collect(),
            unset: Vec::new(),
        };
        self.store
            .collection(ACCOUNTS)
            .update_many(&Filter::eq("_id", account.id), &update)?;
        Ok(())
    }

    /// Validate credentials and issue an access/refresh pair. The refresh
    /// token is persisted as part of the active set.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(account) = self.find_account_by_username(username)? else {
            return Err(AuthError::BadCredentials);
        };
        let (Some(stored_username), Some(hash)) = (&account.username, &account.password_hash)
        else {
            return Err(AuthError::BadCredentials);
        };
        if !password::verify_password(password, hash) {
            return Err(AuthError::BadCredentials);
        }

        let access = self
            .signer
            .issue_access(&account.id, stored_username)
            .map_err(signing)?;
        let refresh = self
            .signer
            .issue_refresh(&account.id, stored_username)
            .map_err(signing)?;

        let mut doc = serde_json::Map::new();
        doc.insert("token".into(), Value::String(refresh.clone()));
        self.store.collection(REFRESH_TOKENS).insert_one(doc)?;

        tracing::info!(account = %account.id, "Login succeeded");
        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
        })
    }

    /// Exchange an active refresh token for a new access token. The token
    /// must be in the active set, absent from the blacklist, and carry a
    /// valid refresh signature.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let filter = Filter::eq("token", refresh_token);
        if self.store.collection(REFRESH_TOKENS).count(&filter)? == 0 {
            return Err(AuthError::InvalidToken);
        }
        if self.store.collection(REVOKED_TOKENS).count(&filter)? > 0 {
            return Err(AuthError::InvalidToken);
        }
        let claims = self
            .signer
            .verify_refresh(refresh_token)
            .map_err(|_| AuthError::InvalidToken)?;
        self.signer
            .issue_access(&claims.sub, &claims.username)
            .map_err(signing)
    }

    /// Revoke a refresh token: move it from the active set to the
    /// blacklist. Idempotent — an unknown token still reports success.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let filter = Filter::eq("token", refresh_token);
        if self.store.collection(REFRESH_TOKENS).count(&filter)? > 0 {
            let mut doc = serde_json::Map::new();
            doc.insert("token".into(), Value::String(refresh_token.into()));
            self.store.collection(REVOKED_TOKENS).insert_one(doc)?;
            self.store.collection(REFRESH_TOKENS).delete_many(&filter)?;
            tracing::info!("Refresh token revoked");
        }
        Ok(())
    }

    /// Overwrite the password hash of an account that already has a
    /// username. Accounts without credentials cannot change a password.
    pub async fn change_password(
        &self,
        account_id: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .find_account_by_id(account_id)?
            .ok_or(AuthError::UnknownAccount)?;
        if account.username.is_none() {
            return Err(AuthError::UnknownAccount);
        }
        let update =
            UpdateSpec::set_field("password_hash", password::hash_password(new_password));
        self.store
            .collection(ACCOUNTS)
            .update_many(&Filter::eq("_id", account.id), &update)?;
        Ok(())
    }

    /// Verify a presented bearer access token (signature + expiry).
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.signer
            .verify_access(token)
            .map_err(|_| AuthError::InvalidToken)
    }

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, AuthError> {
        self.find_account(&Filter::eq("username", username))
    }

    fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, AuthError> {
        self.find_account(&Filter::eq("_id", id))
    }

    fn find_account(&self, filter: &Filter) -> Result<Option<Account>, AuthError> {
        let docs = self
            .store
            .collection(ACCOUNTS)
            .find(filter, &Default::default(), None)?;
        docs.into_iter()
            .next()
            .map(|doc| serde_json::from_value(Value::Object(doc)).map_err(corrupt_account))
            .transpose()
    }
}

fn signing(err: token::TokenError) -> AuthError {
    AuthError::Signing(err.to_string())
}

fn corrupt_account(err: serde_json::Error) -> AuthError {
    AuthError::Store(StoreError::Corrupt(format!("account record: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service() -> AuthService {
        let store = DocumentStore::open_in_memory().unwrap();
        let signer = TokenSigner::new(b"test-secret", Duration::from_secs(900));
        AuthService::new(store, signer)
    }

    #[tokio::test]
    async fn register_then_login_issues_both_tokens() {
        let auth = service();
        auth.register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();

        let pair = auth.login("alice", "pw123").await.unwrap();
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());

        let claims = auth.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let auth = service();
        auth.register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();
        let result = auth.register("alice", "pw456", "Other", "Alice").await;
        assert!(matches!(result, Err(AuthError::UsernameTaken)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_identical() {
        let auth = service();
        auth.register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();

        let wrong_pw = auth.login("alice", "wrong").await;
        let unknown = auth.login("bob", "pw123").await;
        assert!(matches!(wrong_pw, Err(AuthError::BadCredentials)));
        assert!(matches!(unknown, Err(AuthError::BadCredentials)));
    }

    #[tokio::test]
    async fn password_is_stored_only_as_hash() {
        let auth = service();
        auth.register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();
        let account = auth.find_account_by_username("alice").unwrap().unwrap();
        let hash = account.password_hash.unwrap();
        assert!(!hash.contains("pw123"));
        assert!(hash.starts_with("pbkdf2-sha256$"));
    }

    #[tokio::test]
    async fn refresh_issues_new_access_token() {
        let auth = service();
        auth.register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();
        let pair = auth.login("alice", "pw123").await.unwrap();

        let access = auth.refresh(&pair.refresh_token).await.unwrap();
        let claims = auth.verify_access(&access).unwrap();
        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn unknown_refresh_token_rejected() {
        let auth = service();
        let result = auth.refresh("never-issued").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn logged_out_token_is_rejected_even_though_signature_is_valid() {
        let auth = service();
        auth.register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();
        let pair = auth.login("alice", "pw123").await.unwrap();

        auth.logout(&pair.refresh_token).await.unwrap();
        let result = auth.refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));

        // The token record still exists — in the blacklist
        let blacklisted = auth
            .store
            .collection(REVOKED_TOKENS)
            .count(&Filter::eq("token", pair.refresh_token.as_str()))
            .unwrap();
        assert_eq!(blacklisted, 1);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let auth = service();
        assert!(auth.logout("unknown-token").await.is_ok());
        assert!(auth.logout("unknown-token").await.is_ok());
    }

    #[tokio::test]
    async fn change_password_rehashes() {
        let auth = service();
        let account = auth
            .register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();

        auth.change_password(&account.id, "newpw").await.unwrap();
        assert!(matches!(
            auth.login("alice", "pw123").await,
            Err(AuthError::BadCredentials)
        ));
        assert!(auth.login("alice", "newpw").await.is_ok());
    }

    #[tokio::test]
    async fn change_password_requires_existing_account_with_username() {
        let auth = service();
        let result = auth.change_password("missing-id", "pw").await;
        assert!(matches!(result, Err(AuthError::UnknownAccount)));

        // Account without credentials attached
        let stored = auth
            .store
            .collection(ACCOUNTS)
            .insert_one(
                serde_json::json!({"name": "Doe", "firstname": "Jane"})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .unwrap();
        let id = stored.get("_id").unwrap().as_str().unwrap();
        let result = auth.change_password(id, "pw").await;
        assert!(matches!(result, Err(AuthError::UnknownAccount)));
    }

    #[tokio::test]
    async fn set_credentials_enables_login_for_existing_account() {
        let auth = service();
        let stored = auth
            .store
            .collection(ACCOUNTS)
            .insert_one(
                serde_json::json!({"name": "Doe", "firstname": "Jane"})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .unwrap();
        let id = stored.get("_id").unwrap().as_str().unwrap().to_string();

        auth.set_credentials(&id, "jane", "pw123").await.unwrap();
        assert!(auth.login("jane", "pw123").await.is_ok());
    }

    #[tokio::test]
    async fn set_credentials_rejects_username_held_by_another_account() {
        let auth = service();
        auth.register("alice", "pw123", "Liddell", "Alice")
            .await
            .unwrap();
        let other = auth
            .register("bob", "pw456", "Builder", "Bob")
            .await
            .unwrap();

        let result = auth.set_credentials(&other.id, "alice", "pw789").await;
        assert!(matches!(result, Err(AuthError::UsernameTaken)));
    }
}
