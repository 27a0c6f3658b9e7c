use chrono::{DateTime, Duration, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::core::client::Client;
use crate::core::error::{AuthError, StorageError};
use crate::core::store::KeyValueStore;
use crate::types::request::{LoginRequest, ReissueRequest};
use crate::types::response::LoginResponse;
use crate::utils::clock::Clock;

pub const TOKEN_KEY: &str = "jikjikjik_tokens";
pub const USER_KEY: &str = "jikjikjik_user";
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Tokens issued by the API plus the time this client stored them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub member_id: String,
    pub role: String,
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("member_id", &self.member_id)
            .field("role", &self.role)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Owns the persisted [`TokenRecord`] and the calls that create or renew it.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    client: Client,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("client", &self.client)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>, client: Client, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            client,
            clock,
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn save(&self, access_token: &str, refresh_token: &str, member_id: &str, role: &str) {
        let record = TokenRecord {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            member_id: member_id.to_string(),
            role: role.to_string(),
            issued_at: self.clock.now(),
        };

        let result = serde_json::to_string(&record)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(TOKEN_KEY, raw));

        match result {
            Ok(()) => tracing::info!("Saved tokens for member {}", member_id),
            Err(e) => tracing::error!("Failed to save tokens: {}", e),
        }
    }

    /// The stored record, if there is one younger than the TTL. Expired or
    /// unreadable records are deleted on the way.
    pub fn load(&self) -> Option<TokenRecord> {
        let raw = match self.store.get(TOKEN_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::error!("Failed to read tokens: {}", e);
                return None;
            }
        };

        let record: TokenRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Failed to parse stored tokens: {}", e);
                self.clear();
                return None;
            }
        };

        if self.clock.now().signed_duration_since(record.issued_at) >= self.ttl {
            tracing::info!("Stored tokens expired, clearing");
            self.clear();
            return None;
        }

        Some(record)
    }

    /// Removes the tokens and the cached profile that goes with them.
    pub fn clear(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::error!("Failed to remove {}: {}", key, e);
            }
        }

        tracing::info!("Cleared stored tokens");
    }

    pub fn is_logged_in(&self) -> bool {
        self.load().is_some()
    }

    pub fn auth_headers(&self) -> Result<HeaderMap, AuthError> {
        let record = self.load().ok_or(AuthError::Unauthenticated)?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", record.access_token))
            .map_err(|_| AuthError::Unauthenticated)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, bearer);

        Ok(headers)
    }

    /// Exchanges the refresh token for a new pair. Any failure, including not
    /// being logged in, comes back as `false`; the caller must log in again.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> bool {
        let Some(record) = self.load() else {
            return false;
        };

        let request = ReissueRequest {
            refresh_token: record.refresh_token,
        };

        match self.client.reissue(&request).await {
            Ok(response) => {
                self.save(
                    &response.data.access_token,
                    &response.data.refresh_token,
                    &record.member_id,
                    &record.role,
                );
                tracing::info!("Refreshed tokens");
                true
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                false
            }
        }
    }

    /// Calls the login endpoint. Persisting the returned tokens is up to the caller.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, AuthError> {
        self.client.login(credentials).await
    }
}
