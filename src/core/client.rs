use reqwest::header::{self, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

use crate::core::error::{AuthError, ConfigError};
use crate::types::request::{JoinRequest, LoginRequest, ReissueRequest};
use crate::types::response::{
    ErrorBody, JoinResponse, LoginResponse, ReissueResponse, RemoteConfig,
};

const USER_AGENT: &str = concat!("jikjik-auth/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the member API. Holds no credentials of its own.
#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Client {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let mut builder = reqwest::ClientBuilder::new().user_agent(USER_AGENT);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: trim_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        tracing::info!("API URL changed to {}", base_url);
        self.base_url = trim_base_url(base_url);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        tracing::debug!("Logging in as {}", request.login_id_or_phone);

        self.execute(self.client.post(self.url("/login")).json(request))
            .await
    }

    #[instrument(skip_all)]
    pub async fn reissue(&self, request: &ReissueRequest) -> Result<ReissueResponse, AuthError> {
        tracing::debug!("Reissuing tokens");

        self.execute(self.client.post(self.url("/reissue")).json(request))
            .await
    }

    /// Company sign-up. The signature image part is sent empty when absent.
    #[instrument(skip_all)]
    pub async fn join(
        &self,
        request: &JoinRequest,
        signature_image: Option<Vec<u8>>,
    ) -> Result<JoinResponse, AuthError> {
        tracing::debug!("Submitting sign-up for {}", request.login_id);

        let json = serde_json::to_string(request).map_err(|e| {
            tracing::error!("Failed to encode sign-up request: {}", e);
            AuthError::connectivity()
        })?;

        let form = Form::new().text("request", json);
        let form = match signature_image {
            Some(bytes) => form.part(
                "signatureImage",
                Part::bytes(bytes).file_name("signature.png"),
            ),
            None => form.text("signatureImage", ""),
        };

        self.execute(
            self.client
                .post(self.url("/join/company/join"))
                .multipart(form),
        )
        .await
    }

    /// Reads `{API_BASE_URL}` from `{origin}/api/config`. Failures only warn.
    #[instrument(skip_all)]
    pub async fn fetch_remote_config(&self, origin: &str) -> Option<RemoteConfig> {
        let url = format!("{}/api/config", trim_base_url(origin));

        tracing::debug!("Loading config from {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Could not load config from server: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Could not load config from server: {}", response.status());
            return None;
        }

        match response.json::<RemoteConfig>().await {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Could not decode server config: {}", e);
                None
            }
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AuthError> {
        let response = request
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Request failed: {}", e);
                AuthError::connectivity()
            })?;

        let status = response.status().as_u16();

        let body = response.text().await.map_err(|e| {
            tracing::warn!("Failed to read response body: {}", e);
            AuthError::server(status, generic_message(status))
        })?;

        if !(200..300).contains(&status) {
            let error = error_from_body(status, &body);
            tracing::warn!("Request rejected with status {}: {}", status, error);
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Unexpected response body: {}", e);
            AuthError::server(status, generic_message(status))
        })
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn generic_message(status: u16) -> String {
    format!("A server error occurred. ({status})")
}

/// Builds the error for a non-success response. The server's own message is
/// used verbatim when it sent one.
pub(crate) fn error_from_body(status: u16, body: &str) -> AuthError {
    let body: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(data) = &body.data {
        if let Some(message) = data.error_message.as_deref().filter(|m| !m.is_empty()) {
            return AuthError::Server {
                status,
                message: message.to_string(),
                code: data.code(),
                error_type: data.status.clone(),
            };
        }
    }

    let message = body
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| generic_message(status));

    AuthError::server(status, message)
}
