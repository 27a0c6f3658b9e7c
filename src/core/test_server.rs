//! In-process stand-in for the member API, served by axum on a loopback port.

use axum::Router;
use axum::extract::{Json, Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const SECRET: &str = "test-secret";

#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct Claims {
    pub(crate) exp: usize,
    pub(crate) iat: usize,
    pub(crate) sub: String,
    pub(crate) iss: String,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct JoinParts {
    pub(crate) request: Value,
    pub(crate) signature_len: usize,
}

#[derive(Default)]
struct Inner {
    hits: HashMap<String, usize>,
    last_join: Option<JoinParts>,
    remote_base: Option<String>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    pub(crate) const PASSWORD: &'static str = "correct-password";
    pub(crate) const TAKEN_LOGIN_ID: &'static str = "01099999999";

    pub(crate) fn with_remote_base(url: &str) -> Self {
        let api = Self::default();
        api.inner.lock().remote_base = Some(url.to_string());
        api
    }

    pub(crate) fn hits(&self, path: &str) -> usize {
        self.inner.lock().hits.get(path).copied().unwrap_or(0)
    }

    pub(crate) fn last_join(&self) -> JoinParts {
        self.inner.lock().last_join.clone().unwrap_or_default()
    }

    fn hit(&self, path: &str) {
        *self.inner.lock().hits.entry(path.to_string()).or_default() += 1;
    }

    pub(crate) fn router(&self) -> Router {
        Router::new()
            .route("/login", post(login))
            .route("/reissue", post(reissue))
            .route("/join/company/join", post(join))
            .route("/api/config", get(config))
            .route("/me", get(me))
            .with_state(self.clone())
            .layer(TraceLayer::new_for_http())
    }
}

pub(crate) async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

pub(crate) fn encode_jwt(member_id: &str) -> String {
    let now = Utc::now();

    let claims = Claims {
        exp: (now + Duration::days(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
        sub: member_id.to_string(),
        iss: "https://api.jikjik.test".into(),
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_ref()),
    )
    .unwrap()
}

fn decode_jwt(token: &str) -> Option<Claims> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(SECRET.as_ref()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

async fn login(State(api): State<FakeApi>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    api.hit("/login");

    if body["password"] == FakeApi::PASSWORD && body["loginIdOrPhone"].is_string() {
        (
            StatusCode::OK,
            Json(json!({
                "data": {
                    "accessToken": encode_jwt("m1"),
                    "refreshToken": "r",
                    "memberId": "m1",
                    "role": "ROLE_COMPANY",
                }
            })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "data": {
                    "errorMessage": "invalid credentials",
                    "code": "E001",
                    "status": "BAD_REQUEST",
                }
            })),
        )
    }
}

async fn reissue(State(api): State<FakeApi>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    api.hit("/reissue");

    if body["refreshToken"] == "r" {
        (
            StatusCode::OK,
            Json(json!({ "data": { "accessToken": "a2", "refreshToken": "r2" } })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "refresh token expired" })),
        )
    }
}

async fn join(State(api): State<FakeApi>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    api.hit("/join/company/join");

    let mut parts = JoinParts::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap_or_default();

        match name.as_str() {
            "request" => parts.request = serde_json::from_slice(&bytes).unwrap_or_default(),
            "signatureImage" => parts.signature_len = bytes.len(),
            _ => {}
        }
    }

    let taken = parts.request["loginId"] == FakeApi::TAKEN_LOGIN_ID;
    api.inner.lock().last_join = Some(parts);

    if taken {
        (
            StatusCode::CONFLICT,
            Json(json!({
                "data": {
                    "errorMessage": "already registered",
                    "code": "E409",
                    "status": "CONFLICT",
                }
            })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "data": { "memberId": "m2" } })))
    }
}

async fn config(State(api): State<FakeApi>) -> Result<Json<Value>, StatusCode> {
    api.hit("/api/config");

    match api.inner.lock().remote_base.clone() {
        Some(url) => Ok(Json(json!({ "API_BASE_URL": url }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn me(State(api): State<FakeApi>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    api.hit("/me");

    let claims = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(decode_jwt)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(json!({ "data": { "memberId": claims.sub } })))
}
