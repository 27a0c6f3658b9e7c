use std::sync::Arc;

use crate::core::client::Client;
use crate::core::config::{self, Args, DEFAULT_API_BASE_URL};
use crate::core::error::{AuthError, ConfigError, ValidationError};
use crate::core::store::{FileStore, KeyValueStore};
use crate::token::store::{CredentialStore, USER_KEY};
use crate::types::request::{JoinRequest, LoginRequest};
use crate::types::response::JoinResponse;
use crate::types::user::UserProfile;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::device::generate_device_token;
use crate::utils::ratelimiter::AttemptLimiter;
use crate::utils::validate::{LoginForm, SignupForm, Validator, normalize_phone};

pub const ROLE_COMPANY: &str = "ROLE_COMPANY";

// placeholders the sign-up endpoint requires but the form does not collect
const SIGNUP_DEVICE_TOKEN: &str = "token";
const SIGNUP_BUSINESS_NUMBER: &str = "000";
const SIGNUP_REGION: &str = "서울";
const SIGNUP_INQUIRY: &str = "직공 서비스에 가입하고 싶습니다.";

/// Everything the login/sign-up flows need, built once at start and passed
/// to whoever drives them.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    validator: Validator,
    pub credentials: CredentialStore,
    pub limiter: AttemptLimiter,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("credentials", &self.credentials)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl AppState {
    pub async fn new(args: &Args) -> Result<Self, ConfigError> {
        let mut client = Client::new(DEFAULT_API_BASE_URL, args.request_timeout())?;

        let base_url = config::resolve_base_url(args, &client).await;
        client.set_base_url(&base_url);

        let store = FileStore::open(&args.storage_path)?;

        Self::with_parts(Arc::new(store), client, Arc::new(SystemClock))
    }

    pub fn with_parts(
        store: Arc<dyn KeyValueStore>,
        client: Client,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            credentials: CredentialStore::new(store.clone(), client, clock.clone()),
            limiter: AttemptLimiter::new(store.clone(), clock.clone()),
            validator: Validator::new()?,
            store,
            clock,
        })
    }

    /// Full login: field checks and lockout first, then the API. The attempt
    /// counter follows the outcome and tokens are stored on success.
    pub async fn submit_login(&self, form: &LoginForm) -> Result<UserProfile, AuthError> {
        self.validator.validate_login(form)?;

        let identifier = form.login_id_or_phone.trim();

        if !self.limiter.is_allowed(identifier) {
            tracing::warn!("Login for {} refused, too many attempts", identifier);
            return Err(ValidationError::TooManyAttempts.into());
        }

        let request = LoginRequest {
            login_id_or_phone: identifier.to_string(),
            password: form.password.clone(),
            device_token: generate_device_token(self.clock.now()),
        };

        let response = match self.credentials.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.limiter.record_result(identifier, false);
                return Err(e);
            }
        };

        self.limiter.record_result(identifier, true);

        let data = response.data;
        self.credentials.save(
            &data.access_token,
            &data.refresh_token,
            &data.member_id,
            &data.role,
        );

        let profile = UserProfile::new(&data.member_id, &data.role);

        if form.remember {
            self.save_user_session(&profile);
        }

        tracing::info!("Logged in as member {}", data.member_id);

        Ok(profile)
    }

    pub async fn submit_signup(
        &self,
        form: &SignupForm,
        signature_image: Option<Vec<u8>>,
    ) -> Result<JoinResponse, AuthError> {
        self.validator.validate_signup(form)?;

        let phone = normalize_phone(&form.phone);

        let request = JoinRequest {
            login_id: phone.clone(),
            password: form.password.clone(),
            phone,
            role: ROLE_COMPANY.to_string(),
            device_token: SIGNUP_DEVICE_TOKEN.to_string(),
            business_number: SIGNUP_BUSINESS_NUMBER.to_string(),
            region: SIGNUP_REGION.to_string(),
            company_name: form.company_name.trim().to_string(),
            email: form.email.trim().to_string(),
            manager: form.manager_name.trim().to_string(),
            inquiry: SIGNUP_INQUIRY.to_string(),
        };

        let response = self
            .credentials
            .client()
            .join(&request, signature_image)
            .await?;

        tracing::info!("Sign-up submitted for {}", request.login_id);

        Ok(response)
    }

    pub fn save_user_session(&self, profile: &UserProfile) {
        let profile = UserProfile {
            login_time: Some(self.clock.now()),
            ..profile.clone()
        };

        match serde_json::to_string(&profile) {
            Ok(raw) => {
                if let Err(e) = self.store.set(USER_KEY, raw) {
                    tracing::error!("Failed to save user session: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to encode user session: {}", e),
        }
    }

    /// The signed-in user, if the stored tokens are still valid. Falls back to
    /// a placeholder profile when none was cached.
    pub fn load_user_session(&self) -> Option<UserProfile> {
        let record = self.credentials.load()?;

        match self.store.get(USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::error!("Failed to parse user session: {}", e);
                    self.credentials.clear();
                    None
                }
            },
            Ok(None) => Some(UserProfile::from(&record)),
            Err(e) => {
                tracing::warn!("Failed to read user session: {}", e);
                Some(UserProfile::from(&record))
            }
        }
    }

    pub fn logout(&self) {
        self.credentials.clear();
        tracing::info!("Logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::core::test_server::{FakeApi, spawn};
    use crate::utils::clock::ManualClock;
    use axum::Router;
    use axum::routing::post;
    use chrono::{Duration, Utc};
    use serde_json::json;

    async fn make_state(api: &FakeApi) -> (AppState, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let client = Client::new(&spawn(api.router()).await, None).unwrap();

        let state = AppState::with_parts(
            Arc::new(MemoryStore::new()),
            client,
            Arc::new(clock.clone()),
        )
        .unwrap();

        (state, clock)
    }

    fn login_form(password: &str) -> LoginForm {
        LoginForm {
            login_id_or_phone: "010-1234-5678".into(),
            password: password.into(),
            remember: false,
        }
    }

    fn signup_form(phone: &str) -> SignupForm {
        SignupForm {
            company_name: "Acme".into(),
            manager_name: "Kim".into(),
            email: "ceo@acme.kr".into(),
            password: "password123".into(),
            confirm_password: "password123".into(),
            phone: phone.into(),
            agree_terms: true,
        }
    }

    #[tokio::test]
    async fn test_lockout_after_five_wrong_passwords() {
        let api = FakeApi::default();
        let (state, clock) = make_state(&api).await;

        for _ in 0..5 {
            let error = state.submit_login(&login_form("wrong")).await.unwrap_err();
            assert_eq!(error.message(), "invalid credentials");
        }

        assert!(!state.limiter.is_allowed("010-1234-5678"));

        let error = state.submit_login(&login_form("wrong")).await.unwrap_err();
        assert_eq!(error, AuthError::Validation(ValidationError::TooManyAttempts));
        assert_eq!(api.hits("/login"), 5);

        clock.advance(Duration::minutes(15));
        assert!(state.limiter.is_allowed("010-1234-5678"));

        state
            .submit_login(&login_form(FakeApi::PASSWORD))
            .await
            .unwrap();
        assert_eq!(api.hits("/login"), 6);
        assert!(state.credentials.is_logged_in());
    }

    #[tokio::test]
    async fn test_success_resets_attempts() {
        let api = FakeApi::default();
        let (state, _) = make_state(&api).await;

        for _ in 0..4 {
            let _ = state.submit_login(&login_form("wrong")).await;
        }

        state
            .submit_login(&login_form(FakeApi::PASSWORD))
            .await
            .unwrap();

        for _ in 0..4 {
            let _ = state.submit_login(&login_form("wrong")).await;
        }
        assert!(state.limiter.is_allowed("010-1234-5678"));
    }

    #[tokio::test]
    async fn test_successful_login_stores_exact_tokens() {
        let app = Router::new().route(
            "/login",
            post(|| async {
                axum::Json(json!({
                    "data": {
                        "accessToken": "a",
                        "refreshToken": "r",
                        "memberId": "m1",
                        "role": "ROLE_COMPANY",
                    }
                }))
            }),
        );
        let client = Client::new(&spawn(app).await, None).unwrap();
        let state =
            AppState::with_parts(Arc::new(MemoryStore::new()), client, Arc::new(SystemClock))
                .unwrap();

        let before = Utc::now();
        let profile = state.submit_login(&login_form("pw")).await.unwrap();
        let after = Utc::now();

        let record = state.credentials.load().unwrap();
        assert_eq!(record.access_token, "a");
        assert_eq!(record.refresh_token, "r");
        assert_eq!(record.member_id, "m1");
        assert_eq!(record.role, "ROLE_COMPANY");
        assert!(before <= record.issued_at && record.issued_at <= after);

        assert_eq!(profile.id, "m1");
        assert_eq!(profile.role, "ROLE_COMPANY");
    }

    #[tokio::test]
    async fn test_validation_never_reaches_network() {
        let api = FakeApi::default();
        let (state, _) = make_state(&api).await;

        let error = state.submit_login(&login_form("")).await.unwrap_err();

        assert_eq!(error, AuthError::Validation(ValidationError::MissingFields));
        assert_eq!(api.hits("/login"), 0);

        for _ in 0..10 {
            let _ = state.submit_login(&login_form("")).await;
        }
        assert!(state.limiter.is_allowed("010-1234-5678"));
    }

    #[tokio::test]
    async fn test_unreachable_server_counts_as_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = AppState::with_parts(
            Arc::new(MemoryStore::new()),
            Client::new(&format!("http://{addr}"), None).unwrap(),
            Arc::new(SystemClock),
        )
        .unwrap();

        for _ in 0..5 {
            let error = state.submit_login(&login_form("pw")).await.unwrap_err();
            assert_eq!(error.status(), 0);
        }

        assert!(!state.limiter.is_allowed("010-1234-5678"));
    }

    #[tokio::test]
    async fn test_remembered_session() {
        let api = FakeApi::default();
        let (state, clock) = make_state(&api).await;

        assert_eq!(state.load_user_session(), None);

        let form = LoginForm {
            remember: true,
            ..login_form(FakeApi::PASSWORD)
        };
        state.submit_login(&form).await.unwrap();

        let profile = state.load_user_session().unwrap();
        assert_eq!(profile.id, "m1");
        assert_eq!(profile.login_time, Some(clock.now()));

        state.logout();
        assert_eq!(state.load_user_session(), None);
    }

    #[tokio::test]
    async fn test_session_without_cached_profile() {
        let api = FakeApi::default();
        let (state, _) = make_state(&api).await;

        state
            .submit_login(&login_form(FakeApi::PASSWORD))
            .await
            .unwrap();

        assert_eq!(
            state.load_user_session(),
            Some(UserProfile::new("m1", "ROLE_COMPANY"))
        );
    }

    #[tokio::test]
    async fn test_session_expires_with_tokens() {
        let api = FakeApi::default();
        let (state, clock) = make_state(&api).await;

        let form = LoginForm {
            remember: true,
            ..login_form(FakeApi::PASSWORD)
        };
        state.submit_login(&form).await.unwrap();

        clock.advance(Duration::hours(24));

        assert_eq!(state.load_user_session(), None);
        assert_eq!(state.store.get(USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_profile_logs_out() {
        let api = FakeApi::default();
        let (state, _) = make_state(&api).await;

        state
            .submit_login(&login_form(FakeApi::PASSWORD))
            .await
            .unwrap();
        state.store.set(USER_KEY, "{broken".into()).unwrap();

        assert_eq!(state.load_user_session(), None);
        assert!(!state.credentials.is_logged_in());
    }

    #[tokio::test]
    async fn test_signup_sends_normalized_phone() {
        let api = FakeApi::default();
        let (state, _) = make_state(&api).await;

        state
            .submit_signup(&signup_form("010-1234-5678"), None)
            .await
            .unwrap();

        let parts = api.last_join();
        assert_eq!(parts.request["loginId"], "01012345678");
        assert_eq!(parts.request["phone"], "01012345678");
        assert_eq!(parts.request["manager"], "Kim");
        assert_eq!(parts.request["role"], ROLE_COMPANY);
    }

    #[tokio::test]
    async fn test_signup_validation_never_reaches_network() {
        let api = FakeApi::default();
        let (state, _) = make_state(&api).await;

        let form = SignupForm {
            agree_terms: false,
            ..signup_form("010-1234-5678")
        };
        let error = state.submit_signup(&form, None).await.unwrap_err();

        assert_eq!(
            error,
            AuthError::Validation(ValidationError::TermsNotAccepted)
        );
        assert_eq!(api.hits("/join/company/join"), 0);
    }

    #[tokio::test]
    async fn test_signup_conflict_surfaces_server_message() {
        let api = FakeApi::default();
        let (state, _) = make_state(&api).await;

        let error = state
            .submit_signup(&signup_form("010-9999-9999"), None)
            .await
            .unwrap_err();

        assert_eq!(error.user_message(), "already registered");
        assert_eq!(error.status(), 409);
    }
}
