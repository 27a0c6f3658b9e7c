use serde::Serialize;

/// Body of `POST /login`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_id_or_phone: String,
    pub password: String,
    pub device_token: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login_id_or_phone", &self.login_id_or_phone)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /reissue`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReissueRequest {
    pub refresh_token: String,
}

/// JSON `request` part of `POST /join/company/join`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub login_id: String,
    pub password: String,
    pub phone: String,
    pub role: String,
    pub device_token: String,
    pub business_number: String,
    pub region: String,
    pub company_name: String,
    pub email: String,
    pub manager: String,
    pub inquiry: String,
}
