use serde::Deserialize;

/// Every success body from the API wraps its payload in `data`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: String,
    pub member_id: String,
    pub role: String,
}

pub type LoginResponse = ApiResponse<LoginData>;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReissueData {
    pub access_token: String,
    pub refresh_token: String,
}

pub type ReissueResponse = ApiResponse<ReissueData>;

/// The join payload is not used beyond success; it is kept raw and may be absent.
pub type JoinResponse = ApiResponse<Option<serde_json::Value>>;

/// Failure body. Either `{data: {errorMessage, code, status}}` or `{message}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) data: Option<ErrorData>,
    pub(crate) message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorData {
    pub(crate) error_message: Option<String>,
    /// Some endpoints send a numeric code, others a string.
    pub(crate) code: Option<serde_json::Value>,
    pub(crate) status: Option<String>,
}

impl ErrorData {
    pub(crate) fn code(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(code) => Some(code.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Body of `GET /api/config`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RemoteConfig {
    #[serde(rename = "API_BASE_URL")]
    pub api_base_url: Option<String>,
}
