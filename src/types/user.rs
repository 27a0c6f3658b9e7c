use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::store::TokenRecord;

pub(crate) const DEFAULT_NAME: &str = "홍길동";
pub(crate) const DEFAULT_EMAIL: &str = "jikjikjik@company.kr";
pub(crate) const DEFAULT_COMPANY: &str = "직직직";

/// Display profile cached for "remember me" sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_time: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Placeholder profile for a member whose details the API does not return.
    pub fn new(member_id: &str, role: &str) -> Self {
        Self {
            id: member_id.to_string(),
            name: DEFAULT_NAME.to_string(),
            email: DEFAULT_EMAIL.to_string(),
            company: DEFAULT_COMPANY.to_string(),
            role: role.to_string(),
            login_time: None,
        }
    }
}

impl From<&TokenRecord> for UserProfile {
    fn from(record: &TokenRecord) -> Self {
        Self::new(&record.member_id, &record.role)
    }
}
