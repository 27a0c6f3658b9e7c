use chrono::{DateTime, Utc};
use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Per-attempt device identifier: `web_<epoch millis>_<9 base36 chars>`.
pub fn generate_device_token(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();

    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();

    format!("web_{}_{}", now.timestamp_millis(), suffix)
}
