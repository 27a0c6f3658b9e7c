use regex::Regex;

use crate::core::error::{ConfigError, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    pub login_id_or_phone: String,
    pub password: String,
    pub remember: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SignupForm {
    pub company_name: String,
    pub manager_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: String,
    pub agree_terms: bool,
}

#[derive(Clone)]
pub struct Validator {
    email_pattern: Regex,
    phone_pattern: Regex,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("email_pattern", &self.email_pattern.as_str())
            .field("phone_pattern", &self.phone_pattern.as_str())
            .finish()
    }
}

impl Validator {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            email_pattern: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?,
            phone_pattern: Regex::new(r"^01[0-9]-?[0-9]{3,4}-?[0-9]{4}$")?,
        })
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email_pattern.is_match(email)
    }

    pub fn is_valid_password(&self, password: &str) -> bool {
        password.chars().count() >= MIN_PASSWORD_LEN
    }

    /// Korean mobile numbers, hyphens optional, whitespace ignored.
    pub fn is_valid_phone(&self, phone: &str) -> bool {
        let phone: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
        self.phone_pattern.is_match(&phone)
    }

    pub fn validate_login(&self, form: &LoginForm) -> Result<(), ValidationError> {
        if form.login_id_or_phone.trim().is_empty() || form.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }

        Ok(())
    }

    /// Checks run in the order the sign-up form reports them, first failure wins.
    pub fn validate_signup(&self, form: &SignupForm) -> Result<(), ValidationError> {
        let required = [
            &form.company_name,
            &form.manager_name,
            &form.email,
            &form.password,
            &form.confirm_password,
            &form.phone,
        ];

        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ValidationError::MissingFields);
        }

        if !self.is_valid_email(&form.email) {
            return Err(ValidationError::InvalidEmail);
        }

        if !self.is_valid_password(&form.password) {
            return Err(ValidationError::PasswordTooShort);
        }

        if form.password != form.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        if !self.is_valid_phone(&form.phone) {
            return Err(ValidationError::InvalidPhone);
        }

        if !form.agree_terms {
            return Err(ValidationError::TermsNotAccepted);
        }

        Ok(())
    }
}

/// Inserts hyphens into whatever digits `raw` contains: `010-1234-5678`.
pub fn format_phone_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    match digits.len() {
        0..=3 => digits,
        4..=7 => format!("{}-{}", &digits[..3], &digits[3..]),
        _ => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
    }
}

/// Phone number as the API stores it, without hyphens or spaces.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}
