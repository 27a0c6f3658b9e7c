use std::path::PathBuf;

pub(crate) const CONNECTIVITY_MESSAGE: &str =
    "Unable to reach the server. Please check your network connection.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    HTTPClient(#[from] reqwest::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Anything that ends a CLI run early.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message())]
    Auth(#[from] AuthError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path:?}: {source}")]
    IO {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Client-side form and throttling failures. None of these reach the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least 8 characters.")]
    PasswordTooShort,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Please enter a valid phone number. (e.g. 010-1234-5678)")]
    InvalidPhone,
    #[error("Please agree to the terms of service.")]
    TermsNotAccepted,
    #[error("Too many login attempts. Please try again in 15 minutes.")]
    TooManyAttempts,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No response was received. Reported with status 0.
    #[error("{message}")]
    Connectivity { message: String },
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        code: Option<String>,
        error_type: Option<String>,
    },
    #[error("Login required.")]
    Unauthenticated,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AuthError {
    pub(crate) fn connectivity() -> Self {
        AuthError::Connectivity {
            message: CONNECTIVITY_MESSAGE.to_string(),
        }
    }

    pub(crate) fn server(status: u16, message: impl Into<String>) -> Self {
        AuthError::Server {
            status,
            message: message.into(),
            code: None,
            error_type: None,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            AuthError::Connectivity { .. } => 0,
            AuthError::Server { status, .. } => *status,
            AuthError::Unauthenticated => 401,
            AuthError::Validation(_) => 0,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            AuthError::Server { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn error_type(&self) -> Option<&str> {
        match self {
            AuthError::Server { error_type, .. } => error_type.as_deref(),
            AuthError::Unauthenticated => Some("UNAUTHORIZED"),
            _ => None,
        }
    }

    /// The text shown to the user: the server's own message when it sent one,
    /// otherwise a generic message for the status.
    pub fn user_message(&self) -> String {
        let message = self.message();

        if !message.trim().is_empty() {
            return message;
        }

        fallback_message(self.status()).to_string()
    }
}

pub fn fallback_message(status: u16) -> &'static str {
    match status {
        0 => CONNECTIVITY_MESSAGE,
        500 => "A server error occurred. Please try again later.",
        503 => "The service is temporarily unavailable.",
        _ => "An unknown error occurred.",
    }
}
