use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid prayer time '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Prayer time source error: {0}")]
    Provider(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn parse<S: Into<String>, R: Into<String>>(input: S, reason: R) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }

    pub fn notification<S: Into<String>>(msg: S) -> Self {
        Self::Notification(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map_or(false, |s| s.is_server_error() || s.as_u16() == 429)
            }
            Self::Provider(_) | Self::Notification(_) | Self::Io(_) => true,
            Self::Parse { .. } | Self::Config(_) | Self::Json(_) | Self::Anyhow(_) => false,
        }
    }

    /// Whether the message is free of request internals (URLs, tokens).
    pub fn is_secret_safe(&self) -> bool {
        match self {
            Self::Network(_) | Self::Anyhow(_) | Self::Io(_) => false,
            Self::Parse { .. }
            | Self::Provider(_)
            | Self::Notification(_)
            | Self::Config(_)
            | Self::Json(_) => true,
        }
    }

    pub fn to_safe_string(&self) -> String {
        if self.is_secret_safe() {
            self.to_string()
        } else {
            match self {
                Self::Network(_) => "Network request failed".to_string(),
                Self::Io(_) => "I/O operation failed".to_string(),
                _ => "Operation failed".to_string(),
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = AppError::parse("5:1x am", "minute is not numeric");
        assert_eq!(
            err.to_string(),
            "Invalid prayer time '5:1x am': minute is not numeric"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_notification_error_is_transient() {
        assert!(AppError::notification("HTTP 503").is_transient());
        assert!(!AppError::config("offset too large").is_transient());
    }

    #[test]
    fn test_safe_string_hides_internals() {
        let err = AppError::from(anyhow::anyhow!("https://api.example?token=secret"));
        assert_eq!(err.to_safe_string(), "Operation failed");

        let err = AppError::provider("page had 3 time slots");
        assert_eq!(err.to_safe_string(), err.to_string());
    }

    #[test]
    fn test_request_build_error_is_not_transient() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .expect_err("relative URL should not build");
        assert!(err.status().is_none());
        assert!(!AppError::Network(err).is_transient());
    }
}
