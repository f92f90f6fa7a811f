use super::NotificationSink;
use crate::error::{AppError, AppResult};
use crate::http_config::HttpConfig;
use crate::utils::{truncate_for_log, BoxFuture};
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Serialize;

pub const PUSHES_URL: &str = "https://api.pushbullet.com/v2/pushes";

#[derive(Debug, Serialize)]
struct NotePush<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    body: &'a str,
}

/// Sends reminders as Pushbullet notes to every device on the account.
pub struct PushbulletSink {
    client: Client,
    token: String,
    endpoint: String,
}

impl PushbulletSink {
    pub fn new(token: impl Into<String>) -> AppResult<Self> {
        Self::with_endpoint(token, PUSHES_URL)
    }

    pub fn with_endpoint(token: impl Into<String>, endpoint: impl Into<String>) -> AppResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AppError::config("Pushbullet access token is empty"));
        }
        Ok(Self {
            client: HttpConfig::push_api().build_client()?,
            token,
            endpoint: endpoint.into(),
        })
    }

    async fn push_note(&self, title: &str, body: &str) -> AppResult<()> {
        let note = NotePush { kind: "note", title, body };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Access-Token", &self.token)
            .json(&note)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Pushbullet accepted note '{}'", title);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(rejection(status, &text))
    }
}

fn rejection(status: StatusCode, text: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::config(format!("Pushbullet rejected the access token (HTTP {})", status.as_u16()))
        }
        StatusCode::BAD_REQUEST => {
            AppError::config(format!("Pushbullet rejected the note: {}", truncate_for_log(text, 120)))
        }
        _ => AppError::notification(format!("Pushbullet returned HTTP {}", status.as_u16())),
    }
}

impl NotificationSink for PushbulletSink {
    fn name(&self) -> &str {
        "pushbullet"
    }

    fn deliver<'a>(&'a self, title: &'a str, body: &'a str) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(self.push_note(title, body))
    }
}
