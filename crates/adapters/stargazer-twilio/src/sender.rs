use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use thiserror::Error;

use stargazer_core::{NotifyError, Notifier};

use crate::config::TwilioConfig;

/// Message statuses Twilio reports for a message that is on its way.
const OK_STATUSES: [&str; 4] = ["accepted", "queued", "sending", "delivered"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TwilioSetupError {
    #[error("Twilio account SID must be specified")]
    MissingAccountSid,
    #[error("Twilio auth token must be specified")]
    MissingAuthToken,
    #[error("sender phone number must be specified")]
    MissingSender,
}

/// Subset of the Twilio message resource we care about.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageResponse {
    sid: String,
    status: String,
    to: String,
}

/// Body Twilio returns with a non-success status.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorResponse {
    code: Option<i64>,
    message: Option<String>,
}

/// Sends SMS messages through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioSmsSender {
    client: reqwest::Client,
    api_base_url: String,
    account_sid: String,
    auth_token: String,
    sender: String,
    timeout: Duration,
}

impl TwilioSmsSender {
    pub fn new(config: &TwilioConfig, client: reqwest::Client) -> Result<Self, TwilioSetupError> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let account_sid = non_empty(&config.account_sid).ok_or(TwilioSetupError::MissingAccountSid)?;
        let auth_token = non_empty(&config.auth_token).ok_or(TwilioSetupError::MissingAuthToken)?;
        let sender = non_empty(&config.sender).ok_or(TwilioSetupError::MissingSender)?;
        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            sender,
            timeout: config.timeout(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let form = [("From", self.sender.as_str()), ("To", to), ("Body", body)];
        let resp = self
            .client
            .post(self.endpoint())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(ACCEPT, "application/json")
            .form(&form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            // Proxies and load balancers may answer with a non-JSON body.
            let error = resp.json::<ErrorResponse>().await.unwrap_or_default();
            return Err(NotifyError::Api {
                code: error.code.unwrap_or(i64::from(status.as_u16())),
                message: error.message.unwrap_or_else(|| status.to_string()),
            });
        }

        let message: MessageResponse = resp
            .json()
            .await
            .map_err(|e| NotifyError::Decode(e.to_string()))?;
        if !OK_STATUSES.contains(&message.status.as_str()) {
            return Err(NotifyError::BadStatus(message.status));
        }

        tracing::info!(
            message_sid = %message.sid,
            message_status = %message.status,
            message_to = %message.to,
            "Sent SMS"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: Some("AC123".to_string()),
            auth_token: Some("secret".to_string()),
            sender: Some("+15555550199".to_string()),
            ..TwilioConfig::default()
        }
    }

    #[test]
    fn requires_every_credential() {
        let client = reqwest::Client::new();
        let cfg = TwilioConfig {
            account_sid: None,
            ..config()
        };
        assert_eq!(
            TwilioSmsSender::new(&cfg, client.clone()).unwrap_err(),
            TwilioSetupError::MissingAccountSid
        );
        let cfg = TwilioConfig {
            auth_token: Some(String::new()),
            ..config()
        };
        assert_eq!(
            TwilioSmsSender::new(&cfg, client.clone()).unwrap_err(),
            TwilioSetupError::MissingAuthToken
        );
        let cfg = TwilioConfig {
            sender: None,
            ..config()
        };
        assert_eq!(
            TwilioSmsSender::new(&cfg, client).unwrap_err(),
            TwilioSetupError::MissingSender
        );
    }

    #[test]
    fn endpoint_includes_account() {
        let sender = TwilioSmsSender::new(&config(), reqwest::Client::new()).unwrap();
        assert_eq!(
            sender.endpoint(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn decodes_error_payload() {
        let body = r#"{"code": 21211, "message": "The 'To' number is not valid.", "status": 400}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.code, Some(21211));
        assert_eq!(
            parsed.message.as_deref(),
            Some("The 'To' number is not valid.")
        );
    }

    #[test]
    fn decodes_message_resource() {
        let body = r#"{"sid": "SM1", "status": "queued", "to": "+15555550100", "error_code": null, "error_message": null}"#;
        let parsed: MessageResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.sid, "SM1");
        assert_eq!(parsed.status, "queued");
        assert_eq!(parsed.to, "+15555550100");
    }
}
