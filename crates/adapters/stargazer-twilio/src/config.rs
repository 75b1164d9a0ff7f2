use std::time::Duration;

use serde::Deserialize;

/// Configuration for sending SMS through Twilio.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub api_base_url: String,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Twilio phone number messages are sent from.
    pub sender: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.twilio.com/2010-04-01".to_string(),
            account_sid: None,
            auth_token: None,
            sender: None,
            timeout_secs: 20,
        }
    }
}

impl TwilioConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Names of the credentials that are missing or empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(str::is_empty);
        let mut missing = Vec::new();
        if blank(&self.account_sid) {
            missing.push("account_sid");
        }
        if blank(&self.auth_token) {
            missing.push("auth_token");
        }
        if blank(&self.sender) {
            missing.push("sender");
        }
        missing
    }
}
