//! WhatsApp notification via the Twilio Messages API.
//!
//! Sending is best-effort relative to persistence: the pipeline never
//! reverts a committed account when a message fails, it only reports a
//! degraded success.
//!
//! ## Environment Variables
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `TWILIO_ACCOUNT_SID` | Yes | Twilio account SID |
//! | `TWILIO_AUTH_TOKEN` | Yes | Twilio auth token |
//! | `TWILIO_WHATSAPP_NUMBER` | Yes | Sender, e.g. `whatsapp:+14155238886` |
//! | `TEST_MODE` | No | Log the message instead of sending it |

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::env;
use thiserror::Error;
use tracing::{info, warn};

use crate::utils::metrics::NOTIFICATIONS;

/// Country code prefixed to the digits-only destination number.
const COUNTRY_CODE: &str = "55";

/// Notification faults. All of them leave the persisted account untouched.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing environment variable: {0}")]
    Configuration(String),
    #[error("request to messaging API failed: {0}")]
    Transport(String),
    #[error("messaging API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Outbound messaging contract consumed by the registration pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the welcome message for a freshly created account.
    ///
    /// `phone` is the stored display-form number; `first_name` the first
    /// whitespace-delimited token of the registrant's full name.
    async fn send_welcome(&self, phone: &str, first_name: &str) -> Result<(), NotifyError>;
}

/// Derives the WhatsApp destination address: all non-digit characters are
/// stripped from the stored phone and the fixed country code is prefixed.
pub fn whatsapp_destination(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("whatsapp:+{}{}", COUNTRY_CODE, digits)
}

/// First whitespace-delimited token of the full name.
pub fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or(full_name)
}

/// Fixed congratulatory template, parameterized by first name.
pub fn welcome_message(first_name: &str) -> String {
    format!(
        "Congratulations {}! Your registration was completed successfully.",
        first_name
    )
}

/// Twilio WhatsApp client configuration.
#[derive(Clone)]
pub struct WhatsAppConfig {
    account_sid: String,
    auth_token: String,
    from_number: String,
    http: Client,
    test_mode: bool,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .field("test_mode", &self.test_mode)
            .finish()
    }
}

impl WhatsAppConfig {
    /// Creates the notifier configuration from environment variables.
    pub fn from_env() -> Result<Self, NotifyError> {
        let test_mode = env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if test_mode {
            info!("Running in TEST_MODE - WhatsApp messages will be logged but not sent");
            return Ok(Self {
                account_sid: "ACtest".to_string(),
                auth_token: "test".to_string(),
                from_number: "whatsapp:+10000000000".to_string(),
                http: Client::new(),
                test_mode,
            });
        }

        Ok(Self {
            account_sid: required_env("TWILIO_ACCOUNT_SID")?,
            auth_token: required_env("TWILIO_AUTH_TOKEN")?,
            from_number: required_env("TWILIO_WHATSAPP_NUMBER")?,
            http: Client::new(),
            test_mode,
        })
    }

    fn api_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

fn required_env(name: &str) -> Result<String, NotifyError> {
    env::var(name).map_err(|_| NotifyError::Configuration(name.to_string()))
}

#[async_trait]
impl Notifier for WhatsAppConfig {
    async fn send_welcome(&self, phone: &str, first_name: &str) -> Result<(), NotifyError> {
        let to = whatsapp_destination(phone);
        let body = welcome_message(first_name);

        if self.test_mode {
            info!(to = %to, body = %body, "TEST_MODE: skipping WhatsApp send");
            NOTIFICATIONS.with_label_values(&["skipped"]).inc();
            return Ok(());
        }

        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("From", self.from_number.clone());
        form.insert("To", to.clone());
        form.insert("Body", body);

        let response = self
            .http
            .post(self.api_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                NOTIFICATIONS.with_label_values(&["failure"]).inc();
                NotifyError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %error_body, "Twilio rejected WhatsApp message");
            NOTIFICATIONS.with_label_values(&["failure"]).inc();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body: error_body,
            });
        }

        info!(to = %to, "WhatsApp welcome message sent");
        NOTIFICATIONS.with_label_values(&["success"]).inc();
        Ok(())
    }
}
