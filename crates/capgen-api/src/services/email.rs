//! Fire-and-forget email dispatch.
//!
//! Sends go through an HTTP email provider and never block the request
//! path: each send is a spawned task gated by a small concurrency limit,
//! and failures are logged, not surfaced. No ordering guarantee between
//! queued emails.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use capgen_models::OtpKind;

/// Concurrent in-flight sends.
const MAX_CONCURRENT_SENDS: usize = 5;

/// Per-send timeout.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Mailer configuration.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Provider endpoint; unset disables delivery (codes still work, useful
    /// in development)
    pub api_url: Option<String>,
    /// Bearer key for the provider
    pub api_key: String,
    /// From address
    pub from_address: String,
}

impl MailerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("EMAIL_API_URL").ok(),
            api_key: std::env::var("EMAIL_API_KEY").unwrap_or_default(),
            from_address: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@capgen.app".to_string()),
        }
    }
}

/// Background email dispatcher.
#[derive(Clone)]
pub struct Mailer {
    http: Client,
    config: MailerConfig,
    permits: Arc<Semaphore>,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            http,
            config,
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_SENDS)),
        })
    }

    pub fn from_env() -> Result<Self, reqwest::Error> {
        Self::new(MailerConfig::from_env())
    }

    /// Queue a send; returns immediately.
    fn dispatch(&self, to: String, subject: String, html: String) {
        let Some(api_url) = self.config.api_url.clone() else {
            debug!(to = %to, subject = %subject, "Email delivery disabled, skipping send");
            return;
        };

        let http = self.http.clone();
        let config = self.config.clone();
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let body = json!({
                "from": config.from_address,
                "to": [to],
                "subject": subject,
                "html": html,
            });

            match http
                .post(&api_url)
                .bearer_auth(&config.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(subject = %subject, "Email dispatched");
                }
                Ok(response) => {
                    warn!(subject = %subject, status = %response.status(), "Email delivery failed");
                }
                Err(e) => {
                    warn!(subject = %subject, error = %e, "Email delivery failed");
                }
            }
        });
    }

    /// Send an OTP code.
    pub fn send_otp_email(
        &self,
        to: &str,
        full_name: &str,
        kind: OtpKind,
        code: &str,
        expiry_minutes: i64,
    ) {
        let subject = match kind {
            OtpKind::Registration => "Your Registration OTP",
            OtpKind::Signin => "Your Sign-in OTP",
            OtpKind::PasswordReset => "Your Password Reset OTP",
        };

        let html = format!(
            "<p>Hi {full_name},</p>\
             <p>Your verification code is:</p>\
             <h2 style=\"letter-spacing: 4px\">{code}</h2>\
             <p>This code expires in {expiry_minutes} minutes. If you did not request it, \
             you can safely ignore this email.</p>"
        );

        self.dispatch(to.to_string(), subject.to_string(), html);
    }

    /// Send the post-registration welcome email.
    pub fn send_welcome_email(&self, to: &str, full_name: &str) {
        let html = format!(
            "<p>Hi {full_name},</p>\
             <p>Welcome aboard! Your account is verified and ready. Add your first \
             client and upload a file to generate content.</p>"
        );
        self.dispatch(to.to_string(), "Welcome to Capgen".to_string(), html);
    }

    /// Confirm a completed password reset.
    pub fn send_password_reset_success_email(&self, to: &str, full_name: &str) {
        let html = format!(
            "<p>Hi {full_name},</p>\
             <p>Your password was changed successfully. If this wasn't you, reset your \
             password immediately.</p>"
        );
        self.dispatch(to.to_string(), "Your password was changed".to_string(), html);
    }
}
