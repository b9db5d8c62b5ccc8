use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::GlobalSettings;

/// Minimum seconds between alerts for the same target.
pub const ALERT_COOLDOWN_SECS: i64 = 600;

/// Last-alert timestamps per target, guarded by a lock so cycle evaluation
/// could be parallelized later without changing this type. Holds at most one
/// timestamp per target; never persisted across restarts.
#[derive(Default)]
pub struct AlertLedger {
    last_sent: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AlertLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no alert was recorded for `target_name` within the
    /// preceding cooldown window. `now` is passed in rather than read from
    /// the clock so the window logic stays testable.
    pub async fn should_alert(&self, target_name: &str, now: DateTime<Utc>) -> bool {
        let ledger = self.last_sent.lock().await;
        match ledger.get(target_name) {
            Some(last) => (now - *last).num_seconds() >= ALERT_COOLDOWN_SECS,
            None => true,
        }
    }

    /// Called only after a successful dispatch; a failed send leaves the
    /// ledger untouched so the next cycle may retry immediately.
    pub async fn record_sent(&self, target_name: &str, now: DateTime<Utc>) {
        self.last_sent
            .lock()
            .await
            .insert(target_name.to_string(), now);
    }
}

/// STARTTLS SMTP transport for alert emails. Treated as fire-and-forget by
/// the engine: the only signal back is whether the send went through.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl Mailer {
    pub fn new(settings: &GlobalSettings) -> Result<Self> {
        let server = settings
            .smtp_server
            .as_deref()
            .context("smtp_server is not configured")?;
        let sender = settings
            .sender_email
            .clone()
            .context("sender_email is not configured")?;
        let password = settings
            .sender_password
            .clone()
            .context("sender_password is not configured")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .context("invalid SMTP server address")?
            .port(settings.smtp_port.unwrap_or(587))
            .credentials(Credentials::new(sender.clone(), password))
            .build();

        Ok(Self { transport, sender })
    }

    pub async fn send(&self, subject: &str, body: &str, recipients: &[String]) -> bool {
        if recipients.is_empty() {
            return false;
        }

        let from = match self.sender.parse() {
            Ok(mailbox) => mailbox,
            Err(err) => {
                warn!("Sender address {:?} is invalid: {err}", self.sender);
                return false;
            }
        };

        let mut builder = Message::builder()
            .from(from)
            .subject(format!("[site monitor alert] {subject}"))
            .header(ContentType::TEXT_PLAIN);
        for recipient in recipients {
            match recipient.parse() {
                Ok(mailbox) => builder = builder.to(mailbox),
                Err(err) => warn!("Skipping invalid recipient {recipient:?}: {err}"),
            }
        }

        let message = match builder.body(body.to_string()) {
            Ok(message) => message,
            Err(err) => {
                warn!("Failed to build alert email: {err}");
                return false;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Alert email sent to {recipients:?}");
                true
            }
            Err(err) => {
                warn!("Failed to send alert email: {err}");
                false
            }
        }
    }
}
