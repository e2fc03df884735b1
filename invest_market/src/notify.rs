use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::info;

use crate::user::model::UserView;

/// Outbound message sink. Built once at startup and shared.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome(&self, user: &UserView) -> Result<()>;

    async fn send_reset_code(&self, email: &str, code: &str, ttl_minutes: i64) -> Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_welcome(&self, user: &UserView) -> Result<()> {
        info!(email = %user.email, "welcome notification for {}", user.first_name);
        Ok(())
    }

    async fn send_reset_code(&self, email: &str, code: &str, ttl_minutes: i64) -> Result<()> {
        info!(
            email,
            ttl_minutes, "password reset code {} issued", code
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Welcome { email: String },
    ResetCode { email: String, code: String },
}

/// Keeps sent messages in memory; can be switched to fail every send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_reset_code(&self, email: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|n| match n {
            Notification::ResetCode { email: to, code } if to == email => Some(code),
            _ => None,
        })
    }

    fn record(&self, notification: Notification) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("notification transport unavailable"));
        }
        self.sent
            .lock()
            .map_err(|_| anyhow!("notification log poisoned"))?
            .push(notification);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_welcome(&self, user: &UserView) -> Result<()> {
        self.record(Notification::Welcome {
            email: user.email.clone(),
        })
    }

    async fn send_reset_code(&self, email: &str, code: &str, _ttl_minutes: i64) -> Result<()> {
        self.record(Notification::ResetCode {
            email: email.to_string(),
            code: code.to_string(),
        })
    }
}
