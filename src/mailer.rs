use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to send mail to {to}: {reason}")]
pub struct MailError {
    pub to: String,
    pub reason: String,
}

/// Mailer
///
/// Outgoing mail contract. Handlers depend on this trait only, so the transport can
/// be swapped (logging sink locally, recording mock in tests) without touching them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// LogMailer
///
/// Writes every message to the log instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        // Bodies carry reset tokens, so they stay out of the default log level.
        tracing::info!(from = %self.from, %to, %subject, "mail queued");
        tracing::debug!(%to, %body, "mail body");
        Ok(())
    }
}

/// A message captured by `MockMailer`.
#[derive(Clone, Debug, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// MockMailer
///
/// Records messages in memory for assertions. `new_failing` simulates a broken transport.
#[derive(Clone, Default)]
pub struct MockMailer {
    pub should_fail: bool,
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.should_fail {
            return Err(MailError {
                to: to.to_string(),
                reason: "Mock Mailer Error: Simulation requested".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }
}

/// The concrete type used to share the mailer across the application state.
pub type MailerState = Arc<dyn Mailer>;
