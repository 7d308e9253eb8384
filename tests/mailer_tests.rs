use blade_admin::{
    LogMailer, MockMailer,
    mailer::{MailError, Mailer},
};
use std::{
    io,
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;

// --- Log capture ---

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

async fn send_logged(level: LevelFilter, body: &str) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let _guard = tracing::subscriber::set_default(subscriber);
    LogMailer::new("blade@localhost")
        .send("alice@example.com", "Reset password", body)
        .await
        .unwrap();
    captured.text()
}

// --- Tests ---

#[tokio::test]
async fn test_log_mailer_keeps_body_out_of_info_logs() {
    let body = "Reset password link: http://localhost/reset-password/secret-token";
    let logs = send_logged(LevelFilter::INFO, body).await;

    assert!(logs.contains("alice@example.com"));
    assert!(logs.contains("Reset password"));
    assert!(!logs.contains("secret-token"));
}

#[tokio::test]
async fn test_log_mailer_writes_body_at_debug() {
    let logs = send_logged(LevelFilter::DEBUG, "token secret-token").await;
    assert!(logs.contains("secret-token"));
}

#[tokio::test]
async fn test_mock_mailer_records_and_fails() {
    let mailer = MockMailer::new();
    mailer.send("bob@example.com", "Hi", "body").await.unwrap();
    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(mailer.sent()[0].to, "bob@example.com");

    let broken = MockMailer::new_failing();
    let err: MailError = broken.send("bob@example.com", "Hi", "body").await.unwrap_err();
    assert_eq!(err.to, "bob@example.com");
    assert!(broken.sent().is_empty());
}
