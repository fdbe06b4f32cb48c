//! Outbound SMS notification
//!
//! [`NotificationDispatcher`] turns a completed conversation into exactly one
//! send attempt. The HTTP relay transport is fire-and-forget: the request runs
//! on a spawned task bounded by the configured timeout, and its outcome is only
//! logged.

use crate::config::{mask_number, Config};
use crate::directory::{Address, Directory};
use crate::error::{Error, Result};
use crate::state::ConversationState;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How far a send got before control returned to the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Handed to a background task; delivery is not confirmed
    Queued,
    /// Accepted synchronously by the transport
    Accepted,
}

/// The "send text message" seam
pub trait SmsTransport: Send + Sync {
    fn send_text(&self, to: &Address, message: &str) -> Result<Ack>;
}

/// Form-POSTs `number` and `message` to an SMS relay
pub struct TextbeltTransport {
    client: reqwest::Client,
    relay_url: reqwest::Url,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl TextbeltTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let relay_url = reqwest::Url::parse(&config.relay_url)
            .map_err(|e| Error::Config(format!("relay URL {}: {}", config.relay_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.send_timeout)
            .build()?;

        Ok(Self {
            client,
            relay_url,
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Number of sends whose task has not finished
    pub fn in_flight(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every spawned send to finish (used before process exit)
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending)
        };

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("SMS send task did not complete: {}", e);
            }
        }
    }
}

impl SmsTransport for TextbeltTransport {
    fn send_text(&self, to: &Address, message: &str) -> Result<Ack> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Transport(format!("no async runtime for send: {}", e)))?;

        let request = self
            .client
            .post(self.relay_url.clone())
            .form(&[("number", to.as_str()), ("message", message)]);
        let masked = mask_number(to.as_str());

        debug!(to = %masked, "Queueing SMS send");
        let task = runtime.spawn(async move {
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if status.is_success() {
                        info!(to = %masked, %status, body = %body, "SMS relay response");
                    } else {
                        warn!(to = %masked, %status, body = %body, "SMS relay rejected message");
                    }
                }
                Err(e) if e.is_timeout() => {
                    error!(to = %masked, "SMS relay request timed out: {}", e);
                }
                Err(e) => {
                    error!(to = %masked, "SMS relay request failed: {}", e);
                }
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(task);

        Ok(Ack::Queued)
    }
}

/// Records sends instead of performing them
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Address, String)>>,
    fail_with: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every send fails with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<(Address, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SmsTransport for RecordingTransport {
    fn send_text(&self, to: &Address, message: &str) -> Result<Ack> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((to.clone(), message.to_string()));

        match &self.fail_with {
            Some(reason) => Err(Error::Transport(reason.clone())),
            None => Ok(Ack::Accepted),
        }
    }
}

/// Resolves the recipient and issues the single send for a finished conversation
#[derive(Clone)]
pub struct NotificationDispatcher {
    directory: Directory,
    transport: Arc<dyn SmsTransport>,
}

impl NotificationDispatcher {
    pub fn new(directory: Directory, transport: Arc<dyn SmsTransport>) -> Self {
        Self {
            directory,
            transport,
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Send `state.message` signed with `state.from` to the number for `state.to`
    pub fn deliver(&self, state: &ConversationState) -> Result<Ack> {
        let to = state.to.as_deref().ok_or(Error::MissingField("recipient"))?;
        let from = state.from.as_deref().ok_or(Error::MissingField("sender"))?;
        let message = state.message.as_deref().ok_or(Error::MissingField("message"))?;

        let address = self.directory.resolve(to)?;
        self.send(address, &compose_body(message, from))
    }

    /// One send attempt, no retry
    pub fn send(&self, address: &Address, body: &str) -> Result<Ack> {
        info!(to = %mask_number(address.as_str()), "Dispatching SMS");
        self.transport.send_text(address, body)
    }
}

/// Message text followed by the sender's name on its own line
pub fn compose_body(message: &str, from: &str) -> String {
    format!("{}\n{}", message, from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn dispatcher(transport: Arc<RecordingTransport>) -> NotificationDispatcher {
        NotificationDispatcher::new(Directory::new("6175550101", "6175550102"), transport)
    }

    fn complete_state(to: &str) -> ConversationState {
        ConversationState::with_recipients(to, "Alex")
            .merge(&ConversationState::with_message("Running late"))
    }

    #[test]
    fn test_compose_body() {
        assert_eq!(compose_body("Running late", "Alex"), "Running late\nAlex");
    }

    #[test]
    fn test_deliver_sends_once() {
        let transport = Arc::new(RecordingTransport::new());
        let ack = dispatcher(transport.clone()).deliver(&complete_state("Mom")).unwrap();

        assert_eq!(ack, Ack::Accepted);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.as_str(), "+16175550101");
        assert_eq!(sent[0].1, "Running late\nAlex");
    }

    #[test]
    fn test_deliver_unknown_recipient_skips_transport() {
        let transport = Arc::new(RecordingTransport::new());
        let err = dispatcher(transport.clone())
            .deliver(&complete_state("Uncle Bob"))
            .unwrap_err();

        assert!(matches!(err, Error::RecipientNotFound { .. }));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_deliver_incomplete_state() {
        let transport = Arc::new(RecordingTransport::new());
        let err = dispatcher(transport.clone())
            .deliver(&ConversationState::with_message("hi"))
            .unwrap_err();

        assert!(matches!(err, Error::MissingField("recipient")));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let transport = Arc::new(RecordingTransport::failing("relay unavailable"));
        let err = dispatcher(transport.clone()).deliver(&complete_state("Dad")).unwrap_err();

        assert!(matches!(err, Error::Transport(ref m) if m == "relay unavailable"));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_textbelt_rejects_bad_url() {
        let mut config = Config::for_test();
        config.relay_url = "not a url".to_string();
        assert!(matches!(TextbeltTransport::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_textbelt_without_runtime() {
        let transport = TextbeltTransport::new(&Config::for_test()).unwrap();
        let err = transport
            .send_text(&Address::new("6175550101"), "hi")
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_textbelt_posts_form() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            // Read until the form body has arrived
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if text.contains("message=") && text.contains("Alex") {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 16\r\nconnection: close\r\n\r\n{\"success\":true}")
                .await
                .unwrap();
            String::from_utf8_lossy(&received).to_string()
        });

        let mut config = Config::for_test();
        config.relay_url = format!("http://127.0.0.1:{}/text", port);
        config.send_timeout = Duration::from_secs(5);
        let transport = TextbeltTransport::new(&config).unwrap();

        let ack = transport
            .send_text(&Address::new("6175550101"), "Running late\nAlex")
            .unwrap();
        assert_eq!(ack, Ack::Queued);

        transport.drain().await;
        assert_eq!(transport.in_flight(), 0);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /text"));
        assert!(request.contains("application/x-www-form-urlencoded"));
        assert!(request.contains("number=%2B16175550101"));
        assert!(request.contains("message=Running+late%0AAlex"));
    }
}
