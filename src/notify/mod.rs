pub mod smtp;

pub use smtp::SmtpNotifier;

use crate::core::Notifier;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub subject: String,
    pub body: String,
}

/// Keeps sent messages in memory instead of delivering them.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("mail server rejected the message"));
        }
        self.sent.lock().await.push(SentMessage {
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
