//! Outgoing account mail
//!
//! Delivery is pluggable. The default mailer only writes the message to the
//! log, which is enough for development and for operators relaying links.

use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        info!(to, subject, body, "Outgoing mail");
        Ok(())
    }
}
