//! NATS subscriptions for detection requests and kill-switch commands

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes to the request and control subjects
pub struct RequestConsumer {
    client: Client,
    request_subject: String,
    control_subject: String,
}

impl RequestConsumer {
    pub fn new(client: Client, request_subject: &str, control_subject: &str) -> Self {
        Self {
            client,
            request_subject: request_subject.to_string(),
            control_subject: control_subject.to_string(),
        }
    }

    /// Subscribe to detection requests
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.request_subject.clone()).await?;
        info!(subject = %self.request_subject, "Subscribed to request subject");
        Ok(subscriber)
    }

    /// Subscribe to kill-switch commands
    pub async fn subscribe_control(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.control_subject.clone()).await?;
        info!(subject = %self.control_subject, "Subscribed to control subject");
        Ok(subscriber)
    }

    pub fn request_subject(&self) -> &str {
        &self.request_subject
    }
}

/// Parse a kill-switch command payload. `Some(true)` engages the switch.
pub fn parse_control_command(payload: &[u8]) -> Option<bool> {
    let command = std::str::from_utf8(payload).ok()?.trim().to_ascii_lowercase();
    match command.as_str() {
        "on" | "engage" | "disable" | "true" => Some(true),
        "off" | "release" | "enable" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    // Subscription tests would require a running NATS server
    use super::*;

    #[test]
    fn test_parse_control_command() {
        assert_eq!(parse_control_command(b"on"), Some(true));
        assert_eq!(parse_control_command(b" OFF\n"), Some(false));
        assert_eq!(parse_control_command(b"disable"), Some(true));
        assert_eq!(parse_control_command(b"maybe"), None);
        assert_eq!(parse_control_command(&[0xff, 0xfe]), None);
    }
}
