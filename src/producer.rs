//! NATS replies for detection results

use crate::error::DetectError;
use crate::pipeline::Detection;
use anyhow::Result;
use async_nats::{Client, Message};
use serde::Serialize;
use tracing::{debug, warn};

/// Error body returned for structurally invalid requests
#[derive(Debug, Serialize)]
pub struct ErrorReply<'a> {
    pub error: &'static str,
    pub message: &'a str,
}

/// Sends replies to the requester's reply inbox
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
}

impl ResultProducer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Reply with a result or the disabled body
    pub async fn reply(&self, message: &Message, detection: &Detection) -> Result<()> {
        let payload = detection.to_json()?;
        self.send(message, payload).await?;

        if let Some(result) = detection.result() {
            debug!(
                request_id = %result.request_id,
                fraud_score = result.fraud_score,
                model_used = %result.model_used,
                "Replied with fraud result"
            );
        }
        Ok(())
    }

    /// Reply with an error body
    pub async fn reply_error(&self, message: &Message, error: &DetectError) -> Result<()> {
        let text = error.to_string();
        let payload = error_body(error, &text)?;
        self.send(message, payload).await
    }

    async fn send(&self, message: &Message, payload: Vec<u8>) -> Result<()> {
        let Some(reply) = message.reply.clone() else {
            warn!(subject = %message.subject, "Request has no reply inbox, dropping response");
            return Ok(());
        };
        self.client.publish(reply, payload.into()).await?;
        Ok(())
    }
}

fn error_body(error: &DetectError, text: &str) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&ErrorReply {
        error: error.kind(),
        message: text,
    })
}

#[cfg(test)]
mod tests {
    // Publishing tests would require a running NATS server
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let err = DetectError::MissingField("sector");
        let text = err.to_string();
        let body: serde_json::Value = serde_json::from_slice(&error_body(&err, &text).unwrap()).unwrap();
        assert_eq!(body["error"], "missing_field");
        assert!(body["message"].as_str().unwrap().contains("sector"));
    }
}
