//! NATS message producer for verdict envelopes

use crate::types::verdict::VerdictEnvelope;
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Producer for publishing verdicts to NATS
#[derive(Clone)]
pub struct VerdictProducer {
    client: Client,
    subject: String,
}

impl VerdictProducer {
    /// Create a new verdict producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish one verdict envelope
    pub async fn publish(&self, envelope: &VerdictEnvelope) -> Result<()> {
        let payload = serde_json::to_vec(envelope)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        match envelope {
            VerdictEnvelope::Completed { verdict } => debug!(
                request_id = %verdict.request_id,
                beneficiary_id = %verdict.beneficiary_id,
                risk_score = verdict.summary.risk_score,
                "Published verdict"
            ),
            VerdictEnvelope::Aborted { beneficiary_id, reason } => debug!(
                beneficiary_id = beneficiary_id.as_deref().unwrap_or("<unknown>"),
                reason = %reason,
                "Published abort"
            ),
        }

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
