//! Duplicate registration detection via record linkage counts.

use super::Stage;
use crate::store::RecordStore;
use crate::types::case::PipelineRequest;
use crate::types::verdict::{FailureKind, StageOutcome, StageReport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

// Risk load per excess share of each linked value.
const W_IDENTITY: f64 = 1.2;
const W_PHONE: f64 = 0.5;
const W_BANK: f64 = 0.6;
const W_HOUSEHOLD: f64 = 0.25;

/// Households above this size start contributing duplicate risk.
const HOUSEHOLD_BASELINE: u32 = 4;

/// Scores how strongly a case's identifying values are already present in the
/// record store.
pub struct DuplicateStage {
    store: Arc<RecordStore>,
    threshold: f64,
}

impl DuplicateStage {
    pub fn new(store: Arc<RecordStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    fn validate(request: &PipelineRequest) -> Result<(), String> {
        if request.identity_number.trim().is_empty() {
            return Err("Invalid identity_number".to_string());
        }
        if request.phone_number.trim().is_empty() {
            return Err("Invalid phone_number".to_string());
        }
        if request.bank_account.trim().is_empty() {
            return Err("Invalid bank_account".to_string());
        }
        if request.household_id.trim().is_empty() {
            return Err("Invalid household_id".to_string());
        }
        Ok(())
    }

    /// Saturating risk: 1 - e^-load, monotone in every linkage count.
    fn risk_from_load(load: f64) -> f64 {
        1.0 - (-load).exp()
    }
}

#[async_trait]
impl Stage for DuplicateStage {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    async fn score(&self, request: &PipelineRequest) -> StageOutcome {
        if let Err(message) = Self::validate(request) {
            return StageOutcome::failed(FailureKind::Validation, message);
        }

        let identity_count = self.store.identity_count(&request.identity_number);
        let phone_count = self.store.phone_count(&request.phone_number);
        let bank_count = self.store.bank_count(&request.bank_account);
        let household_size = self.store.household_size(&request.household_id);

        let load = W_IDENTITY * identity_count.saturating_sub(1) as f64
            + W_PHONE * phone_count.saturating_sub(1) as f64
            + W_BANK * bank_count.saturating_sub(1) as f64
            + W_HOUSEHOLD * household_size.saturating_sub(HOUSEHOLD_BASELINE) as f64;
        let risk_score = Self::risk_from_load(load);
        let flagged = risk_score >= self.threshold;

        debug!(
            request_id = %request.request_id,
            identity_count,
            phone_count,
            bank_count,
            household_size,
            risk_score,
            "duplicate stage scored"
        );

        StageOutcome::ok(StageReport::Duplicate {
            risk_score,
            flagged,
            identity_count,
            phone_count,
            bank_count,
            household_size,
        })
    }
}
