//! Anomaly scoring over registration covariates.

use super::Stage;
use crate::types::case::PipelineRequest;
use crate::types::verdict::{FailureKind, StageOutcome, StageReport};
use async_trait::async_trait;
use tracing::debug;

/// Annual income above which scheme eligibility becomes doubtful.
const INCOME_CEILING: f64 = 120_000.0;

// Covariate weights of the scoring function.
const W_INCOME: f64 = 0.25;
const W_REGISTRATIONS: f64 = 0.20;
const W_BANK: f64 = 0.30;
const W_PHONE: f64 = 0.25;

/// Flags registrations whose covariates deviate from the profile of a
/// legitimate single-household beneficiary.
pub struct AnomalyStage {
    threshold: f64,
}

impl AnomalyStage {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn validate(request: &PipelineRequest) -> Result<(), String> {
        if !request.annual_income.is_finite() || request.annual_income < 0.0 {
            return Err("Invalid annual_income".to_string());
        }
        if !(1..=10).contains(&request.registrations_per_identity) {
            return Err("Invalid registrations_per_identity (1-10)".to_string());
        }
        if !(1..=15).contains(&request.bank_shared_count) {
            return Err("Invalid bank_shared_count (1-15)".to_string());
        }
        if !(1..=15).contains(&request.phone_shared_count) {
            return Err("Invalid phone_shared_count (1-15)".to_string());
        }
        Ok(())
    }

    /// Deviation score in [0, 1] over the four covariates.
    fn decision_score(request: &PipelineRequest) -> f64 {
        let income_factor = if request.annual_income > INCOME_CEILING {
            (request.annual_income / INCOME_CEILING - 1.0).min(1.0)
        } else {
            0.0
        };
        let registration_factor = (request.registrations_per_identity - 1) as f64 / 9.0;
        let bank_factor = (request.bank_shared_count - 1) as f64 / 14.0;
        let phone_factor = (request.phone_shared_count - 1) as f64 / 14.0;

        (W_INCOME * income_factor
            + W_REGISTRATIONS * registration_factor
            + W_BANK * bank_factor
            + W_PHONE * phone_factor)
            .clamp(0.0, 1.0)
    }
}

impl Default for AnomalyStage {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl Stage for AnomalyStage {
    fn name(&self) -> &'static str {
        "anomaly"
    }

    async fn score(&self, request: &PipelineRequest) -> StageOutcome {
        if let Err(message) = Self::validate(request) {
            return StageOutcome::failed(FailureKind::Validation, message);
        }

        let risk_score = Self::decision_score(request);
        let flagged = risk_score >= self.threshold;
        let details = if flagged {
            vec![
                "Possible reasons:".to_string(),
                "- Duplicate identity registrations".to_string(),
                "- Shared bank account among many beneficiaries".to_string(),
                "- Shared phone number indicating collusion".to_string(),
                "- Income inconsistent with scheme eligibility".to_string(),
            ]
        } else {
            vec!["No strong anomaly patterns detected.".to_string()]
        };

        debug!(
            request_id = %request.request_id,
            risk_score,
            flagged,
            "anomaly stage scored"
        );

        StageOutcome::ok(StageReport::Anomaly {
            risk_score,
            flagged,
            details,
        })
    }
}
