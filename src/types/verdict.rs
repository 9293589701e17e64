//! Stage outcomes and aggregated pipeline verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from score and thresholds
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Configurable risk level thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.5,
            high: 0.7,
            critical: 0.9,
        }
    }
}

/// Failure classes a scoring stage may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed input; aborts the whole request
    Validation,
    /// Subject absent from a backing store; soft-failed with a neutral default
    NotFound,
    /// Unexpected failure inside the stage; recorded without aborting siblings
    Internal,
}

/// Stage-specific success payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageReport {
    Anomaly {
        risk_score: f64,
        flagged: bool,
        details: Vec<String>,
    },
    Duplicate {
        risk_score: f64,
        flagged: bool,
        identity_count: u32,
        phone_count: u32,
        bank_count: u32,
        household_size: u32,
    },
    Network {
        risk_score: f64,
        in_network: bool,
        component_size: usize,
        ring_detected: bool,
        degree_centrality: f64,
        hub_detected: bool,
    },
}

impl StageReport {
    /// Risk contribution of this stage in [0, 1].
    pub fn risk_score(&self) -> f64 {
        match self {
            StageReport::Anomaly { risk_score, .. }
            | StageReport::Duplicate { risk_score, .. }
            | StageReport::Network { risk_score, .. } => *risk_score,
        }
    }
}

/// Result of one scoring stage: a success payload or a tagged failure,
/// never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Ok { report: StageReport },
    Failed { kind: FailureKind, message: String },
}

impl StageOutcome {
    pub fn ok(report: StageReport) -> Self {
        StageOutcome::Ok { report }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        StageOutcome::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StageOutcome::Ok { .. })
    }

    pub fn report(&self) -> Option<&StageReport> {
        match self {
            StageOutcome::Ok { report } => Some(report),
            StageOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            StageOutcome::Ok { .. } => None,
            StageOutcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// Terminal status of a successfully orchestrated request. Hard aborts are
/// reported through `PipelineError` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Aggregated,
}

/// Derived summary fields lifted out of the stage reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictSummary {
    /// Weighted aggregate of successful stage scores (0.0 - 1.0)
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub ring_detected: bool,
    pub hub_detected: bool,
    pub component_size: usize,
}

/// Aggregated verdict for one case, keyed by stage name.
///
/// The key set is always the full fixed set of configured stages, regardless
/// of which stages succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub request_id: String,
    pub beneficiary_id: String,
    pub status: PipelineStatus,
    pub stages: BTreeMap<String, StageOutcome>,
    pub summary: VerdictSummary,
    pub timestamp: DateTime<Utc>,
}

/// Wire envelope published per case: either a complete verdict or one
/// top-level abort reason, never a partial result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerdictEnvelope {
    Completed {
        verdict: PipelineResult,
    },
    Aborted {
        beneficiary_id: Option<String>,
        reason: String,
    },
}
