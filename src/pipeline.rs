//! Concurrent multi-stage scoring orchestration.
//!
//! One request fans out to every configured stage at once, waits for all of
//! them, then aggregates. A validation rejection from any stage aborts the
//! request immediately; dropping the task set cancels the still-running
//! siblings. Any other stage failure degrades into the verdict instead.

use crate::aggregator::ScoreAggregator;
use crate::error::PipelineError;
use crate::stages::Stage;
use crate::types::case::{CaseInput, PipelineRequest};
use crate::types::verdict::{
    FailureKind, PipelineResult, PipelineStatus, RiskLevel, RiskLevelThresholds, StageOutcome,
    StageReport, VerdictSummary,
};
use chrono::Utc;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Orchestration phases, in order. Used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Normalizing,
    Scoring,
    Aggregating,
}

/// Runs the fixed set of scoring stages concurrently per request and folds
/// their outcomes into one verdict.
pub struct PipelineOrchestrator {
    stages: Vec<Arc<dyn Stage>>,
    aggregator: ScoreAggregator,
    risk_levels: RiskLevelThresholds,
    stage_timeout: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        stages: Vec<Arc<dyn Stage>>,
        aggregator: ScoreAggregator,
        risk_levels: RiskLevelThresholds,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            stages,
            aggregator,
            risk_levels,
            stage_timeout,
        }
    }

    /// Score one raw case end to end.
    ///
    /// `Err` means a hard abort with no verdict: malformed input, a stage
    /// validation rejection, or the loss of every stage. Everything else,
    /// including timeouts and panics inside individual stages, is recorded
    /// in the returned verdict.
    pub async fn run(&self, input: CaseInput) -> Result<PipelineResult, PipelineError> {
        debug!(state = ?PipelineState::Normalizing, "pipeline state");
        let request = Arc::new(PipelineRequest::normalize(input)?);

        debug!(
            state = ?PipelineState::Scoring,
            request_id = %request.request_id,
            stages = self.stages.len(),
            "pipeline state"
        );
        let mut tasks = JoinSet::new();
        for (slot, stage) in self.stages.iter().enumerate() {
            let stage = stage.clone();
            let request = request.clone();
            let stage_timeout = self.stage_timeout;
            tasks.spawn(async move {
                let scored = AssertUnwindSafe(timeout(stage_timeout, stage.score(&request)))
                    .catch_unwind()
                    .await;
                let outcome = match scored {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_)) => StageOutcome::failed(
                        FailureKind::Internal,
                        format!("stage timed out after {:?}", stage_timeout),
                    ),
                    Err(_) => StageOutcome::failed(FailureKind::Internal, "stage panicked"),
                };
                (slot, outcome)
            });
        }

        let mut outcomes: Vec<Option<StageOutcome>> = vec![None; self.stages.len()];
        while let Some(joined) = tasks.join_next().await {
            let (slot, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(request_id = %request.request_id, error = %e, "stage task lost");
                    continue;
                }
            };
            if let StageOutcome::Failed {
                kind: FailureKind::Validation,
                message,
            } = &outcome
            {
                // dropping the set aborts the remaining stage tasks
                return Err(PipelineError::StageValidation {
                    stage: self.stages[slot].name().to_string(),
                    message: message.clone(),
                });
            }
            outcomes[slot] = Some(outcome);
        }

        debug!(
            state = ?PipelineState::Aggregating,
            request_id = %request.request_id,
            "pipeline state"
        );
        self.aggregate(&request, outcomes)
    }

    fn aggregate(
        &self,
        request: &PipelineRequest,
        outcomes: Vec<Option<StageOutcome>>,
    ) -> Result<PipelineResult, PipelineError> {
        let mut stages: BTreeMap<String, StageOutcome> = BTreeMap::new();
        for (stage, outcome) in self.stages.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                StageOutcome::failed(FailureKind::Internal, "stage task lost")
            });
            // an absent subject is soft-failed with the stage's neutral result
            // when it has one
            let outcome = match (&outcome, stage.neutral_report()) {
                (
                    StageOutcome::Failed {
                        kind: FailureKind::NotFound,
                        message,
                    },
                    Some(neutral),
                ) => {
                    debug!(
                        request_id = %request.request_id,
                        stage = stage.name(),
                        reason = %message,
                        "substituting neutral stage result"
                    );
                    StageOutcome::ok(neutral)
                }
                _ => outcome,
            };
            stages.insert(stage.name().to_string(), outcome);
        }

        let scores: BTreeMap<String, f64> = stages
            .iter()
            .filter_map(|(name, outcome)| {
                outcome.report().map(|r| (name.clone(), r.risk_score()))
            })
            .collect();
        if scores.is_empty() {
            return Err(PipelineError::AllStagesFailed);
        }

        let risk_score = self.aggregator.aggregate(&scores);
        let (ring_detected, hub_detected, component_size) = stages
            .values()
            .filter_map(StageOutcome::report)
            .find_map(|report| match report {
                StageReport::Network {
                    ring_detected,
                    hub_detected,
                    component_size,
                    ..
                } => Some((*ring_detected, *hub_detected, *component_size)),
                _ => None,
            })
            .unwrap_or((false, false, 0));

        Ok(PipelineResult {
            request_id: request.request_id.clone(),
            beneficiary_id: request.beneficiary_id.clone(),
            status: PipelineStatus::Aggregated,
            stages,
            summary: VerdictSummary {
                risk_score,
                risk_level: RiskLevel::from_score(risk_score, &self.risk_levels),
                ring_detected,
                hub_detected,
                component_size,
            },
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedStage {
        name: &'static str,
        outcome: StageOutcome,
        neutral: Option<StageReport>,
    }

    impl FixedStage {
        fn scoring(name: &'static str, risk_score: f64) -> Self {
            Self {
                name,
                outcome: StageOutcome::ok(StageReport::Anomaly {
                    risk_score,
                    flagged: false,
                    details: vec![],
                }),
                neutral: None,
            }
        }

        fn failing(name: &'static str, kind: FailureKind) -> Self {
            Self {
                name,
                outcome: StageOutcome::failed(kind, "injected"),
                neutral: None,
            }
        }
    }

    #[async_trait]
    impl Stage for FixedStage {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn score(&self, _request: &PipelineRequest) -> StageOutcome {
            self.outcome.clone()
        }

        fn neutral_report(&self) -> Option<StageReport> {
            self.neutral.clone()
        }
    }

    struct PanickingStage;

    #[async_trait]
    impl Stage for PanickingStage {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn score(&self, _request: &PipelineRequest) -> StageOutcome {
            panic!("injected panic")
        }
    }

    /// Sleeps, then records that its work ran to completion. A cancelled
    /// invocation never sets the flag.
    struct SlowRecordingStage {
        delay: Duration,
        completed: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl Stage for SlowRecordingStage {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn score(&self, _request: &PipelineRequest) -> StageOutcome {
            tokio::time::sleep(self.delay).await;
            self.completed
                .store(true, std::sync::atomic::Ordering::SeqCst);
            StageOutcome::ok(StageReport::Anomaly {
                risk_score: 0.1,
                flagged: false,
                details: vec![],
            })
        }
    }

    struct HangingStage;

    #[async_trait]
    impl Stage for HangingStage {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn score(&self, _request: &PipelineRequest) -> StageOutcome {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StageOutcome::failed(FailureKind::Internal, "unreachable")
        }
    }

    fn orchestrator(stages: Vec<Arc<dyn Stage>>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            stages,
            ScoreAggregator::equal_weights(),
            RiskLevelThresholds::default(),
            Duration::from_millis(200),
        )
    }

    fn case(id: &str) -> CaseInput {
        CaseInput {
            beneficiary_id: Some(id.to_string()),
            ..CaseInput::default()
        }
    }

    #[tokio::test]
    async fn test_all_stages_reported_and_aggregated() {
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::scoring("alpha", 0.2)),
            Arc::new(FixedStage::scoring("beta", 0.8)),
        ]);

        let result = orchestrator.run(case("BEN0001")).await.unwrap();

        assert_eq!(result.beneficiary_id, "BEN0001");
        assert_eq!(result.stages.len(), 2);
        assert!(result.stages.contains_key("alpha"));
        assert!(result.stages.contains_key("beta"));
        assert!((result.summary.risk_score - 0.5).abs() < 0.01);
        assert_eq!(result.summary.risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_missing_input_aborts() {
        let orchestrator = orchestrator(vec![Arc::new(FixedStage::scoring("alpha", 0.2))]);
        let err = orchestrator.run(CaseInput::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_validation_failure_aborts_whole_request() {
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::scoring("alpha", 0.2)),
            Arc::new(FixedStage::failing("strict", FailureKind::Validation)),
        ]);

        match orchestrator.run(case("BEN0002")).await {
            Err(PipelineError::StageValidation { stage, .. }) => assert_eq!(stage, "strict"),
            other => panic!("expected stage validation abort, got {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test]
    async fn test_validation_abort_cancels_sibling_stages() {
        let completed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::failing("strict", FailureKind::Validation)),
            Arc::new(SlowRecordingStage {
                delay: Duration::from_millis(100),
                completed: completed.clone(),
            }),
        ]);

        let err = orchestrator.run(case("BEN0010")).await.unwrap_err();
        assert!(matches!(err, PipelineError::StageValidation { .. }));

        // give the sibling ample time to finish if it was not aborted
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!completed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_caller_cancellation_discards_stage_work() {
        let completed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let orchestrator = orchestrator(vec![Arc::new(SlowRecordingStage {
            delay: Duration::from_millis(100),
            completed: completed.clone(),
        })]);

        // caller times out and drops the run future mid-flight
        let run = orchestrator.run(case("BEN0011"));
        assert!(tokio::time::timeout(Duration::from_millis(20), run)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!completed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_internal_failure_is_recorded_not_fatal() {
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::scoring("alpha", 0.6)),
            Arc::new(FixedStage::failing("broken", FailureKind::Internal)),
        ]);

        let result = orchestrator.run(case("BEN0003")).await.unwrap();

        assert_eq!(
            result.stages["broken"].failure_kind(),
            Some(FailureKind::Internal)
        );
        // aggregate over the surviving stage only
        assert!((result.summary.risk_score - 0.6).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_not_found_substitutes_neutral_result() {
        let neutral = StageReport::Network {
            risk_score: 0.0,
            in_network: false,
            component_size: 0,
            ring_detected: false,
            degree_centrality: 0.0,
            hub_detected: false,
        };
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::scoring("alpha", 0.8)),
            Arc::new(FixedStage {
                name: "network",
                outcome: StageOutcome::failed(FailureKind::NotFound, "BEN0004 unknown"),
                neutral: Some(neutral),
            }),
        ]);

        let result = orchestrator.run(case("BEN0004")).await.unwrap();

        assert!(result.stages["network"].is_ok());
        assert!(!result.summary.ring_detected);
        assert_eq!(result.summary.component_size, 0);
        // the neutral zero participates in the average
        assert!((result.summary.risk_score - 0.4).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_all_stages_failed_aborts() {
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::failing("one", FailureKind::Internal)),
            Arc::new(FixedStage::failing("two", FailureKind::Internal)),
        ]);

        let err = orchestrator.run(case("BEN0005")).await.unwrap_err();
        assert!(matches!(err, PipelineError::AllStagesFailed));
    }

    #[tokio::test]
    async fn test_panic_is_contained_as_internal_failure() {
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::scoring("alpha", 0.3)),
            Arc::new(PanickingStage),
        ]);

        let result = orchestrator.run(case("BEN0006")).await.unwrap();

        assert_eq!(
            result.stages["panicking"].failure_kind(),
            Some(FailureKind::Internal)
        );
        assert!(result.stages["alpha"].is_ok());
    }

    #[tokio::test]
    async fn test_slow_stage_times_out() {
        let orchestrator = orchestrator(vec![
            Arc::new(FixedStage::scoring("alpha", 0.3)),
            Arc::new(HangingStage),
        ]);

        let result = orchestrator.run(case("BEN0007")).await.unwrap();

        match &result.stages["hanging"] {
            StageOutcome::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::Internal);
                assert!(message.contains("timed out"));
            }
            StageOutcome::Ok { .. } => panic!("expected timeout failure"),
        }
    }

    #[tokio::test]
    async fn test_stage_keys_are_order_independent() {
        let forward = orchestrator(vec![
            Arc::new(FixedStage::scoring("alpha", 0.2)),
            Arc::new(FixedStage::scoring("beta", 0.8)),
        ]);
        let reversed = orchestrator(vec![
            Arc::new(FixedStage::scoring("beta", 0.8)),
            Arc::new(FixedStage::scoring("alpha", 0.2)),
        ]);

        let a = forward.run(case("BEN0008")).await.unwrap();
        let b = reversed.run(case("BEN0008")).await.unwrap();

        let keys_a: Vec<_> = a.stages.keys().collect();
        let keys_b: Vec<_> = b.stages.keys().collect();
        assert_eq!(keys_a, keys_b);
        assert!((a.summary.risk_score - b.summary.risk_score).abs() < 1e-9);
    }
}
