//! Scoring stages consumed by the pipeline orchestrator.

pub mod anomaly;
pub mod duplicate;
pub mod network;

pub use anomaly::AnomalyStage;
pub use duplicate::DuplicateStage;
pub use network::NetworkStage;

use crate::types::case::PipelineRequest;
use crate::types::verdict::{StageOutcome, StageReport};
use async_trait::async_trait;

/// One independent scoring stage.
///
/// Stages hold no mutable state and are safe to invoke concurrently with
/// other stages and with themselves across requests. A stage reports trouble
/// as a tagged failure outcome; it never lets an error escape across the
/// orchestration boundary.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable name used as this stage's key in the aggregated result.
    fn name(&self) -> &'static str;

    /// Score one normalized request.
    async fn score(&self, request: &PipelineRequest) -> StageOutcome;

    /// Substitute payload applied by the orchestrator when this stage reports
    /// `NotFound` for a subject that is simply absent from a backing store.
    /// `None` means the failure is recorded as-is.
    fn neutral_report(&self) -> Option<StageReport> {
        None
    }
}
