//! Network scoring against the shared relationship graph.

use super::Stage;
use crate::graph::GraphHandle;
use crate::types::case::PipelineRequest;
use crate::types::verdict::{FailureKind, StageOutcome, StageReport};
use async_trait::async_trait;
use tracing::debug;

const W_COMPONENT: f64 = 0.55;
const W_HUB: f64 = 0.45;

/// Scores a case by its position in the relationship graph: component size
/// against the ring threshold, and degree centrality against the live hub
/// threshold.
pub struct NetworkStage {
    graph: GraphHandle,
}

impl NetworkStage {
    pub fn new(graph: GraphHandle) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl Stage for NetworkStage {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn score(&self, request: &PipelineRequest) -> StageOutcome {
        // one bundle per scoring call, so component, centrality and thresholds
        // all come from the same graph version
        let services = self.graph.current();

        let component = match services.rings.component_of(&request.beneficiary_id) {
            Ok(component) => component,
            Err(e) => return StageOutcome::failed(FailureKind::NotFound, e.to_string()),
        };
        let ring_detected = services.rings.is_ring(&component);

        let degree_centrality = match services.centrality.score(&request.beneficiary_id) {
            Ok(score) => score,
            Err(e) => return StageOutcome::failed(FailureKind::NotFound, e.to_string()),
        };
        let hub_detected = degree_centrality >= services.centrality.hub_threshold();

        let ring_threshold = services.rings.ring_threshold();
        let size_factor =
            (component.size.saturating_sub(1)) as f64 / ring_threshold.saturating_sub(1).max(1) as f64;
        let hub_threshold = services.centrality.hub_threshold();
        let hub_factor = if hub_threshold > 0.0 {
            (degree_centrality / hub_threshold).min(1.0)
        } else {
            0.0
        };
        let risk_score = (W_COMPONENT * size_factor.min(1.0) + W_HUB * hub_factor).clamp(0.0, 1.0);

        debug!(
            request_id = %request.request_id,
            component_size = component.size,
            ring_detected,
            degree_centrality,
            hub_detected,
            risk_score,
            "network stage scored"
        );

        StageOutcome::ok(StageReport::Network {
            risk_score,
            in_network: component.size > 1,
            component_size: component.size,
            ring_detected,
            degree_centrality,
            hub_detected,
        })
    }

    /// Beneficiaries absent from the graph are simply outside any known
    /// network; they contribute zero network risk rather than an error.
    fn neutral_report(&self) -> Option<StageReport> {
        Some(StageReport::Network {
            risk_score: 0.0,
            in_network: false,
            component_size: 0,
            ring_detected: false,
            degree_centrality: 0.0,
            hub_detected: false,
        })
    }
}
