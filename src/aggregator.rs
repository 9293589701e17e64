//! Score aggregation across scoring stages.

use std::collections::{BTreeMap, HashMap};

/// Aggregates per-stage risk scores into a single case-level score.
pub struct ScoreAggregator {
    /// Stage weights for weighted average
    weights: HashMap<String, f64>,
    /// Default weight for stages not in the weights map
    default_weight: f64,
}

impl ScoreAggregator {
    /// Create a new score aggregator with stage weights.
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self {
            weights,
            default_weight: 0.1,
        }
    }

    /// Create aggregator with equal weights for all stages.
    pub fn equal_weights() -> Self {
        Self {
            weights: HashMap::new(),
            default_weight: 1.0,
        }
    }

    /// Aggregate stage scores into a single risk score.
    ///
    /// Uses weighted average where weights are normalized to sum to 1.
    /// Missing stages simply drop out of the average; their weight is not
    /// redistributed onto a fabricated zero.
    pub fn aggregate(&self, stage_scores: &BTreeMap<String, f64>) -> f64 {
        if stage_scores.is_empty() {
            return 0.5; // Neutral score when no stages reported
        }

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for (stage_name, &score) in stage_scores {
            let weight = self
                .weights
                .get(stage_name)
                .copied()
                .unwrap_or(self.default_weight);

            weighted_sum += score * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            (weighted_sum / total_weight).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

}

impl Default for ScoreAggregator {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("anomaly".to_string(), 0.35);
        weights.insert("duplicate".to_string(), 0.30);
        weights.insert("network".to_string(), 0.35);

        Self {
            weights,
            default_weight: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_aggregation() {
        let aggregator = ScoreAggregator::default();

        let mut scores = BTreeMap::new();
        scores.insert("anomaly".to_string(), 0.8);
        scores.insert("duplicate".to_string(), 0.6);
        scores.insert("network".to_string(), 0.4);

        let aggregated = aggregator.aggregate(&scores);

        // Expected: 0.8*0.35 + 0.6*0.30 + 0.4*0.35 = 0.60
        assert!((aggregated - 0.60).abs() < 0.01);
    }

    #[test]
    fn test_equal_weights() {
        let aggregator = ScoreAggregator::equal_weights();

        let mut scores = BTreeMap::new();
        scores.insert("stage1".to_string(), 0.8);
        scores.insert("stage2".to_string(), 0.6);

        let aggregated = aggregator.aggregate(&scores);
        assert!((aggregated - 0.7).abs() < 0.01);
    }

    #[test]
    fn test_missing_stage_renormalizes() {
        let aggregator = ScoreAggregator::default();

        // network stage absent: remaining weights renormalize, so two equal
        // scores still aggregate to that score rather than being dragged down
        let mut scores = BTreeMap::new();
        scores.insert("anomaly".to_string(), 0.8);
        scores.insert("duplicate".to_string(), 0.8);

        let aggregated = aggregator.aggregate(&scores);
        assert!((aggregated - 0.8).abs() < 0.01);
    }

    #[test]
    fn test_empty_scores() {
        let aggregator = ScoreAggregator::default();
        let scores = BTreeMap::new();

        let aggregated = aggregator.aggregate(&scores);
        assert_eq!(aggregated, 0.5);
    }
}
