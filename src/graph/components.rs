//! Connected components and fraud ring classification.

use super::Graph;
use crate::error::GraphQueryError;
use petgraph::unionfind::UnionFind;
use std::sync::Arc;

/// Minimum component size classified as a fraud ring.
pub const DEFAULT_RING_THRESHOLD: usize = 5;

/// One connected component of the relationship graph. Membership order is
/// insignificant; only size matters for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    root: u32,
    pub size: usize,
}

/// Component index over one graph, computed once via union-find in O(V+E).
pub struct RingDetector {
    graph: Arc<Graph>,
    assignment: Vec<u32>,
    sizes: Vec<usize>,
    ring_threshold: usize,
}

impl RingDetector {
    pub fn new(graph: Arc<Graph>, ring_threshold: usize) -> Self {
        let n = graph.node_count();
        let mut union_find = UnionFind::<u32>::new(n);
        for (i, neighbors) in graph.adjacency().iter().enumerate() {
            for &j in neighbors {
                if (i as u32) < j {
                    union_find.union(i as u32, j);
                }
            }
        }
        let assignment = union_find.into_labeling();
        let mut sizes = vec![0usize; n];
        for &root in &assignment {
            sizes[root as usize] += 1;
        }
        Self {
            graph,
            assignment,
            sizes,
            ring_threshold,
        }
    }

    pub fn ring_threshold(&self) -> usize {
        self.ring_threshold
    }

    /// Component containing `id`. Absent ids are a soft, expected condition.
    pub fn component_of(&self, id: &str) -> Result<Component, GraphQueryError> {
        let idx = self
            .graph
            .index_of(id)
            .ok_or_else(|| GraphQueryError::NodeNotFound(id.to_string()))?;
        let root = self.assignment[idx as usize];
        Ok(Component {
            root,
            size: self.sizes[root as usize],
        })
    }

    /// A component is a fraud ring iff its size meets the threshold.
    pub fn is_ring(&self, component: &Component) -> bool {
        component.size >= self.ring_threshold
    }

    /// Member ids of a component.
    pub fn members(&self, component: &Component) -> Vec<&str> {
        self.assignment
            .iter()
            .enumerate()
            .filter(|(_, &root)| root == component.root)
            .map(|(i, _)| self.graph.id_at(i as u32))
            .collect()
    }

    /// All components of the current graph.
    pub fn components(&self) -> Vec<Component> {
        self.sizes
            .iter()
            .enumerate()
            .filter(|(_, &size)| size > 0)
            .map(|(root, &size)| Component {
                root: root as u32,
                size,
            })
            .collect()
    }

    /// Number of components classified as rings.
    pub fn ring_count(&self) -> usize {
        self.sizes
            .iter()
            .filter(|&&size| size > 0 && size >= self.ring_threshold)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::types::record::Record;

    fn detector(records: &[Record], threshold: usize) -> RingDetector {
        let graph = GraphBuilder::default().build(records).unwrap();
        RingDetector::new(Arc::new(graph), threshold)
    }

    fn ring_records() -> Vec<Record> {
        // five records share one bank account, one record is unrelated
        let mut records: Vec<Record> = (1..=5)
            .map(|i| Record::new(format!("BEN000{}", i)).with_bank_account("AC777"))
            .collect();
        records.push(Record::new("BEN0006").with_phone("555"));
        records
    }

    #[test]
    fn test_shared_bank_forms_ring() {
        let detector = detector(&ring_records(), DEFAULT_RING_THRESHOLD);

        let component = detector.component_of("BEN0003").unwrap();
        assert_eq!(component.size, 5);
        assert!(detector.is_ring(&component));

        let singleton = detector.component_of("BEN0006").unwrap();
        assert_eq!(singleton.size, 1);
        assert!(!detector.is_ring(&singleton));

        assert_eq!(detector.ring_count(), 1);
    }

    #[test]
    fn test_components_partition_nodes() {
        let detector = detector(&ring_records(), DEFAULT_RING_THRESHOLD);

        let components = detector.components();
        let total: usize = components.iter().map(|c| c.size).sum();
        assert_eq!(total, 6);

        // every node appears in exactly one component
        let mut seen = std::collections::BTreeSet::new();
        for component in &components {
            for member in detector.members(component) {
                assert!(seen.insert(member.to_string()));
            }
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_ring_classification_monotonic_in_threshold() {
        let records = ring_records();
        let loose = detector(&records, 3);
        let strict = detector(&records, 6);

        assert!(loose.ring_count() >= strict.ring_count());
        assert_eq!(strict.ring_count(), 0);
    }

    #[test]
    fn test_unknown_node_is_not_found() {
        let detector = detector(&ring_records(), DEFAULT_RING_THRESHOLD);
        let err = detector.component_of("BEN9999").unwrap_err();
        assert!(err.to_string().contains("BEN9999"));
    }

    #[test]
    fn test_members_match_component_size() {
        let detector = detector(&ring_records(), DEFAULT_RING_THRESHOLD);
        let component = detector.component_of("BEN0001").unwrap();
        let members = detector.members(&component);

        assert_eq!(members.len(), component.size);
        assert!(members.contains(&"BEN0005"));
        assert!(!members.contains(&"BEN0006"));
    }
}
