//! Shared-attribute graph construction.

use super::Graph;
use crate::types::record::{LinkAttribute, Record};
use anyhow::{bail, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Largest attribute-value group expanded into a full clique. Bigger groups
/// (typically placeholder values shared by thousands of records) collapse to
/// a star, which keeps component membership identical at linear edge cost.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 200;

/// Builds the relationship graph from a record set.
///
/// For each linking attribute, records are grouped by value; every group of
/// size > 1 becomes pairwise edges. The edge set depends only on attribute
/// values, never on input order.
pub struct GraphBuilder {
    max_group_size: usize,
}

impl GraphBuilder {
    pub fn new(max_group_size: usize) -> Self {
        Self { max_group_size }
    }

    pub fn build(&self, records: &[Record]) -> Result<Graph> {
        for (row, record) in records.iter().enumerate() {
            if record.beneficiary_id.trim().is_empty() {
                bail!("record at row {} has no beneficiary_id", row);
            }
        }

        // Sorted by id so node indexes are content-derived.
        let mut by_id: BTreeMap<&str, &Record> = BTreeMap::new();
        for record in records {
            if by_id.contains_key(record.beneficiary_id.as_str()) {
                warn!(
                    beneficiary_id = %record.beneficiary_id,
                    "duplicate beneficiary_id in record set, keeping first"
                );
                continue;
            }
            by_id.insert(record.beneficiary_id.as_str(), record);
        }

        let ids: Vec<String> = by_id.keys().map(|id| id.to_string()).collect();
        let mut adjacency: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); ids.len()];
        let mut add_edge = |a: u32, b: u32| {
            if a != b {
                adjacency[a as usize].insert(b);
                adjacency[b as usize].insert(a);
            }
        };

        for attr in LinkAttribute::ALL {
            let mut groups: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
            // by_id iterates in id order, so members are ascending node indexes
            for (node, record) in by_id.values().enumerate() {
                if let Some(value) = record.linking_value(attr) {
                    groups.entry(value).or_default().push(node as u32);
                }
            }

            for (value, members) in &groups {
                if members.len() < 2 {
                    continue;
                }
                if members.len() <= self.max_group_size {
                    for (i, &a) in members.iter().enumerate() {
                        for &b in &members[i + 1..] {
                            add_edge(a, b);
                        }
                    }
                } else {
                    warn!(
                        attribute = attr.as_str(),
                        value = %value,
                        size = members.len(),
                        "linking group exceeds cap, using star expansion"
                    );
                    let hub = members[0];
                    for &member in &members[1..] {
                        add_edge(hub, member);
                    }
                }
            }
        }

        let graph = Graph::from_parts(ids, adjacency);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            fingerprint = graph.fingerprint(),
            "relationship graph built"
        );
        Ok(graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GROUP_SIZE)
    }
}
