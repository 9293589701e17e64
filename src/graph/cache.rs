//! Graph snapshot persistence.
//!
//! The cache holds a byte-exact snapshot of the most recently built graph so
//! process restarts skip the full rebuild. Cache absence or corruption is
//! never fatal: callers fall back to building from the record store. There is
//! no automatic invalidation; rebuilding is an explicit operational action.

use super::{Graph, GraphBuilder, GraphSnapshot};
use crate::error::CacheError;
use crate::types::record::Record;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File-backed snapshot store for the relationship graph.
pub struct GraphCache {
    path: PathBuf,
}

impl GraphCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached graph. `Ok(None)` when no snapshot exists.
    pub fn load(&self) -> Result<Option<Graph>, CacheError> {
        // single read, so a file removed concurrently reads as absent
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io(e)),
        };
        let snapshot: GraphSnapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(Graph::from_snapshot(snapshot)?))
    }

    /// Persist a snapshot, replacing any previous one.
    pub fn store(&self, graph: &Graph) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(&graph.snapshot())?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// Load the cached graph if possible, otherwise build from the records and
/// refresh the cache best-effort.
pub fn load_or_build(
    cache: &GraphCache,
    builder: &GraphBuilder,
    records: &[Record],
) -> Result<Graph> {
    match cache.load() {
        Ok(Some(graph)) => {
            info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                path = %cache.path().display(),
                "loaded relationship graph from cache"
            );
            return Ok(graph);
        }
        Ok(None) => info!(path = %cache.path().display(), "no graph cache found, building"),
        Err(e) => warn!(error = %e, "graph cache unreadable, rebuilding"),
    }

    let graph = builder.build(records)?;
    if let Err(e) = cache.store(&graph) {
        warn!(error = %e, "failed to store graph cache");
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new("BEN0001").with_phone("111"),
            Record::new("BEN0002").with_phone("111"),
            Record::new("BEN0003").with_agent("AG9"),
        ]
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GraphCache::new(dir.path().join("graph.json"));

        let graph = GraphBuilder::default().build(&sample_records()).unwrap();
        cache.store(&graph).unwrap();

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.fingerprint(), graph.fingerprint());
        assert!(loaded.has_edge("BEN0001", "BEN0002"));
    }

    #[test]
    fn test_missing_cache_is_absent_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GraphCache::new(dir.path().join("nope.json"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, b"not json at all").unwrap();

        let cache = GraphCache::new(path);
        assert!(cache.load().is_err());
    }

    #[test]
    fn test_load_or_build_falls_back_on_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, b"{\"broken\":").unwrap();

        let cache = GraphCache::new(&path);
        let records = sample_records();
        let graph = load_or_build(&cache, &GraphBuilder::default(), &records).unwrap();

        assert_eq!(graph.node_count(), 3);
        // fallback also refreshed the snapshot
        let reloaded = cache.load().unwrap().unwrap();
        assert_eq!(reloaded.fingerprint(), graph.fingerprint());
    }

    #[test]
    fn test_load_or_build_prefers_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GraphCache::new(dir.path().join("graph.json"));

        let records = sample_records();
        let built = GraphBuilder::default().build(&records).unwrap();
        cache.store(&built).unwrap();

        // different record set on disk would rebuild differently; the cache
        // wins until an explicit rebuild
        let other = vec![Record::new("BEN0009")];
        let loaded = load_or_build(&cache, &GraphBuilder::default(), &other).unwrap();
        assert_eq!(loaded.fingerprint(), built.fingerprint());
    }
}
