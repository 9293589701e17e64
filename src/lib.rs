//! Fraud Network Pipeline Library
//!
//! Welfare-fraud detection over a shared-attribute relationship graph:
//! beneficiaries who share phone numbers, bank accounts, agents, or identity
//! numbers are linked, connected components are classified as fraud rings,
//! and incoming cases are scored concurrently by independent stages whose
//! outcomes aggregate into a single verdict.

pub mod aggregator;
pub mod config;
pub mod consumer;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod pipeline;
pub mod producer;
pub mod stages;
pub mod store;
pub mod types;

pub use aggregator::ScoreAggregator;
pub use config::AppConfig;
pub use consumer::CaseConsumer;
pub use error::{CacheError, GraphQueryError, PipelineError};
pub use graph::{Graph, GraphBuilder, GraphCache, GraphHandle, GraphServices};
pub use pipeline::PipelineOrchestrator;
pub use producer::VerdictProducer;
pub use stages::{AnomalyStage, DuplicateStage, NetworkStage, Stage};
pub use store::RecordStore;
pub use types::{
    case::{CaseInput, PipelineRequest},
    record::Record,
    verdict::{PipelineResult, VerdictEnvelope},
};
