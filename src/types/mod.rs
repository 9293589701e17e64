//! Type definitions for the fraud network pipeline

pub mod case;
pub mod record;
pub mod verdict;

pub use case::{CaseInput, PipelineRequest};
pub use record::{LinkAttribute, Record};
pub use verdict::{PipelineResult, RiskLevel, StageOutcome, VerdictEnvelope};
