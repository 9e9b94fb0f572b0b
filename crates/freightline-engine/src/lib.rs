//! Wiring crate: ties every pipeline crate into one per-message
//! [`processor::Processor`], fans messages out across a
//! [`pool::WorkerPool`], and drives the thread-ordered
//! [`reanalysis::ReanalysisService`] (§4.7, §4.8).
//!
//! Nothing downstream of `freightline-core` should need to be imported
//! directly by callers of this crate — `freightline-engine` re-exports the
//! pieces a binary needs to run a batch.

pub mod collaborators;
pub mod fast_extract;
pub mod metrics;
pub mod pool;
pub mod processor;
pub mod reanalysis;

pub use metrics::{BatchSummary, Metrics, MetricsSnapshot};
pub use pool::WorkerPool;
pub use processor::{LinkedBy, ModelTiers, ProcessOutcome, ProcessStatus, Processor, ProcessorConfig};
pub use reanalysis::ReanalysisService;
