//! Infrastructure services

mod batch;
mod health;
mod pipeline;
mod processor;

pub use batch::{BatchOrchestrator, BatchOutcome, BatchResult};
pub use health::{HealthChecker, HealthReport, HealthStatus, ParserHealth};
pub use pipeline::{DocumentPipeline, DocumentRequest, ProcessedDocument};
pub use processor::{
    EnhancedBatchItem, EnhancedOutcome, EnhancedProcessor, EnhancedProcessorConfig,
    EnhancedResult, ProcessingInfo, ProcessingOverview,
};
