use crate::domain::document::ProcessingOptions;
use crate::infrastructure::services::EnhancedProcessor;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub processor: EnhancedProcessor,
    /// Options applied to uploads before any per-request overrides
    pub default_options: ProcessingOptions,
}

impl AppState {
    pub fn new(processor: EnhancedProcessor, default_options: ProcessingOptions) -> Self {
        Self {
            processor,
            default_options,
        }
    }
}
