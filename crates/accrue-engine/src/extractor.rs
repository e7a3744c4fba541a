//! Field extraction over a list of materials

use crate::config::EngineConfig;
use crate::engine::SequentialEngine;
use crate::error::EngineError;
use crate::task::ExtractionTask;
use crate::types::{ExtractionOutput, ExtractionRequest};
use accrue_domain::ChatModel;
use std::sync::Arc;
use tracing::info;

/// Fills requested fields by reading materials one at a time
///
/// Each material is shown to the model together with what has been
/// extracted so far, so later materials only need to supply what is still
/// missing.
pub struct Extractor<M> {
    model: Arc<M>,
    config: Arc<EngineConfig>,
}

impl<M> Clone for Extractor<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            config: Arc::clone(&self.config),
        }
    }
}

impl<M> Extractor<M>
where
    M: ChatModel + 'static,
{
    /// Create a new Extractor
    pub fn new(model: M, config: EngineConfig) -> Self {
        Self::from_arc(Arc::new(model), config)
    }

    /// Create an Extractor sharing an existing model handle
    pub fn from_arc(model: Arc<M>, config: EngineConfig) -> Self {
        Self {
            model,
            config: Arc::new(config),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Extract the requested fields from the request's materials
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutput, EngineError> {
        self.config.validate().map_err(EngineError::Config)?;

        let task = ExtractionTask::new(request, &self.config)?;
        let engine = SequentialEngine::new(Arc::clone(&self.model), task, Arc::clone(&self.config))?;

        let output = engine.run(&request.materials).await?;
        info!(
            "Extracted {}/{} field(s) from {} material(s)",
            output.fields.values().filter(|v| !v.is_empty()).count(),
            output.fields.len(),
            request.materials.len()
        );
        Ok(output)
    }
}
