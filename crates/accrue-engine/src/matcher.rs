//! Rule matching, sequential and batched

use crate::batch::{run_batched, WorkerPool};
use crate::config::EngineConfig;
use crate::engine::SequentialEngine;
use crate::error::EngineError;
use crate::task::MatchingTask;
use crate::types::{MatchOutput, MatchRequest};
use accrue_domain::ChatModel;
use std::sync::Arc;
use tracing::info;

/// Checks each rule of a request against its context
pub struct RuleMatcher<M> {
    model: Arc<M>,
    config: Arc<EngineConfig>,
}

impl<M> Clone for RuleMatcher<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            config: Arc::clone(&self.config),
        }
    }
}

impl<M> RuleMatcher<M>
where
    M: ChatModel + 'static,
{
    /// Create a new RuleMatcher
    pub fn new(model: M, config: EngineConfig) -> Self {
        Self::from_arc(Arc::new(model), config)
    }

    /// Create a RuleMatcher sharing an existing model handle
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

    /// Worker pool sized from the configuration
    pub fn default_pool(&self) -> WorkerPool {
        WorkerPool::new(self.config.max_concurrency)
    }

    fn engine(&self, request: &MatchRequest) -> Result<SequentialEngine<M, MatchingTask>, EngineError> {
        self.config.validate().map_err(EngineError::Config)?;
        let task = MatchingTask::new(request, &self.config);
        SequentialEngine::new(Arc::clone(&self.model), task, Arc::clone(&self.config))
    }

    /// Check every rule in order within a single run
    pub async fn check(&self, request: &MatchRequest) -> Result<MatchOutput, EngineError> {
        let output = self.engine(request)?.run(&request.rules).await?;
        info!(
            "{}/{} rule(s) matched",
            output.matched().count(),
            request.rules.len()
        );
        Ok(output)
    }

    /// Check the rules in independent sub-runs of `batch_size` rules each
    ///
    /// A missing or zero `batch_size` uses the configured default. Verdicts
    /// are concatenated per sub-run in the configured order. The first
    /// failing sub-run fails the whole call.
    pub async fn check_parallel(
        &self,
        request: &MatchRequest,
        batch_size: Option<usize>,
        pool: &WorkerPool,
    ) -> Result<MatchOutput, EngineError> {
        let engine = self.engine(request)?;
        let batch_size = self.config.effective_batch_size(batch_size);

        let outputs = run_batched(&engine, &request.rules, batch_size, pool, self.config.batch_order).await?;
        let verdicts = outputs.into_iter().flat_map(|o| o.verdicts).collect();

        let output = MatchOutput { verdicts };
        info!(
            "{}/{} rule(s) matched across batches of {}",
            output.matched().count(),
            request.rules.len(),
            batch_size
        );
        Ok(output)
    }
}
