//! Fan a unit list out over concurrent sub-runs
//!
//! The list is cut into consecutive sub-lists and each one gets an
//! independent engine run with its own state. Runs are spawned on a
//! [`JoinSet`] and gated by the pool's semaphore. The first failing run
//! decides the outcome; its siblings are detached and left to finish on
//! their own.

use crate::config::BatchOrder;
use crate::engine::SequentialEngine;
use crate::error::EngineError;
use crate::task::Task;
use accrue_domain::ChatModel;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, Instrument};

/// Bounds how many sub-runs are in flight at once
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Pool allowing `size` concurrent sub-runs (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum number of concurrent sub-runs
    pub fn max_concurrency(&self) -> usize {
        self.size
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Cut `units` into consecutive sub-lists of at most `size` items
///
/// A size of zero is treated as one.
pub fn plan_batches<U: Clone>(units: &[U], size: usize) -> Vec<Vec<U>> {
    units.chunks(size.max(1)).map(<[U]>::to_vec).collect()
}

/// Run `engine` over each sub-list concurrently
///
/// Outputs come back in completion order, or in sub-list order when `order`
/// is [`BatchOrder::Submission`].
pub async fn run_batched<M, T>(
    engine: &SequentialEngine<M, T>,
    units: &[T::Unit],
    batch_size: usize,
    pool: &WorkerPool,
    order: BatchOrder,
) -> Result<Vec<T::Output>, EngineError>
where
    M: ChatModel + 'static,
    T: Task,
{
    let batches = plan_batches(units, batch_size);
    if batches.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        "Fanning {} unit(s) out over {} sub-run(s), at most {} at a time",
        units.len(),
        batches.len(),
        pool.max_concurrency()
    );

    let mut set = JoinSet::new();
    for (index, batch) in batches.into_iter().enumerate() {
        let engine = engine.clone();
        let semaphore = Arc::clone(&pool.semaphore);

        set.spawn(
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::Worker("worker pool closed".to_string()))?;
                debug!("Sub-run started with {} unit(s)", batch.len());
                engine.run(&batch).await.map(|output| (index, output))
            }
            .instrument(info_span!("batch", index)),
        );
    }

    let mut finished = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        let result = joined.unwrap_or_else(|e| Err(EngineError::Worker(e.to_string())));
        match result {
            Ok(pair) => finished.push(pair),
            Err(e) => {
                error!("Sub-run failed, detaching {} remaining: {}", set.len(), e);
                set.detach_all();
                return Err(e);
            }
        }
    }

    if order == BatchOrder::Submission {
        finished.sort_by_key(|(index, _)| *index);
    }
    Ok(finished.into_iter().map(|(_, output)| output).collect())
}
