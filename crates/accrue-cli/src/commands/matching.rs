//! Match command implementation.

use crate::cli::MatchArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use accrue_domain::ChatModel;
use accrue_engine::{MatchRequest, RuleMatcher, WorkerPool};
use std::fs;
use std::sync::Arc;

/// Execute the match command, returning the rendered result.
pub async fn execute_match<M>(
    args: &MatchArgs,
    model: Arc<M>,
    config: &Config,
    formatter: &Formatter,
) -> Result<String>
where
    M: ChatModel + 'static,
{
    let request: MatchRequest = serde_json::from_str(&fs::read_to_string(&args.input)?)?;

    let matcher = RuleMatcher::from_arc(model, config.engine.clone());
    let output = if args.parallel {
        let pool = match args.concurrency {
            Some(n) => WorkerPool::new(n),
            None => matcher.default_pool(),
        };
        matcher.check_parallel(&request, args.batch_size, &pool).await?
    } else {
        matcher.check(&request).await?
    };

    formatter.format_verdicts(&output)
}
