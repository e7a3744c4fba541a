//! The sequential accumulation loop
//!
//! One run walks a list of units with a cursor. Each turn composes messages
//! from the current unit and the state so far, calls the model once with a
//! single tool, reads the tool payload, merges it and advances. The loop ends
//! when the composer reports that no input is left, so a run over `n` units
//! makes exactly `n` model calls.

use crate::error::EngineError;
use crate::parser::locate_payload;
use crate::prompt::{current_time, Composed};
use crate::task::Task;
use crate::types::TurnResult;
use crate::EngineConfig;
use accrue_domain::ChatModel;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State threaded through the turns of one run
#[derive(Debug)]
pub struct RunState<S> {
    /// Index of the next unit to process
    pub cursor: usize,
    /// Accumulated task state
    pub acc: S,
    /// Current time, fixed at the start of the run
    pub now: String,
}

/// Outcome of one step
#[derive(Debug)]
pub enum Step<S> {
    /// A turn was processed; call `step` again with this state
    Continue(RunState<S>),
    /// Nothing left to process
    Done(S),
}

/// Drives a [`Task`] over a list of units against a chat model
pub struct SequentialEngine<M, T> {
    model: Arc<M>,
    task: Arc<T>,
    config: Arc<EngineConfig>,
}

impl<M, T> Clone for SequentialEngine<M, T> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            task: Arc::clone(&self.task),
            config: Arc::clone(&self.config),
        }
    }
}

impl<M, T> SequentialEngine<M, T>
where
    M: ChatModel + 'static,
    T: Task,
{
    /// Build an engine, registering the task's tool with the model
    ///
    /// Fails with [`EngineError::ToolRegistration`] if the model refuses the
    /// tool declaration. No turn is run in that case.
    pub fn new(model: Arc<M>, task: T, config: Arc<EngineConfig>) -> Result<Self, EngineError> {
        model
            .check_tools(std::slice::from_ref(task.tool()))
            .map_err(|e| EngineError::ToolRegistration(e.to_string()))?;

        Ok(Self {
            model,
            task: Arc::new(task),
            config,
        })
    }

    /// The task this engine runs
    pub fn task(&self) -> &T {
        &self.task
    }

    /// Fresh state for a run
    pub fn start(&self) -> RunState<T::State> {
        RunState {
            cursor: 0,
            acc: self.task.initial_state(),
            now: current_time(self.config.time_zone_offset_hours),
        }
    }

    /// Process the unit under the cursor
    ///
    /// A model failure aborts the run. A missing or malformed tool payload
    /// does not: the turn contributes nothing and the cursor still advances.
    pub async fn step(&self, state: RunState<T::State>, units: &[T::Unit]) -> Result<Step<T::State>, EngineError> {
        let RunState { cursor, acc, now } = state;

        let messages = match self.task.compose(cursor, units, &acc, &now) {
            Composed::NoMoreInput => return Ok(Step::Done(acc)),
            turn => turn.into_messages(),
        };

        if self.config.log_prompts {
            for message in &messages {
                info!(
                    "[{} {}/{}] {}: {}",
                    self.task.name(),
                    cursor + 1,
                    units.len(),
                    message.role.as_str(),
                    message.content
                );
            }
        }

        let tool = self.task.tool();
        let reply = self
            .model
            .generate(&messages, std::slice::from_ref(tool))
            .await
            .map_err(|e| EngineError::Model(e.to_string()))?;

        let tool_messages = reply.tool_results();
        let mut produced = vec![reply];
        produced.extend(tool_messages);

        let turn = match locate_payload(&produced, &tool.name) {
            None => {
                debug!("Turn {} did not invoke {}", cursor + 1, tool.name);
                TurnResult::Empty
            }
            Some(payload) => match self.task.interpret(payload) {
                Ok(turn) => turn,
                Err(e) => {
                    warn!("Ignoring turn {} of {} run: {}", cursor + 1, self.task.name(), e);
                    TurnResult::Empty
                }
            },
        };

        Ok(Step::Continue(RunState {
            cursor: cursor + 1,
            acc: self.task.merge(acc, turn),
            now,
        }))
    }

    /// Run the task over `units` and finalize the result
    pub async fn run(&self, units: &[T::Unit]) -> Result<T::Output, EngineError> {
        if units.is_empty() {
            debug!("No input for {} run", self.task.name());
            return Ok(self.task.finalize(self.task.initial_state()));
        }

        info!("Starting {} run over {} unit(s)", self.task.name(), units.len());

        let mut state = self.start();
        let acc = loop {
            match self.step(state, units).await? {
                Step::Continue(next) => state = next,
                Step::Done(acc) => break acc,
            }
        };

        info!("Finished {} run", self.task.name());
        Ok(self.task.finalize(acc))
    }
}
