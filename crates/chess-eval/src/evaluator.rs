//! Depth-bounded analysis requests against the managed engine.
//!
//! [`Evaluator::analyse`] is the only path from a request to the engine
//! process. It leases the engine slot, moves the lease onto the blocking
//! pool and classifies whatever comes back into an [`AnalysisError`].
//!
//! A failed call, a panic inside the engine included, always leaves the
//! slot empty. The next request then starts a fresh process instead of
//! talking to one in an unknown protocol state.

use crate::engine::{EngineError, RawAnalysis};
use crate::evaluation::Fault;
use crate::manager::EngineManager;
use crate::{Depth, Position};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Why an analysis request produced no raw result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// No engine could be started.
    #[error("Engine unavailable: {0}")]
    Unavailable(#[source] EngineError),
    /// The engine died while analysing.
    #[error("Engine terminated: {0}")]
    Terminated(#[source] EngineError),
    /// Any other failure of the engine call.
    #[error("Analysis failed: {0}")]
    Failed(String),
}

impl AnalysisError {
    fn from_call(err: EngineError) -> Self {
        match err {
            EngineError::Terminated(_) => AnalysisError::Terminated(err),
            other => AnalysisError::Failed(other.to_string()),
        }
    }

    pub fn fault(&self) -> Fault {
        match self {
            AnalysisError::Unavailable(_) => Fault::EngineUnavailable,
            AnalysisError::Terminated(_) => Fault::EngineTerminated,
            AnalysisError::Failed(_) => Fault::AnalysisFailed,
        }
    }
}

/// Issues one analysis at a time through the [`EngineManager`].
#[derive(Clone)]
pub struct Evaluator {
    manager: Arc<EngineManager>,
}

impl Evaluator {
    pub fn new(manager: Arc<EngineManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &EngineManager {
        &self.manager
    }

    /// Analyse `position` to `depth`.
    ///
    /// Waits for the engine to be free, then runs the blocking engine call on
    /// the blocking thread pool. The lease travels with that call, so the
    /// engine stays reserved until the analysis finishes even if the caller
    /// stops waiting. There is no retry.
    ///
    /// # Arguments
    ///
    /// * `position` - Validated position; its FEN text is sent as given
    /// * `depth` - Search depth passed to `go depth`
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::Unavailable`] - no engine could be started
    /// * [`AnalysisError::Terminated`] - the process died mid-search
    /// * [`AnalysisError::Failed`] - any other engine error, or a panic in
    ///   the engine call
    ///
    /// Every error after a successful start discards the engine handle.
    pub async fn analyse(
        &self,
        position: &Position,
        depth: Depth,
    ) -> Result<RawAnalysis, AnalysisError> {
        let mut lease = self.manager.lease().await;
        let fen = position.fen().to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            let engine = lease.get_engine().map_err(AnalysisError::Unavailable)?;
            let call = panic::catch_unwind(AssertUnwindSafe(|| engine.analyse(&fen, depth)));
            match call {
                Ok(Ok(raw)) => Ok(raw),
                Ok(Err(err)) => {
                    lease.discard(&err.to_string());
                    Err(AnalysisError::from_call(err))
                }
                Err(payload) => {
                    let reason = format!("engine call panicked: {}", panic_message(&*payload));
                    lease.discard(&reason);
                    Err(AnalysisError::Failed(reason))
                }
            }
        })
        .await;

        outcome.unwrap_or_else(|join_err| Err(AnalysisError::Failed(join_err.to_string())))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
