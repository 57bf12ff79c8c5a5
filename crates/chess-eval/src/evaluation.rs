//! Evaluation result types shared by the normalizer, the cache and callers.

use serde::{Deserialize, Serialize};

/// Prefix of every error tag placed in the `pv` field.
pub const ERROR_PREFIX: &str = "ERROR:";

/// The cached and returned value: `{"score_cp": int, "pv": string}`.
///
/// `score_cp` is always from White's point of view. Mates are encoded as
/// `10000 - N` when White mates in N and `-10000 + N` when Black does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Signed centipawn score (positive = white advantage).
    pub score_cp: i32,
    /// Space-separated SAN moves, empty, or an error tag.
    pub pv: String,
}

impl EvaluationResult {
    /// The uniform payload for a failed evaluation.
    pub fn failed(fault: Fault) -> Self {
        Self {
            score_cp: 0,
            pv: fault.pv_tag(),
        }
    }

    /// True when `pv` carries an error tag instead of (or before) moves.
    pub fn is_error(&self) -> bool {
        self.pv.starts_with(ERROR_PREFIX)
    }
}

/// Why an evaluation could not produce real data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// The engine process could not be started.
    EngineUnavailable,
    /// The engine process died during the analysis.
    EngineTerminated,
    /// The engine call failed for another reason (protocol error, worker panic).
    AnalysisFailed,
    /// The engine answered without a score or mate distance.
    NoScore,
}

impl Fault {
    /// Stable tag used in the `pv` field.
    pub fn tag(self) -> &'static str {
        match self {
            Fault::EngineUnavailable => "ENGINE_UNAVAILABLE",
            Fault::EngineTerminated => "ENGINE_TERMINATED",
            Fault::AnalysisFailed => "ANALYSIS_FAILED",
            Fault::NoScore => "NO_SCORE",
        }
    }

    /// `ERROR:<TAG>`
    pub fn pv_tag(self) -> String {
        format!("{}{}", ERROR_PREFIX, self.tag())
    }
}

/// An evaluation as seen by the caller of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub result: EvaluationResult,
    /// True when the result was served from the cache.
    pub cached: bool,
    /// Set when `result` is a degraded payload.
    pub fault: Option<Fault>,
}

/// Output of one fresh (uncached) evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computed {
    pub result: EvaluationResult,
    pub fault: Option<Fault>,
}

impl Computed {
    pub fn ok(result: EvaluationResult) -> Self {
        Self {
            result,
            fault: None,
        }
    }

    pub fn failed(fault: Fault) -> Self {
        Self {
            result: EvaluationResult::failed(fault),
            fault: Some(fault),
        }
    }

    /// Only complete engine answers go into the cache.
    pub fn is_cacheable(&self) -> bool {
        self.fault.is_none()
    }
}
