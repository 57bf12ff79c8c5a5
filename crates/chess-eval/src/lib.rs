//! Chess position evaluation backed by a UCI engine.
//!
//! A request names a position (FEN) and a search depth. The service answers
//! with a White-relative centipawn score and the first plies of the engine's
//! principal variation in SAN, serving repeated requests from a cache.
//!
//! ```text
//! EvalService::evaluate
//!   -> CacheAside (lookup / coalesce / store)
//!   -> Evaluator (one analysis at a time, on a blocking thread)
//!   -> EngineManager (lazy start, restart after failure)
//!   -> Normalizer (score perspective, SAN rendering)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use chess_eval::{Config, EvalService};
//!
//! # async fn run() -> Result<(), chess_eval::InvalidInput> {
//! let service = EvalService::from_config(&Config::default()).await;
//! let evaluation = service
//!     .evaluate("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 12)
//!     .await?;
//! println!("{} {}", evaluation.result.score_cp, evaluation.result.pv);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod evaluation;
pub mod evaluator;
pub mod manager;
pub mod normalize;
mod position;
pub mod service;

pub use cache::{cache_key, CacheAside, CacheBackend, CacheError, DisabledCache, MemoryCache};
pub use config::{Config, ConfigError};
pub use engine::{Engine, EngineError, EngineLauncher, RawAnalysis, UciEngine, UciLauncher};
pub use evaluation::{Computed, Evaluation, EvaluationResult, Fault};
pub use evaluator::{AnalysisError, Evaluator};
pub use manager::{EngineLease, EngineManager};
pub use normalize::Normalizer;
pub use position::{Depth, InvalidInput, Position};
pub use service::EvalService;
