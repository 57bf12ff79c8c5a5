//! The evaluation service facade: validate, look up, analyse, normalize, store.

use crate::cache::{self, CacheAside, CacheBackend};
use crate::config::Config;
use crate::engine::{EngineLauncher, UciLauncher};
use crate::evaluation::{Computed, Evaluation};
use crate::evaluator::Evaluator;
use crate::manager::EngineManager;
use crate::normalize::Normalizer;
use crate::{Depth, InvalidInput, Position};
use std::sync::Arc;
use std::time::Duration;

/// Evaluates positions through the cache, falling back to the engine.
///
/// Cheap to clone; clones share the engine, the cache and in-flight work.
#[derive(Clone)]
pub struct EvalService {
    evaluator: Evaluator,
    normalizer: Normalizer,
    cache: CacheAside,
}

impl EvalService {
    pub fn new(evaluator: Evaluator, normalizer: Normalizer, cache: CacheAside) -> Self {
        Self {
            evaluator,
            normalizer,
            cache,
        }
    }

    /// Assemble a service from a launcher and a cache backend.
    ///
    /// # Arguments
    ///
    /// * `launcher` - Starts engine processes on demand
    /// * `backend` - Result store; pass [`DisabledCache`](crate::DisabledCache)
    ///   to always analyse
    /// * `ttl` - Expiry of stored results
    /// * `normalizer` - PV rendering settings
    pub fn with_launcher(
        launcher: Arc<dyn EngineLauncher>,
        backend: Arc<dyn CacheBackend>,
        ttl: Duration,
        normalizer: Normalizer,
    ) -> Self {
        let manager = Arc::new(EngineManager::new(launcher));
        Self::new(
            Evaluator::new(manager),
            normalizer,
            CacheAside::with_ttl(backend, ttl),
        )
    }

    /// Build the production service described by `config`: a UCI engine at
    /// `engine.path` and the configured cache backend.
    ///
    /// Neither the engine nor the cache is contacted eagerly except for a
    /// Redis connection attempt. An unreachable Redis degrades to no caching
    /// and a missing engine surfaces later as `ERROR:ENGINE_UNAVAILABLE`.
    pub async fn from_config(config: &Config) -> Self {
        let launcher = UciLauncher::new(config.engine.path.clone(), config.engine.args.clone());
        let backend = cache::connect(&config.cache).await;
        Self::with_launcher(
            Arc::new(launcher),
            backend,
            config.cache.ttl(),
            Normalizer::new(config.analysis.pv_plies),
        )
    }

    /// Validate raw request input and evaluate it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] for an unparsable FEN or a depth outside
    /// `1..=30`. Every other failure is reported inside the [`Evaluation`].
    pub async fn evaluate(&self, fen: &str, depth: i64) -> Result<Evaluation, InvalidInput> {
        let depth = Depth::new(depth)?;
        let position = Position::from_fen(fen)?;
        Ok(self.evaluate_position(position, depth).await)
    }

    /// Evaluate an already validated position. Never fails: engine faults come
    /// back as a zero score with an `ERROR:` tag in the PV.
    pub async fn evaluate_position(&self, position: Position, depth: Depth) -> Evaluation {
        let evaluator = self.evaluator.clone();
        let normalizer = self.normalizer;
        let target = position.clone();

        self.cache
            .get_or_compute(&position, depth, move || async move {
                match evaluator.analyse(&target, depth).await {
                    Ok(raw) => normalizer.normalize(&raw, &target).into_computed(),
                    Err(err) => {
                        tracing::warn!(fen = target.fen(), %depth, error = %err, "Analysis failed");
                        Computed::failed(err.fault())
                    }
                }
            })
            .await
    }

    /// Number of engine processes started so far.
    pub fn engine_launches(&self) -> u64 {
        self.evaluator.manager().launches()
    }

    /// Stop the engine process. Later requests start a new one.
    pub async fn shutdown(&self) {
        self.evaluator.manager().shutdown().await;
    }
}
