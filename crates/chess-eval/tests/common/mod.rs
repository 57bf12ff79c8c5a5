//! In-process fake engine for integration tests.

#![allow(dead_code)]

use chess_eval::cache::DEFAULT_TTL;
use chess_eval::{
    CacheBackend, Depth, Engine, EngineError, EngineLauncher, EvalService, MemoryCache,
    Normalizer, RawAnalysis,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uci::Score;

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
pub const SICILIAN: &str = "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";

/// How the fake behaves on the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Healthy,
    /// The process dies mid-analysis.
    Crash,
    /// Answers without a score.
    NoScore,
}

/// Shared observation and control of every engine the launcher starts.
#[derive(Default)]
pub struct EngineStats {
    pub calls: AtomicUsize,
    pub launches: AtomicUsize,
    busy: AtomicBool,
    pub overlaps: AtomicUsize,
    pub unavailable: AtomicBool,
    pub crash_next: AtomicBool,
    pub no_score: AtomicBool,
    pub delay: Mutex<Duration>,
    /// Canned answers by FEN; other positions get a default line.
    pub scripted: Mutex<HashMap<String, RawAnalysis>>,
}

impl EngineStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn script(&self, fen: &str, score: Score, pv: &[&str]) {
        self.scripted.lock().unwrap().insert(
            fen.to_string(),
            RawAnalysis {
                score: Some(score),
                pv: pv.iter().map(|m| m.to_string()).collect(),
                depth: 0,
                best_move: pv.first().map(|m| m.to_string()),
            },
        );
    }

    fn next_mode(&self) -> Mode {
        if self.crash_next.swap(false, Ordering::SeqCst) {
            Mode::Crash
        } else if self.no_score.load(Ordering::SeqCst) {
            Mode::NoScore
        } else {
            Mode::Healthy
        }
    }
}

pub struct FakeEngine {
    stats: Arc<EngineStats>,
    alive: bool,
}

impl Engine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_alive(&mut self) -> bool {
        self.alive
    }

    fn analyse(&mut self, fen: &str, depth: Depth) -> Result<RawAnalysis, EngineError> {
        if self.stats.busy.swap(true, Ordering::SeqCst) {
            self.stats.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.stats.delay.lock().unwrap();
        std::thread::sleep(delay);

        let mode = self.stats.next_mode();
        let outcome = match mode {
            Mode::Crash => {
                self.alive = false;
                Err(EngineError::Terminated("engine closed its output".to_string()))
            }
            Mode::NoScore => Ok(RawAnalysis {
                score: None,
                pv: vec!["e2e4".to_string()],
                depth: depth.get(),
                best_move: Some("e2e4".to_string()),
            }),
            Mode::Healthy => {
                let scripted = self.stats.scripted.lock().unwrap().get(fen).cloned();
                let mut raw = scripted.unwrap_or_else(|| RawAnalysis {
                    score: Some(Score::Cp(depth.get() as i32)),
                    pv: Vec::new(),
                    depth: 0,
                    best_move: None,
                });
                raw.depth = depth.get();
                Ok(raw)
            }
        };

        self.stats.busy.store(false, Ordering::SeqCst);
        outcome
    }
}

pub struct FakeLauncher {
    pub stats: Arc<EngineStats>,
}

impl EngineLauncher for FakeLauncher {
    fn launch(&self) -> Result<Box<dyn Engine>, EngineError> {
        if self.stats.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::NotFound("/opt/missing/stockfish".to_string()));
        }
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEngine {
            stats: Arc::clone(&self.stats),
            alive: true,
        }))
    }
}

/// A service over a fresh fake engine and an in-memory cache.
pub fn service() -> (EvalService, Arc<EngineStats>, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let (service, stats) = service_with_backend(cache.clone());
    (service, stats, cache)
}

pub fn service_with_backend(backend: Arc<dyn CacheBackend>) -> (EvalService, Arc<EngineStats>) {
    let stats = Arc::new(EngineStats::default());
    let launcher = FakeLauncher {
        stats: Arc::clone(&stats),
    };
    let service =
        EvalService::with_launcher(Arc::new(launcher), backend, DEFAULT_TTL, Normalizer::default());
    (service, stats)
}
