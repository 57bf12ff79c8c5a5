//! Ownership of the single analysis engine process.
//!
//! The manager holds at most one live [`Engine`] behind an async mutex. A
//! caller takes an [`EngineLease`] (the locked slot) and moves it onto a
//! blocking thread; other callers queue on the mutex until the lease is
//! dropped. The engine is started lazily on first use and replaced when it is
//! found dead or explicitly discarded after a failed call.

use crate::engine::{Engine, EngineError, EngineLauncher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Option<Box<dyn Engine>>;

/// Owner of the engine slot.
///
/// Cloning is not needed; share it behind an `Arc`. All state lives in
/// shared handles, so a lease outlives neither the slot nor the launcher.
pub struct EngineManager {
    launcher: Arc<dyn EngineLauncher>,
    slot: Arc<Mutex<Slot>>,
    launches: Arc<AtomicU64>,
}

impl EngineManager {
    /// Create a manager. No engine is started until the first lease asks for one.
    pub fn new(launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            launcher,
            slot: Arc::new(Mutex::new(None)),
            launches: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait for exclusive access to the engine slot.
    ///
    /// # Returns
    ///
    /// An [`EngineLease`] that keeps the slot locked until dropped. Leases
    /// are granted in request order.
    pub async fn lease(&self) -> EngineLease {
        EngineLease {
            slot: Arc::clone(&self.slot).lock_owned().await,
            launcher: Arc::clone(&self.launcher),
            launches: Arc::clone(&self.launches),
        }
    }

    /// Number of engine processes started so far.
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::SeqCst)
    }

    /// Stop the engine, if one is running. Waits for any in-flight analysis.
    pub async fn shutdown(&self) {
        let engine = self.slot.lock().await.take();
        if let Some(engine) = engine {
            tracing::info!(engine = engine.name(), "Stopping analysis engine");
            // Dropping a process-backed engine waits for the child to exit.
            let _ = tokio::task::spawn_blocking(move || drop(engine)).await;
        }
    }
}

/// Exclusive access to the engine slot. Dropping the lease releases it.
pub struct EngineLease {
    slot: OwnedMutexGuard<Slot>,
    launcher: Arc<dyn EngineLauncher>,
    launches: Arc<AtomicU64>,
}

impl EngineLease {
    /// Return the live engine, starting a new one if the slot is empty or the
    /// previous process has exited. Blocks while a process starts.
    ///
    /// # Errors
    ///
    /// Whatever [`EngineLauncher::launch`] returns when a new process is
    /// needed and cannot be started. The slot stays empty in that case.
    pub fn get_engine(&mut self) -> Result<&mut dyn Engine, EngineError> {
        let mut current = self.slot.take();
        if let Some(engine) = current.as_mut() {
            if !engine.is_alive() {
                tracing::warn!(engine = engine.name(), "Engine process exited, restarting");
                current = None;
            }
        }
        let engine = match current {
            Some(engine) => engine,
            None => self.launch()?,
        };
        Ok(&mut **self.slot.insert(engine))
    }

    /// Drop the current engine so the next request starts a fresh one.
    pub fn discard(&mut self, reason: &str) {
        if let Some(engine) = self.slot.take() {
            tracing::warn!(engine = engine.name(), reason, "Discarding engine handle");
        }
    }

    /// True when the slot holds an engine (alive or not).
    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    fn launch(&self) -> Result<Box<dyn Engine>, EngineError> {
        let engine = self.launcher.launch()?;
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(engine)
    }
}
