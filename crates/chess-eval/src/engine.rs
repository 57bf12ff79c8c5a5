//! UCI engine process wrapper.
//!
//! [`Engine`] is one request/response conversation with an analysis engine and
//! [`EngineLauncher`] starts one. The production implementations spawn a UCI
//! executable (Stockfish by default) and talk to it over stdin/stdout; tests
//! substitute in-process fakes.

use crate::Depth;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use thiserror::Error;
use uci::{EngineMessage, GuiCommand, Score};

/// Lines read while waiting for `uciok` or `readyok` before the engine is declared broken.
pub const MAX_UCI_LINES: usize = 1000;

/// Failures of an engine process, at startup or during a call.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The OS refused to start the process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[source] std::io::Error),
    /// No executable at the configured path or on `PATH`.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// The process started but never completed the `uci`/`isready` handshake.
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),
    /// The engine process exited or closed its pipes.
    #[error("Engine terminated: {0}")]
    Terminated(String),
    /// The engine said something the protocol does not allow here.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    /// True for errors raised while bringing an engine up.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            EngineError::SpawnError(_) | EngineError::NotFound(_) | EngineError::InitFailed(_)
        )
    }
}

/// Raw engine output for one analysis request.
///
/// The score is relative to the side to move, exactly as the engine reported
/// it; the PV is in UCI long algebraic notation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAnalysis {
    /// Score from the last exact main-line `info` report.
    pub score: Option<Score>,
    pub pv: Vec<String>,
    /// Depth of the report the score came from.
    pub depth: u32,
    /// The best move, `None` when the position has no legal moves.
    pub best_move: Option<String>,
}

impl RawAnalysis {
    /// Fold one `info` report into the running result. Bounded scores and
    /// secondary lines are ignored; a report without a PV keeps the previous one.
    pub fn absorb(&mut self, info: &uci::EngineInfo) {
        if !info.is_exact_main_line() {
            return;
        }
        self.score = info.score;
        if let Some(depth) = info.depth {
            self.depth = depth;
        }
        if !info.pv.is_empty() {
            self.pv = info.pv.clone();
        }
    }
}

/// A running analysis engine.
///
/// Calls block until the engine answers. Implementations are not expected to
/// handle concurrent requests; [`crate::EngineManager`] serializes access.
pub trait Engine: Send {
    fn name(&self) -> &str;

    /// False once the process has exited.
    fn is_alive(&mut self) -> bool;

    /// Analyse `fen` to a fixed depth.
    fn analyse(&mut self, fen: &str, depth: Depth) -> Result<RawAnalysis, EngineError>;
}

/// Starts engines on demand.
pub trait EngineLauncher: Send + Sync {
    fn launch(&self) -> Result<Box<dyn Engine>, EngineError>;
}

/// A UCI engine child process (Stockfish by default) driven over its pipes.
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// From `id name`, or "Unknown Engine".
    name: String,
}

impl UciEngine {
    /// Spawn the engine process and perform the UCI handshake.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for a missing executable,
    /// [`EngineError::SpawnError`] when the OS cannot start it, and
    /// [`EngineError::InitFailed`] when the handshake does not complete.
    pub fn spawn(program: &Path, args: &[String]) -> Result<Self, EngineError> {
        // Bare names are looked up on PATH by the OS, only check explicit paths.
        if program.components().count() > 1 && !program.exists() {
            return Err(EngineError::NotFound(program.display().to_string()));
        }

        let mut process = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    EngineError::NotFound(program.display().to_string())
                }
                _ => EngineError::SpawnError(e),
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::InitFailed("stdin not captured".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::InitFailed("stdout not captured".to_string()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            name: String::new(),
        };

        engine
            .init_uci()
            .map_err(|e| EngineError::InitFailed(e.to_string()))?;

        Ok(engine)
    }

    /// `uci` until `uciok`, then `isready` until `readyok`.
    fn init_uci(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::Uci)?;

        let mut name = None;
        self.read_until(|msg| match msg {
            EngineMessage::Id { name: Some(n), .. } => {
                name = Some(n);
                false
            }
            EngineMessage::UciOk => true,
            _ => false,
        })?;
        self.name = name.unwrap_or_else(|| "Unknown Engine".to_string());

        self.send(&GuiCommand::IsReady)?;
        self.read_until(|msg| msg == EngineMessage::ReadyOk)
    }

    /// Read messages until `done` returns true, giving up after
    /// [`MAX_UCI_LINES`] lines.
    fn read_until(&mut self, mut done: impl FnMut(EngineMessage) -> bool) -> Result<(), EngineError> {
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line()?;
            if done(EngineMessage::parse(&line)) {
                return Ok(());
            }
        }
        Err(EngineError::InvalidResponse(format!(
            "no reply after {} lines",
            MAX_UCI_LINES
        )))
    }

    fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        writeln!(self.stdin, "{}", command)
            .and_then(|_| self.stdin.flush())
            .map_err(|e| EngineError::Terminated(format!("write failed: {}", e)))
    }

    /// Next output line, trimmed. EOF means the process is gone.
    fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let bytes = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| EngineError::Terminated(format!("read failed: {}", e)))?;
        if bytes == 0 {
            return Err(EngineError::Terminated(
                "engine closed its output".to_string(),
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl Engine for UciEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }

    fn analyse(&mut self, fen: &str, depth: Depth) -> Result<RawAnalysis, EngineError> {
        self.send(&GuiCommand::Position { fen: fen.to_string() })?;
        self.send(&GuiCommand::GoDepth(depth.get()))?;

        // The depth bound is the only limit on how long this loop runs.
        let mut analysis = RawAnalysis::default();
        loop {
            let line = self.read_line()?;
            match EngineMessage::parse(&line) {
                EngineMessage::Info(info) => analysis.absorb(&info),
                EngineMessage::BestMove { mv, .. } => {
                    analysis.best_move = mv;
                    return Ok(analysis);
                }
                _ => {}
            }
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send(&GuiCommand::Quit);
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Launches a UCI executable with fixed arguments.
#[derive(Debug, Clone)]
pub struct UciLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl UciLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl EngineLauncher for UciLauncher {
    fn launch(&self) -> Result<Box<dyn Engine>, EngineError> {
        let engine = UciEngine::spawn(&self.program, &self.args)?;
        tracing::info!(
            engine = engine.name(),
            path = %self.program.display(),
            "Analysis engine started"
        );
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uci::EngineInfo;

    #[test]
    fn test_engine_not_found() {
        let result = UciEngine::spawn(Path::new("/nonexistent/path/to/stockfish"), &[]);
        match result {
            Err(EngineError::NotFound(path)) => {
                assert_eq!(path, "/nonexistent/path/to/stockfish");
            }
            Err(other) => panic!("Expected NotFound error, got {:?}", other),
            Ok(_) => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_bare_name_not_on_path() {
        let result = UciEngine::spawn(Path::new("no-such-engine-on-path-4d1f"), &[]);
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_engine_error_display() {
        let spawn_err = EngineError::SpawnError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(spawn_err.to_string().contains("Failed to spawn engine"));

        let not_found = EngineError::NotFound("/path/to/engine".to_string());
        assert!(not_found.to_string().contains("/path/to/engine"));

        let terminated = EngineError::Terminated("engine closed its output".to_string());
        assert_eq!(
            terminated.to_string(),
            "Engine terminated: engine closed its output"
        );
    }

    #[test]
    fn test_startup_classification() {
        assert!(EngineError::NotFound("x".to_string()).is_startup());
        assert!(EngineError::InitFailed("x".to_string()).is_startup());
        assert!(!EngineError::Terminated("x".to_string()).is_startup());
        assert!(!EngineError::InvalidResponse("x".to_string()).is_startup());
    }

    #[test]
    fn test_absorb_keeps_last_exact_line() {
        let mut analysis = RawAnalysis::default();
        for line in [
            "info depth 1 score cp 12 pv e2e4",
            "info depth 2 score cp 90 lowerbound pv d2d4",
            "info depth 2 multipv 2 score cp -40 pv a2a3",
            "info depth 2 score cp 31 pv e2e4 e7e5",
            "info string NNUE evaluation enabled",
        ] {
            analysis.absorb(&EngineInfo::parse(line).unwrap());
        }
        assert_eq!(analysis.score, Some(Score::Cp(31)));
        assert_eq!(analysis.depth, 2);
        assert_eq!(analysis.pv, vec!["e2e4", "e7e5"]);
    }

    #[test]
    fn test_absorb_without_pv_keeps_previous_pv() {
        let mut analysis = RawAnalysis::default();
        analysis.absorb(&EngineInfo::parse("info depth 8 score cp 5 pv g1f3 d7d5").unwrap());
        analysis.absorb(&EngineInfo::parse("info depth 9 score mate 4").unwrap());
        assert_eq!(analysis.score, Some(Score::Mate(4)));
        assert_eq!(analysis.pv, vec!["g1f3", "d7d5"]);
    }

    #[test]
    fn test_absorb_ignores_scoreless_lines() {
        let mut analysis = RawAnalysis::default();
        analysis.absorb(&EngineInfo::parse("info depth 3 currmove e2e4 currmovenumber 1").unwrap());
        assert_eq!(analysis, RawAnalysis::default());
    }
}
