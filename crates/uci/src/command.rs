//! Commands written to the engine.

use std::fmt;

/// The subset of GUI-to-engine commands needed to run a fixed-depth analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuiCommand {
    /// Switch the engine to UCI mode; answered by `id ...` and `uciok`.
    Uci,
    /// Synchronize; answered by `readyok`.
    IsReady,
    /// Set up the position to analyse.
    Position { fen: String },
    /// Search to a fixed depth; answered by `info ...` lines and `bestmove`.
    GoDepth(u32),
    /// Exit the engine.
    Quit,
}

impl fmt::Display for GuiCommand {
    /// The command as a single UCI line, without the newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiCommand::Uci => f.write_str("uci"),
            GuiCommand::IsReady => f.write_str("isready"),
            GuiCommand::Position { fen } => write!(f, "position fen {}", fen),
            GuiCommand::GoDepth(depth) => write!(f, "go depth {}", depth),
            GuiCommand::Quit => f.write_str("quit"),
        }
    }
}
