//! Controller side of the UCI (Universal Chess Interface) protocol.
//!
//! Just enough of the protocol to drive an analysis engine: format the
//! commands a controller writes ([`GuiCommand`]) and parse the lines it reads
//! back ([`EngineMessage`]).
//!
//! ```text
//! > uci                 < id name ... / uciok
//! > isready             < readyok
//! > position fen <fen>
//! > go depth <n>        < info ... (repeated) / bestmove <move> [ponder <move>]
//! > quit
//! ```

mod command;
mod info;

pub use command::GuiCommand;
pub use info::{Bound, EngineInfo, Score};

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. `None` when the position has no legal moves
    /// (engines answer `bestmove (none)` or `bestmove 0000`).
    BestMove { mv: Option<String>, ponder: Option<String> },
    /// Anything else (`option ...`, copyright banners, debug chatter).
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next().unwrap_or("") {
            "id" => match parts.next() {
                Some("name") => EngineMessage::Id {
                    name: Some(parts.collect::<Vec<_>>().join(" ")),
                    author: None,
                },
                Some("author") => EngineMessage::Id {
                    name: None,
                    author: Some(parts.collect::<Vec<_>>().join(" ")),
                },
                _ => EngineMessage::Other(line.to_string()),
            },
            "uciok" => EngineMessage::UciOk,
            "readyok" => EngineMessage::ReadyOk,
            "info" => match EngineInfo::parse(line) {
                Some(info) => EngineMessage::Info(info),
                None => EngineMessage::Other(line.to_string()),
            },
            "bestmove" => {
                let mv = parts
                    .next()
                    .filter(|m| *m != "(none)" && *m != "0000")
                    .map(str::to_string);
                let ponder = match parts.next() {
                    Some("ponder") => parts.next().map(str::to_string),
                    _ => None,
                };
                EngineMessage::BestMove { mv, ponder }
            }
            _ => EngineMessage::Other(line.to_string()),
        }
    }
}
