//! Validated request inputs: the position to analyse and the search depth.

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, Position as _};
use std::fmt;
use thiserror::Error;

/// Client input errors. These are rejected before anything reaches the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    /// The FEN string could not be parsed or describes an illegal position.
    #[error("Invalid FEN: {0}")]
    Fen(String),
    /// The requested depth is outside the supported range.
    #[error("Depth must be between 1 and 30, got {0}")]
    Depth(i64),
}

/// A validated chess position.
///
/// Equality is FEN-string equality: two positions compare equal only when
/// they were created from the same (trimmed) FEN text, which is also what the
/// cache key is derived from.
#[derive(Debug, Clone)]
pub struct Position {
    fen: String,
    board: Chess,
}

impl Position {
    /// Parse and validate a FEN string.
    ///
    /// Castling rights that the board cannot support and an en passant
    /// square with no capture behind it are dropped from the parsed board.
    /// Structural errors such as a missing king still reject the input. The
    /// FEN text itself is kept as given.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput::Fen`] when the text is not FEN or the
    /// position is not legal.
    pub fn from_fen(fen: &str) -> Result<Self, InvalidInput> {
        let fen = fen.trim();
        let parsed: Fen = fen
            .parse()
            .map_err(|e| InvalidInput::Fen(format!("{}", e)))?;
        let board: Chess = parsed
            .into_position(CastlingMode::Standard)
            .or_else(|e| e.ignore_invalid_castling_rights())
            .or_else(|e| e.ignore_invalid_ep_square())
            .map_err(|e| InvalidInput::Fen(e.to_string()))?;

        Ok(Self {
            fen: fen.to_string(),
            board,
        })
    }

    /// The FEN text this position was created from.
    pub fn fen(&self) -> &str {
        &self.fen
    }

    /// The parsed board. Callers that need to play moves should clone it.
    pub fn board(&self) -> &Chess {
        &self.board
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        self.board.turn()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.fen == other.fen
    }
}

impl Eq for Position {}

/// Search depth in plies, always within `Depth::MIN..=Depth::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Depth(u8);

impl Depth {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 30;

    /// Validate a requested depth.
    pub fn new(depth: i64) -> Result<Self, InvalidInput> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&depth) {
            Ok(Depth(depth as u8))
        } else {
            Err(InvalidInput::Depth(depth))
        }
    }

    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
