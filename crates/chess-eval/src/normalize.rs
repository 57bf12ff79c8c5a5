//! Conversion of raw engine output into the stable result shape.
//!
//! Two independent steps:
//!
//! - the score, reported relative to the side to move, is re-expressed from
//!   White's point of view, with mates mapped to `±(10000 - distance)`;
//! - the UCI principal variation is replayed on a copy of the board and
//!   rendered as SAN, stopping at the first move that does not apply.

use crate::engine::RawAnalysis;
use crate::evaluation::{Computed, EvaluationResult, Fault};
use crate::Position;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color};
use uci::Score;

/// Magnitude of a mate score before subtracting the mate distance.
pub const MATE_SCORE: i32 = 10_000;

/// Plies of the principal variation rendered by default.
pub const DEFAULT_PV_PLIES: usize = 4;

/// Appended to the raw notation of a PV move that is illegal on the replay board.
pub const ILLEGAL_SUFFIX: &str = "(illegal)";

/// Convert an engine score to White's point of view.
///
/// `Mate(0)` means the side to move is already checkmated.
pub fn white_score(score: Score, turn: Color) -> i32 {
    let side_to_move = match score {
        Score::Cp(cp) => cp,
        Score::Mate(n) if n > 0 => MATE_SCORE.saturating_sub(n),
        Score::Mate(n) => (-MATE_SCORE).saturating_sub(n),
    };
    match turn {
        Color::White => side_to_move,
        Color::Black => side_to_move.saturating_neg(),
    }
}

/// Why PV rendering stopped before the end of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PvStop {
    /// The move is not legal in the replayed position.
    IllegalMove { ply: usize, uci: String },
    /// The move is not valid UCI notation at all.
    Unreadable { ply: usize, uci: String },
}

/// A rendered principal variation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPv {
    /// SAN moves that replayed cleanly.
    pub moves: Vec<String>,
    pub stop: Option<PvStop>,
}

impl RenderedPv {
    /// Space-separated form used in [`EvaluationResult::pv`].
    ///
    /// An illegal move is appended as `<uci>(illegal)`; an unreadable one is
    /// appended as-is.
    pub fn to_pv_string(&self) -> String {
        let mut parts = self.moves.clone();
        match &self.stop {
            Some(PvStop::IllegalMove { uci, .. }) => parts.push(format!("{}{}", uci, ILLEGAL_SUFFIX)),
            Some(PvStop::Unreadable { uci, .. }) => parts.push(uci.clone()),
            None => {}
        }
        parts.join(" ")
    }
}

/// Replay up to `max_plies` UCI moves from `start` and render them as SAN.
///
/// Each move is checked against the position reached so far, not the
/// starting position.
pub fn render_pv(start: &Chess, moves: &[String], max_plies: usize) -> RenderedPv {
    let mut board = start.clone();
    let mut rendered = RenderedPv::default();

    for (ply, raw) in moves.iter().take(max_plies).enumerate() {
        let uci: UciMove = match raw.parse() {
            Ok(uci) => uci,
            Err(_) => {
                rendered.stop = Some(PvStop::Unreadable {
                    ply,
                    uci: raw.clone(),
                });
                break;
            }
        };
        let m = match uci.to_move(&board) {
            Ok(m) => m,
            Err(_) => {
                rendered.stop = Some(PvStop::IllegalMove {
                    ply,
                    uci: raw.clone(),
                });
                break;
            }
        };
        rendered
            .moves
            .push(SanPlus::from_move_and_play_unchecked(&mut board, &m).to_string());
    }

    rendered
}

/// Both halves of a normalized result, before they are collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub score: Result<i32, Fault>,
    pub pv: RenderedPv,
}

impl Normalized {
    /// Collapse into the two-field payload.
    ///
    /// A missing score yields `score_cp = 0` and a pv of `ERROR:NO_SCORE`
    /// followed by whatever moves were rendered.
    pub fn into_computed(self) -> Computed {
        let pv = self.pv.to_pv_string();
        match self.score {
            Ok(score_cp) => Computed::ok(EvaluationResult { score_cp, pv }),
            Err(fault) => {
                let tag = fault.pv_tag();
                let pv = if pv.is_empty() {
                    tag
                } else {
                    format!("{} {}", tag, pv)
                };
                Computed {
                    result: EvaluationResult { score_cp: 0, pv },
                    fault: Some(fault),
                }
            }
        }
    }
}

/// Turns [`RawAnalysis`] into results for one position.
///
/// Holds only the PV length limit, so one normalizer can be shared by every
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    pv_plies: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PV_PLIES)
    }
}

impl Normalizer {
    /// Create a normalizer.
    ///
    /// # Arguments
    ///
    /// * `pv_plies` - Maximum number of principal variation moves rendered
    ///   into a result. Zero renders an empty PV.
    pub fn new(pv_plies: usize) -> Self {
        Self { pv_plies }
    }

    pub fn pv_plies(&self) -> usize {
        self.pv_plies
    }

    /// Normalize one engine answer for `position`.
    ///
    /// # Arguments
    ///
    /// * `raw` - Last exact main-line report of the search
    /// * `position` - The analysed position; its side to move fixes the
    ///   score sign and its board is the start of the PV replay
    ///
    /// # Returns
    ///
    /// The White-relative score, or [`Fault::NoScore`] when the engine never
    /// reported one, next to the rendered PV.
    pub fn normalize(&self, raw: &RawAnalysis, position: &Position) -> Normalized {
        let score = match raw.score {
            Some(score) => Ok(white_score(score, position.turn())),
            None => {
                tracing::warn!(fen = position.fen(), "Engine reported no score");
                Err(Fault::NoScore)
            }
        };

        let pv = render_pv(position.board(), &raw.pv, self.pv_plies);
        if let Some(stop) = &pv.stop {
            tracing::warn!(fen = position.fen(), ?stop, "Principal variation truncated");
        }

        Normalized { score, pv }
    }
}
