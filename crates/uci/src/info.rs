//! `info` lines reported by the engine during a search.

/// Score in centipawns or mate distance, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = side to move
    /// gets mated, 0 = side to move is already mated).
    Mate(i32),
}

/// Marks a score reported from an aspiration window fail rather than an
/// exact search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

/// One parsed `info` line. Fields the line does not mention stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    /// Index of the line when the engine reports several (1-based).
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    /// Set when the score is only a bound.
    pub bound: Option<Bound>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    /// Milliseconds since the search started.
    pub time: Option<u64>,
    /// Principal variation in UCI long algebraic notation.
    pub pv: Vec<String>,
    /// Free text after `string`, up to the end of the line.
    pub string: Option<String>,
}

impl EngineInfo {
    /// True for an exact score on the main line.
    pub fn is_exact_main_line(&self) -> bool {
        self.score.is_some() && self.bound.is_none() && self.multipv.unwrap_or(1) == 1
    }

    /// Parse an `info` line. Returns `None` for any other line.
    ///
    /// Unknown keywords are skipped, and a value that does not parse leaves
    /// its field unset instead of failing the whole line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::default();
        while let Some(keyword) = tokens.next() {
            match keyword {
                "depth" => info.depth = tokens.next().and_then(|v| v.parse().ok()),
                "seldepth" => info.seldepth = tokens.next().and_then(|v| v.parse().ok()),
                "multipv" => info.multipv = tokens.next().and_then(|v| v.parse().ok()),
                "nodes" => info.nodes = tokens.next().and_then(|v| v.parse().ok()),
                "nps" => info.nps = tokens.next().and_then(|v| v.parse().ok()),
                "time" => info.time = tokens.next().and_then(|v| v.parse().ok()),
                "score" => {
                    let kind = tokens.next();
                    let value = tokens.next().and_then(|v| v.parse().ok());
                    match (kind, value) {
                        (Some("cp"), Some(cp)) => info.score = Some(Score::Cp(cp)),
                        (Some("mate"), Some(n)) => info.score = Some(Score::Mate(n)),
                        _ => {}
                    }
                }
                "lowerbound" => info.bound = Some(Bound::Lower),
                "upperbound" => info.bound = Some(Bound::Upper),
                "pv" => {
                    while let Some(mv) = tokens.next_if(|t| !is_keyword(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    info.string = Some(tokens.by_ref().collect::<Vec<_>>().join(" "));
                }
                _ => {}
            }
        }

        Some(info)
    }
}

/// Keywords that can follow a `pv` and end the move list.
fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "multipv"
            | "score"
            | "lowerbound"
            | "upperbound"
            | "nodes"
            | "nps"
            | "time"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "tbhits"
            | "sbhits"
            | "cpuload"
            | "wdl"
            | "refutation"
            | "currline"
            | "string"
    )
}
