// src/services/gates.rs
//! Decision gates: single-letter yes/no/partial markers shared across a project.
//!
//! - A gate cycles through the fixed sequence OPEN → HALF → YES → NO → OPEN.
//! - BLOCKED and REVISIT sit outside the cycle and are reachable only by an
//!   explicit `set`; cycling from either re-enters the cycle at OPEN.
//! - Everything that embeds gates into a stamp, tier or artifact stores a
//!   by-value copy, never a live reference, so frozen snapshots stay frozen
//!   while the project's shared gate set keeps evolving.

use serde::{Deserialize, Serialize};

/// The ordered cycle a gate walks through on repeated `cycle()` calls.
pub const GATE_CYCLE: [GateState; 4] = [
    GateState::Open,
    GateState::Half,
    GateState::Yes,
    GateState::No,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum GateState {
    #[default]
    Open,
    Half,
    Yes,
    No,
    Blocked,
    Revisit,
}

impl GateState {
    /// Single-glyph compact marker used inside stamps.
    pub fn glyph(self) -> char {
        match self {
            GateState::Open => '○',
            GateState::Half => '◐',
            GateState::Yes => '●',
            GateState::No => '✕',
            GateState::Blocked => '◈',
            GateState::Revisit => '↺',
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '○' => Some(GateState::Open),
            '◐' => Some(GateState::Half),
            '●' => Some(GateState::Yes),
            '✕' => Some(GateState::No),
            '◈' => Some(GateState::Blocked),
            '↺' => Some(GateState::Revisit),
            _ => None,
        }
    }

    /// Human label used by the rehydration block.
    pub fn label(self) -> &'static str {
        match self {
            GateState::Open => "OPEN (undecided)",
            GateState::Half => "PARTIAL (exploring)",
            GateState::Yes => "YES (confirmed)",
            GateState::No => "NO (rejected)",
            GateState::Blocked => "BLOCKED (waiting)",
            GateState::Revisit => "REVISIT (reopened)",
        }
    }

    pub fn in_cycle(self) -> bool {
        GATE_CYCLE.contains(&self)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(GateState::Open),
            "half" => Some(GateState::Half),
            "yes" => Some(GateState::Yes),
            "no" => Some(GateState::No),
            "blocked" => Some(GateState::Blocked),
            "revisit" => Some(GateState::Revisit),
            _ => None,
        }
    }
}

// Persisted as the bare glyph so stamp JSON files stay byte-compatible with
// the compact wire form. Unknown glyphs degrade to Open, mirroring decode.
impl From<GateState> for String {
    fn from(s: GateState) -> String {
        s.glyph().to_string()
    }
}

impl From<String> for GateState {
    fn from(s: String) -> GateState {
        s.chars()
            .next()
            .and_then(GateState::from_glyph)
            .unwrap_or_default()
    }
}

/// One tracked decision point. `letter` is unique within a project's gate
/// set; `question` is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub letter: char,
    pub question: String,
    #[serde(default)]
    pub state: GateState,
}

impl Gate {
    pub fn new(letter: char, question: impl Into<String>) -> Self {
        Self {
            letter,
            question: question.into(),
            state: GateState::Open,
        }
    }

    /// Advance one step around the fixed cycle. BLOCKED/REVISIT are not in
    /// the cycle; from either, the gate re-enters at OPEN.
    pub fn cycle(&mut self) {
        self.state = match GATE_CYCLE.iter().position(|s| *s == self.state) {
            Some(idx) => GATE_CYCLE[(idx + 1) % GATE_CYCLE.len()],
            None => GateState::Open,
        };
    }

    /// Two-character compact form: letter + state glyph, e.g. `A●`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.letter, self.state.glyph())
    }

    /// Bracketed display form used in verbose renders, e.g. `[A●]`.
    pub fn display(&self) -> String {
        format!("[{}{}]", self.letter, self.state.glyph())
    }
}
