// src/services/stamp.rs
//! Stamp codec: one checkpoint record, three renderings.
//!
//! - `compact()` — the bracketed, pipe-delimited wire form prefixed to every
//!   outbound message. Empty fields are omitted entirely, each field carries
//!   a unique one-glyph tag, and the whole thing stays short enough to ride
//!   in front of a prompt.
//! - `parse_compact()` — the inverse: tag-glyph dispatch back into a record.
//!   Anything not wrapped as `[OLO|…]` is rejected with `None`, never a
//!   panic. Unknown tags are skipped so newer writers stay readable.
//! - `full()` / `rehydrate()` — human-facing renders. The rehydration block
//!   is write-only: it re-grounds a resumed session and is never parsed.
//!
//! A `Stamp` is an immutable snapshot. Its gate list is a copy taken at
//! construction time; re-rendering current state means building a new stamp.

use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::services::gates::{Gate, GateState};

/// Protocol marker leading every compact stamp.
pub const PROTOCOL: &str = "OLO";

/// Pin text is clipped to this many characters in the compact form.
pub const PIN_MAX_CHARS: usize = 30;

// One-glyph field tags, in canonical field order. Decode dispatches on the
// first char of each pipe-separated part; `|` itself never appears in a
// value (pin spaces become dashes, other free text is caller-controlled).
const TAG_BRANCH: char = '🌿';
const TAG_DEPTH: char = '📍';
const TAG_PARENT: char = '⬆';
const TAG_STATE: char = '⚡';
const TAG_GATES: char = '🔒';
const TAG_PIN: char = '📌';
const TAG_LOOK: char = '👁';
const TAG_CHAIN: char = '🔗';
const TAG_TIME: char = '⏱';

/// Conversation state of the checkpointed thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConvState {
    #[default]
    Open,
    Gate,
    Done,
    Fork,
    Hold,
    Dead,
}

impl ConvState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConvState::Open => "OPEN",
            ConvState::Gate => "GATE",
            ConvState::Done => "DONE",
            ConvState::Fork => "FORK",
            ConvState::Hold => "HOLD",
            ConvState::Dead => "DEAD",
        }
    }

    pub fn parse(s: &str) -> Option<ConvState> {
        match s {
            "OPEN" => Some(ConvState::Open),
            "GATE" => Some(ConvState::Gate),
            "DONE" => Some(ConvState::Done),
            "FORK" => Some(ConvState::Fork),
            "HOLD" => Some(ConvState::Hold),
            "DEAD" => Some(ConvState::Dead),
            _ => None,
        }
    }
}

/// One checkpoint in the thought-tree. Field names match the persisted JSON
/// schema one-for-one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stamp {
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub max_depth: u32,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub parent_depth: u32,
    #[serde(default)]
    pub state: ConvState,
    #[serde(default)]
    pub gates: Vec<Gate>,
    #[serde(default)]
    pub pin: String,
    #[serde(default)]
    pub look: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Stamp {
    /// Render the compact wire form, timestamped with the current local
    /// wall time (`MMDDThhmm`). Canonical field order; empty fields (and
    /// their separators) are dropped.
    pub fn compact(&self) -> String {
        let ts = Local::now().format("%m%dT%H%M").to_string();
        let gate_str: String = self.gates.iter().map(|g| g.symbol()).collect();
        let parent_str = if self.parent.is_empty() {
            String::new()
        } else {
            format!("{}@d{}", self.parent, self.parent_depth)
        };
        let pin_short = shorten_pin(&self.pin, PIN_MAX_CHARS);

        let mut parts: Vec<String> = Vec::with_capacity(10);
        parts.push(PROTOCOL.to_string());
        if !self.branch.is_empty() {
            parts.push(format!("{TAG_BRANCH}{}", self.branch));
        }
        parts.push(format!("{TAG_DEPTH}{}/{}", self.depth, self.max_depth));
        if !parent_str.is_empty() {
            parts.push(format!("{TAG_PARENT}{parent_str}"));
        }
        parts.push(format!("{TAG_STATE}{}", self.state.as_str()));
        if !gate_str.is_empty() {
            parts.push(format!("{TAG_GATES}{gate_str}"));
        }
        if !pin_short.is_empty() {
            parts.push(format!("{TAG_PIN}{pin_short}"));
        }
        if !self.look.is_empty() {
            parts.push(format!("{TAG_LOOK}{}", self.look));
        }
        if !self.chain.is_empty() {
            parts.push(format!("{TAG_CHAIN}{}", self.chain));
        }
        parts.push(format!("{TAG_TIME}{ts}"));

        format!("[{}]", parts.join("|"))
    }

    /// Parse a compact stamp back into a record.
    ///
    /// Returns `None` for anything not wrapped as `[OLO|…]`. Field-level
    /// noise degrades to defaults: unknown tags and malformed numbers are
    /// skipped, unknown gate glyphs read as OPEN. Gate questions are not
    /// carried on the wire, so decoded gates come back with empty questions.
    pub fn parse_compact(line: &str) -> Option<Stamp> {
        if !line.starts_with("[OLO|") || !line.ends_with(']') {
            return None;
        }
        let inner = &line[1..line.len() - 1];
        let mut stamp = Stamp::default();
        for part in inner.split('|') {
            if part == PROTOCOL {
                continue;
            }
            let mut chars = part.chars();
            let Some(tag) = chars.next() else { continue };
            let value = chars.as_str();
            match tag {
                TAG_BRANCH => stamp.branch = value.to_string(),
                TAG_DEPTH => {
                    let mut nums = value.splitn(2, '/');
                    if let Some(d) = nums.next().and_then(|n| n.parse().ok()) {
                        stamp.depth = d;
                    }
                    if let Some(m) = nums.next().and_then(|n| n.parse().ok()) {
                        stamp.max_depth = m;
                    }
                }
                TAG_PARENT => match value.rsplit_once("@d") {
                    Some((name, dp)) => {
                        stamp.parent = name.to_string();
                        stamp.parent_depth = dp.parse().unwrap_or(0);
                    }
                    None => stamp.parent = value.to_string(),
                },
                // Field-level noise degrades to the default, never an error.
                TAG_STATE => stamp.state = ConvState::parse(value).unwrap_or_default(),
                TAG_GATES => {
                    let glyphs: Vec<char> = value.chars().collect();
                    for pair in glyphs.chunks(2) {
                        if let [letter, glyph] = pair {
                            stamp.gates.push(Gate {
                                letter: *letter,
                                question: String::new(),
                                state: GateState::from_glyph(*glyph).unwrap_or_default(),
                            });
                        }
                    }
                }
                TAG_PIN => stamp.pin = value.replace('-', " "),
                TAG_LOOK => stamp.look = value.to_string(),
                TAG_CHAIN => stamp.chain = value.to_string(),
                TAG_TIME => stamp.timestamp = value.to_string(),
                _ => {} // forward compatibility: unknown tags are ignored
            }
        }
        Some(stamp)
    }

    /// Verbose boxed rendering for display. Not machine-parseable.
    pub fn full(&self) -> String {
        let rule = |c: char| format!("+{}+", c.to_string().repeat(52));
        let mut lines = Vec::new();
        lines.push(rule('='));
        lines.push(format!("| OLO STAMP v1{}|", " ".repeat(39)));
        lines.push(rule('-'));
        if !self.branch.is_empty() {
            lines.push(format!("|  {TAG_BRANCH} branch: {}", self.branch));
        }
        lines.push(format!(
            "|  {TAG_DEPTH} depth:  {}/{}",
            self.depth, self.max_depth
        ));
        if !self.parent.is_empty() {
            lines.push(format!(
                "|  {TAG_PARENT}  parent: {}@d{}",
                self.parent, self.parent_depth
            ));
        }
        lines.push(format!("|  {TAG_STATE} state:  {}", self.state.as_str()));
        if !self.gates.is_empty() {
            let gate_str: Vec<String> = self.gates.iter().map(|g| g.display()).collect();
            lines.push(format!("|  {TAG_GATES} gates:  {}", gate_str.join(" ")));
        }
        if !self.pin.is_empty() {
            lines.push(format!("|  {TAG_PIN} last:   \"{}\"", self.pin));
        }
        if !self.look.is_empty() {
            lines.push(format!("|  {TAG_LOOK}  look:   {}", self.look));
        }
        if !self.chain.is_empty() {
            lines.push(format!("|  {TAG_CHAIN} chain:  {}", self.chain));
        }
        lines.push(format!(
            "|  {TAG_TIME}  time:   {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S")
        ));
        lines.push(rule('='));
        lines.join("\n")
    }

    /// Build the write-only rehydration block that re-grounds a resumed
    /// session: project, position, expanded gates, last finding, optional
    /// per-branch findings and a verbatim tree snapshot.
    pub fn rehydrate(
        &self,
        tree_state: Option<&str>,
        findings: Option<&BTreeMap<String, String>>,
    ) -> String {
        let project = match self.branch.split_once('/') {
            Some((head, _)) => head,
            None => self.branch.as_str(),
        };
        let mut block = Vec::new();
        block.push("[OLO REHYDRATE]".to_string());
        block.push(format!("PROJECT: {project}"));
        block.push(format!(
            "ACTIVE BRANCH: {} (depth {}/{})",
            self.branch, self.depth, self.max_depth
        ));
        block.push(format!("STATE: {}", self.state.as_str()));
        block.push(String::new());
        if !self.gates.is_empty() {
            block.push("DECISION GATES:".to_string());
            for g in &self.gates {
                block.push(format!("  {}: {}", g.letter, g.question));
                block.push(format!("     -> {} {}", g.state.glyph(), g.state.label()));
            }
            block.push(String::new());
        }
        if !self.pin.is_empty() {
            block.push(format!("LAST FINDING: {}", self.pin));
            block.push(String::new());
        }
        if let Some(findings) = findings {
            if !findings.is_empty() {
                block.push("KEY FINDINGS FROM ALL BRANCHES:".to_string());
                for (bname, finding) in findings {
                    block.push(format!("  {TAG_PIN} {bname}: \"{finding}\""));
                }
                block.push(String::new());
            }
        }
        if let Some(tree) = tree_state {
            block.push("TREE:".to_string());
            block.push(tree.to_string());
            block.push(String::new());
        }
        if !self.look.is_empty() {
            block.push(format!("CONTEXT: {}", self.look));
        }
        block.push(String::new());
        block.push(
            "Continue from this state. Gates show decisions. Findings are cherry-picked."
                .to_string(),
        );
        block.push("[/OLO REHYDRATE]".to_string());
        block.join("\n")
    }
}

/// Clip a pin to `limit` characters and swap spaces for dashes so it can
/// ride inside the pipe-delimited wire form.
fn shorten_pin(pin: &str, limit: usize) -> String {
    pin.chars().take(limit).collect::<String>().replace(' ', "-")
}
