// src/services/tiers.rs
//! Recursive tier model: the promotion bookkeeping behind "inject".
//!
//! A project holds an append-only stack of tiers. Exactly one tier (the
//! highest-index unfrozen one) is the active master context; everything
//! below is frozen history. Injecting a staged artifact freezes the active
//! tier, synthesizes a read-only summary artifact of it, and spawns a new
//! active tier above whose checkpoint references the frozen one.
//!
//! Ownership rules:
//! - Branches are owned by the tier they forked from and never move.
//! - Artifacts are owned by the project shelf; tiers and the staging bucket
//!   refer to them by id only.
//! - Gates are one shared mutable set per project; every snapshot embedded
//!   in a stamp, artifact or frozen tier is a copy taken at capture time.

use serde::{Deserialize, Serialize};

use crate::services::gates::{Gate, GateState};
use crate::services::stamp::{ConvState, Stamp};

/// Characters of injected content quoted into an auto-artifact summary.
const INJECT_EXCERPT_CHARS: usize = 100;

/// Tier master pins are clipped tighter than free stamps to keep tier
/// checkpoints short.
const TIER_PIN_MAX_CHARS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkType {
    Explore,
    Pivot,
    Refine,
    Challenge,
    Merge,
    Dead,
}

impl ForkType {
    pub fn as_str(self) -> &'static str {
        match self {
            ForkType::Explore => "explore",
            ForkType::Pivot => "pivot",
            ForkType::Refine => "refine",
            ForkType::Challenge => "challenge",
            ForkType::Merge => "merge",
            ForkType::Dead => "dead",
        }
    }

    /// One-glyph marker used in branch summaries.
    pub fn marker(self) -> char {
        match self {
            ForkType::Explore => '→',
            ForkType::Pivot => '↻',
            ForkType::Refine => '▷',
            ForkType::Challenge => '⚔',
            ForkType::Merge => '✧',
            ForkType::Dead => '✕',
        }
    }

    pub fn parse(s: &str) -> Option<ForkType> {
        match s {
            "explore" => Some(ForkType::Explore),
            "pivot" => Some(ForkType::Pivot),
            "refine" => Some(ForkType::Refine),
            "challenge" => Some(ForkType::Challenge),
            "merge" => Some(ForkType::Merge),
            "dead" => Some(ForkType::Dead),
            _ => None,
        }
    }
}

/// A forked line of work under a tier's master context. Owned exclusively
/// by that tier; never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub fork_type: ForkType,
    pub forked_at_depth: u32,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub conv_state: ConvState,
    #[serde(default)]
    pub pin: String,
    /// Master checkpoint frozen at the moment this branch forked.
    #[serde(default)]
    pub stamp_at_fork: String,
}

impl Branch {
    /// One-line status form: `● → jpeg-test [d=3] "JPEG destroys 75% blue"`.
    pub fn summary(&self) -> String {
        let status = if self.conv_state == ConvState::Done {
            '●'
        } else if self.depth > 0 {
            '◐'
        } else {
            '○'
        };
        format!(
            "{} {} {} [d={}] \"{}\"",
            status,
            self.fork_type.marker(),
            self.name,
            self.depth,
            self.pin
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactOrigin {
    /// Collected from a branch by the user.
    Manual,
    /// Synthesized by tier promotion, never by user action.
    TierAuto,
    /// Content was edited after collection.
    Edited,
    /// Already pushed up into a master context.
    Injected,
}

impl ArtifactOrigin {
    pub fn icon(self) -> char {
        match self {
            ArtifactOrigin::Manual => '✋',
            ArtifactOrigin::TierAuto => '⚙',
            ArtifactOrigin::Edited => '✏',
            ArtifactOrigin::Injected => '✓',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    #[default]
    Available,
    Staged,
    Injected,
}

impl ArtifactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Available => "available",
            ArtifactStatus::Staged => "staged",
            ArtifactStatus::Injected => "injected",
        }
    }
}

/// An immutable captured output. Only `status` transitions and at most one
/// content edit are allowed after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    content: String,
    /// Set by the single permitted edit; read through `content()`.
    #[serde(default)]
    edited_content: Option<String>,
    pub origin: ArtifactOrigin,
    pub source_tier: u32,
    /// Branch the content came from; `None` for tier-demotion artifacts.
    #[serde(default)]
    pub source_branch: Option<String>,
    /// Gate set copied at the moment of creation.
    #[serde(default)]
    pub gate_snapshot: Vec<Gate>,
    #[serde(default)]
    pub stamp_at_creation: String,
    #[serde(default)]
    pub status: ArtifactStatus,
}

impl Artifact {
    /// Effective content: the edited override when present.
    pub fn content(&self) -> &str {
        self.edited_content.as_deref().unwrap_or(&self.content)
    }

    pub fn is_edited(&self) -> bool {
        self.edited_content.is_some()
    }

    /// Shelf display line: `[✋] jpeg-findings (tier 0)`.
    pub fn display(&self) -> String {
        format!("[{}] {} (tier {})", self.origin.icon(), self.name, self.source_tier)
    }
}

/// One level of the recursive hierarchy: a master context plus its
/// branches. Freezing is one-way; a frozen tier and everything it owns is
/// read-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    pub level: u32,
    #[serde(default)]
    pub master_depth: u32,
    #[serde(default)]
    pub master_state: ConvState,
    #[serde(default)]
    pub master_pin: String,
    /// Cross-reference fields carried into this tier's stamps.
    #[serde(default)]
    pub look: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub frozen: bool,
    /// Final checkpoint, set once at freeze time.
    #[serde(default)]
    pub frozen_stamp: String,
    /// Artifact id whose injection froze this tier.
    #[serde(default)]
    pub promoted_by: String,
}

impl Tier {
    fn new(level: u32) -> Self {
        Self {
            level,
            master_depth: 0,
            master_state: ConvState::Open,
            master_pin: String::new(),
            look: String::new(),
            chain: String::new(),
            branches: Vec::new(),
            frozen: false,
            frozen_stamp: String::new(),
            promoted_by: String::new(),
        }
    }

    /// Checkpoint record for this tier's master context.
    ///
    /// Tier 0 is the root master context and carries no branch name; higher
    /// tiers are named `t<level>/<project_id>` and reference the tier below
    /// as their parent.
    pub fn record(&self, project_id: &str, gates: &[Gate]) -> Stamp {
        let branch = if self.level == 0 {
            String::new()
        } else {
            format!("t{}/{}", self.level, project_id)
        };
        let parent = if self.level == 0 {
            String::new()
        } else {
            format!("t{}", self.level - 1)
        };
        Stamp {
            branch,
            depth: self.master_depth,
            max_depth: 0,
            parent,
            parent_depth: 0,
            state: self.master_state,
            gates: gates.to_vec(),
            pin: self.master_pin.clone(),
            look: self.look.clone(),
            chain: self.chain.clone(),
            timestamp: String::new(),
        }
    }

    /// Render this tier's master checkpoint through the stamp codec, with
    /// the tighter tier pin clip applied.
    pub fn make_stamp(&self, project_id: &str, gates: &[Gate]) -> String {
        let mut r = self.record(project_id, gates);
        r.pin = r.pin.chars().take(TIER_PIN_MAX_CHARS).collect();
        r.compact()
    }

    /// One-line status form used by tree displays.
    pub fn summary(&self) -> String {
        let status = if self.frozen { "❄ FROZEN" } else { "⚡ ACTIVE" };
        format!(
            "Tier {} [{}] master@d{} state={} branches={} pin=\"{}\"",
            self.level,
            status,
            self.master_depth,
            self.master_state.as_str(),
            self.branches.len(),
            self.master_pin
        )
    }
}

/// The promotion engine: gates, tier stack, artifact shelf and staging
/// bucket for one project. Pure in-memory state; single-writer by design —
/// callers that allow concurrent triggers must serialize access externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Shared mutable gate set, visible to every tier.
    #[serde(default)]
    pub gates: Vec<Gate>,
    /// Append-only; index == level.
    #[serde(default)]
    pub tiers: Vec<Tier>,
    /// Append-only shelf of every artifact across tiers.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Ids of artifacts staged for injection.
    #[serde(default)]
    pub bucket: Vec<String>,
}

impl Project {
    /// Create a project with its shared gate set and tier 0 active.
    pub fn new(id: impl Into<String>, name: impl Into<String>, gates: Vec<Gate>) -> Self {
        let mut p = Self {
            id: id.into(),
            name: name.into(),
            gates,
            tiers: Vec::new(),
            artifacts: Vec::new(),
            bucket: Vec::new(),
        };
        p.push_tier();
        p
    }

    fn push_tier(&mut self) -> usize {
        let t = Tier::new(self.tiers.len() as u32);
        self.tiers.push(t);
        self.tiers.len() - 1
    }

    /// Index of the active tier, creating a fresh one if every tier is
    /// frozen.
    fn current_index(&mut self) -> usize {
        match self.tiers.iter().rposition(|t| !t.frozen) {
            Some(i) => i,
            None => self.push_tier(),
        }
    }

    /// Level of the active tier without forcing creation.
    pub fn current_level(&self) -> Option<u32> {
        self.tiers.iter().rev().find(|t| !t.frozen).map(|t| t.level)
    }

    /// The active (unfrozen) tier — the current master context.
    pub fn current_tier(&mut self) -> &Tier {
        let i = self.current_index();
        &self.tiers[i]
    }

    pub fn current_tier_mut(&mut self) -> &mut Tier {
        let i = self.current_index();
        &mut self.tiers[i]
    }

    /// Compact checkpoint of the current master context.
    pub fn master_stamp(&mut self) -> String {
        let i = self.current_index();
        self.tiers[i].make_stamp(&self.id, &self.gates)
    }

    /// Full checkpoint record of the current master context (for verbose
    /// render, rehydration, or persistence).
    pub fn master_record(&mut self) -> Stamp {
        let i = self.current_index();
        self.tiers[i].record(&self.id, &self.gates)
    }

    /// Fork a branch from the current master. Duplicate names are
    /// permitted; ids stay unique through the per-tier counter.
    pub fn branch_from_master(&mut self, name: &str, fork_type: ForkType) -> &Branch {
        let i = self.current_index();
        let stamp_at_fork = self.tiers[i].make_stamp(&self.id, &self.gates);
        let tier = &mut self.tiers[i];
        let branch = Branch {
            id: format!("b{}-{}", tier.branches.len(), name),
            name: name.to_string(),
            fork_type,
            forked_at_depth: tier.master_depth,
            depth: 0,
            conv_state: ConvState::Open,
            pin: String::new(),
            stamp_at_fork,
        };
        tier.branches.push(branch);
        tier.branches.last().expect("branch just pushed")
    }

    /// Compact checkpoint of one branch of the current tier.
    pub fn branch_stamp(&mut self, branch_id: &str) -> Option<String> {
        let i = self.current_index();
        let tier = &self.tiers[i];
        let b = tier.branches.iter().find(|b| b.id == branch_id)?;
        Some(
            Stamp {
                branch: format!("{}/{}", self.id, b.name),
                depth: b.depth,
                max_depth: 0,
                parent: format!("t{}", tier.level),
                parent_depth: b.forked_at_depth,
                state: b.conv_state,
                gates: self.gates.clone(),
                pin: b.pin.clone(),
                look: String::new(),
                chain: String::new(),
                timestamp: String::new(),
            }
            .compact(),
        )
    }

    /// Record progress on the current master context.
    pub fn progress_master(&mut self, depth: u32, pin: &str) {
        let t = self.current_tier_mut();
        t.master_depth = depth;
        t.master_pin = pin.to_string();
    }

    pub fn set_master_state(&mut self, state: ConvState) {
        self.current_tier_mut().master_state = state;
    }

    pub fn set_look(&mut self, look: &str) {
        self.current_tier_mut().look = look.to_string();
    }

    pub fn set_chain(&mut self, chain: &str) {
        self.current_tier_mut().chain = chain.to_string();
    }

    /// Record progress on a branch of the current tier. Unknown id → `None`.
    pub fn progress_branch(
        &mut self,
        branch_id: &str,
        depth: u32,
        pin: &str,
        conv_state: Option<ConvState>,
    ) -> Option<()> {
        let i = self.current_index();
        let b = self.tiers[i].branches.iter_mut().find(|b| b.id == branch_id)?;
        b.depth = depth;
        b.pin = pin.to_string();
        if let Some(state) = conv_state {
            b.conv_state = state;
        }
        Some(())
    }

    // ---- gates ----

    pub fn gate(&self, letter: char) -> Option<&Gate> {
        self.gates.iter().find(|g| g.letter == letter)
    }

    /// Explicit assignment; the only route into BLOCKED/REVISIT.
    pub fn set_gate(&mut self, letter: char, state: GateState) -> Option<()> {
        let g = self.gates.iter_mut().find(|g| g.letter == letter)?;
        g.state = state;
        Some(())
    }

    /// Advance a gate one step around the fixed cycle; returns the new
    /// state. Unknown letter → `None`.
    pub fn cycle_gate(&mut self, letter: char) -> Option<GateState> {
        let g = self.gates.iter_mut().find(|g| g.letter == letter)?;
        g.cycle();
        Some(g.state)
    }

    // ---- artifacts ----

    pub fn artifact(&self, artifact_id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == artifact_id)
    }

    /// Manually collect content from a branch into the shelf and the
    /// staging bucket. Unknown branch id → `None`.
    pub fn collect_artifact(
        &mut self,
        branch_id: &str,
        name: &str,
        content: &str,
    ) -> Option<&Artifact> {
        let i = self.current_index();
        if !self.tiers[i].branches.iter().any(|b| b.id == branch_id) {
            return None;
        }
        let stamp = self.tiers[i].make_stamp(&self.id, &self.gates);
        let art = Artifact {
            id: format!("art-{}", self.artifacts.len()),
            name: name.to_string(),
            content: content.to_string(),
            edited_content: None,
            origin: ArtifactOrigin::Manual,
            source_tier: self.tiers[i].level,
            source_branch: Some(branch_id.to_string()),
            gate_snapshot: self.gates.clone(),
            stamp_at_creation: stamp,
            status: ArtifactStatus::Available,
        };
        self.bucket.push(art.id.clone());
        self.artifacts.push(art);
        self.artifacts.last()
    }

    /// Stage a shelf artifact for injection. Injected artifacts cannot be
    /// re-staged. Unknown id → `None`.
    pub fn stage_artifact(&mut self, artifact_id: &str) -> Option<()> {
        let a = self.artifacts.iter_mut().find(|a| a.id == artifact_id)?;
        if a.status == ArtifactStatus::Injected {
            return None;
        }
        a.status = ArtifactStatus::Staged;
        if !self.bucket.iter().any(|id| id == artifact_id) {
            self.bucket.push(artifact_id.to_string());
        }
        Some(())
    }

    /// Apply the single permitted content edit. A second edit, or an edit
    /// of an injected artifact, is refused.
    pub fn edit_artifact(&mut self, artifact_id: &str, content: &str) -> Option<()> {
        let a = self.artifacts.iter_mut().find(|a| a.id == artifact_id)?;
        if a.is_edited() || a.status == ArtifactStatus::Injected {
            return None;
        }
        a.edited_content = Some(content.to_string());
        a.origin = ArtifactOrigin::Edited;
        Some(())
    }

    /// Inject a staged artifact into the master: freeze the active tier,
    /// synthesize its summary artifact, spawn the next tier above.
    ///
    /// Returns the new tier and the auto-artifact, or `None` when the id is
    /// unknown, not staged in the bucket, or already injected — in every
    /// refusal case tier state is left untouched.
    pub fn inject(&mut self, artifact_id: &str) -> Option<(&Tier, &Artifact)> {
        if !self.bucket.iter().any(|id| id == artifact_id) {
            return None;
        }
        let art_idx = self.artifacts.iter().position(|a| a.id == artifact_id)?;
        if self.artifacts[art_idx].status == ArtifactStatus::Injected {
            return None;
        }

        self.bucket.retain(|id| id != artifact_id);
        self.artifacts[art_idx].status = ArtifactStatus::Injected;

        // Freeze the active tier. One-way: a frozen tier can never be the
        // promotion target again.
        let old_idx = self.current_index();
        let frozen_stamp = self.tiers[old_idx].make_stamp(&self.id, &self.gates);
        let old = &mut self.tiers[old_idx];
        old.frozen = true;
        old.frozen_stamp = frozen_stamp.clone();
        old.promoted_by = artifact_id.to_string();
        let old_level = old.level;

        // Synthesize the tier conclusion. Shelf only, never the bucket:
        // it is reference material until someone stages it explicitly.
        let branch_lines: Vec<String> = self.tiers[old_idx]
            .branches
            .iter()
            .map(|b| format!("  {}", b.summary()))
            .collect();
        let gate_line: Vec<String> = self.gates.iter().map(|g| g.symbol()).collect();
        let promoting = &self.artifacts[art_idx];
        let excerpt: String = promoting.content().chars().take(INJECT_EXCERPT_CHARS).collect();
        let auto_content = format!(
            "=== TIER {} CONCLUSION ===\n\
             Master was at depth {}, state {}\n\
             Master pin: \"{}\"\n\
             Gates: {}\n\
             \n\
             Branches explored:\n\
             {}\n\
             \n\
             Promoted by: {}\n\
             Injected content: {}...\n\
             \n\
             Frozen stamp: {}",
            old_level,
            self.tiers[old_idx].master_depth,
            self.tiers[old_idx].master_state.as_str(),
            self.tiers[old_idx].master_pin,
            gate_line.join(" "),
            branch_lines.join("\n"),
            promoting.name,
            excerpt,
            frozen_stamp,
        );
        let auto = Artifact {
            id: format!("tier-{old_level}-auto"),
            name: format!("Tier {}: {}", old_level, self.tiers[old_idx].master_pin),
            content: auto_content,
            edited_content: None,
            origin: ArtifactOrigin::TierAuto,
            source_tier: old_level,
            source_branch: None,
            gate_snapshot: self.gates.clone(),
            stamp_at_creation: frozen_stamp,
            status: ArtifactStatus::Available,
        };
        self.artifacts.push(auto);
        let auto_idx = self.artifacts.len() - 1;

        // Spawn the next master above the frozen tier.
        let new_idx = self.push_tier();
        self.tiers[new_idx].master_pin = format!("promoted from tier {old_level}");

        Some((&self.tiers[new_idx], &self.artifacts[auto_idx]))
    }
}
