// olo-core/src/commands/api.rs
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::Utc;
use serde_json::json;

use crate::commands::init::ensure_initialized_once;
use crate::services::gates::{Gate, GateState};
use crate::services::stamp::{ConvState, Stamp};
use crate::services::tiers::{ArtifactStatus, ForkType, Project};
use crate::session::search::{SearchHit, search_sessions};
use crate::session::store::StampStore;
use crate::utils::logbook;

/// One project's command surface. Each method maps 1:1 onto a CLI verb;
/// mutating verbs persist the whole project and append a logbook event.
///
/// Core "no result" outcomes surface as `Ok(None)`; `Err` is reserved for
/// the I/O boundary (persistence, init).
pub struct Commands {
    project: Project,
    store: StampStore,
}

impl Commands {
    /// Create a fresh project with its shared gate set and tier 0 active.
    /// Refuses to clobber an existing project file.
    pub fn create_project(id: &str, name: &str, gate_specs: &[(char, String)]) -> Result<Self> {
        let report = ensure_initialized_once()?;
        let store = StampStore::open(&report.config.session.sessions_path)?;
        if store.project_exists(id) {
            return Err(anyhow!("project already exists: {id}"));
        }
        let gates: Vec<Gate> = gate_specs
            .iter()
            .map(|(letter, question)| Gate::new(*letter, question.clone()))
            .collect();
        let project = Project::new(id, name, gates);
        let cmd = Self { project, store };
        cmd.log_event(
            "project_created",
            json!({"id": id, "name": name, "gates": gate_specs.len()}),
        );
        cmd.persist()?;
        Ok(cmd)
    }

    /// Open a previously persisted project.
    pub fn open(project_id: &str) -> Result<Self> {
        let report = ensure_initialized_once()?;
        let store = StampStore::open(&report.config.session.sessions_path)?;
        let project = store
            .load_project(project_id)?
            .ok_or_else(|| anyhow!("unknown project: {project_id}"))?;
        Ok(Self { project, store })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    // ---- tree mutation ----

    /// Fork a branch from the current master; returns the branch id.
    pub fn fork(&mut self, name: &str, fork_type: ForkType) -> Result<String> {
        let id = self.project.branch_from_master(name, fork_type).id.clone();
        tracing::debug!("forked branch {id} ({})", fork_type.as_str());
        self.log_event(
            "branch_forked",
            json!({"branch": id, "fork_type": fork_type.as_str()}),
        );
        self.persist()?;
        Ok(id)
    }

    /// Record progress on the master context (depth + latest finding).
    pub fn progress(&mut self, depth: u32, pin: &str) -> Result<()> {
        self.project.progress_master(depth, pin);
        self.log_event("master_progress", json!({"depth": depth, "pin": pin}));
        self.persist()
    }

    /// Record progress on a branch of the current tier.
    pub fn branch_progress(
        &mut self,
        branch_id: &str,
        depth: u32,
        pin: &str,
        state: Option<ConvState>,
    ) -> Result<Option<()>> {
        let Some(()) = self.project.progress_branch(branch_id, depth, pin, state) else {
            return Ok(None);
        };
        self.log_event(
            "branch_progress",
            json!({"branch": branch_id, "depth": depth, "pin": pin}),
        );
        self.persist()?;
        Ok(Some(()))
    }

    pub fn set_state(&mut self, state: ConvState) -> Result<()> {
        self.project.set_master_state(state);
        self.persist()
    }

    pub fn set_look(&mut self, look: &str) -> Result<()> {
        self.project.set_look(look);
        self.persist()
    }

    pub fn set_chain(&mut self, chain: &str) -> Result<()> {
        self.project.set_chain(chain);
        self.persist()
    }

    // ---- artifacts ----

    /// Collect content from a branch into the shelf + bucket; returns the
    /// new artifact id, or `Ok(None)` for an unknown branch.
    pub fn collect(&mut self, branch_id: &str, name: &str, content: &str) -> Result<Option<String>> {
        let Some(art) = self.project.collect_artifact(branch_id, name, content) else {
            return Ok(None);
        };
        let id = art.id.clone();
        if let Ok(report) = ensure_initialized_once() {
            let _ = logbook::append_log(
                &report.config.logbook.path,
                &id,
                &Utc::now().to_rfc3339(),
                "artifact_collected",
                content,
            );
        }
        self.persist()?;
        Ok(Some(id))
    }

    pub fn stage(&mut self, artifact_id: &str) -> Result<Option<()>> {
        let Some(()) = self.project.stage_artifact(artifact_id) else {
            return Ok(None);
        };
        self.log_event("artifact_staged", json!({"artifact": artifact_id}));
        self.persist()?;
        Ok(Some(()))
    }

    pub fn edit(&mut self, artifact_id: &str, content: &str) -> Result<Option<()>> {
        let Some(()) = self.project.edit_artifact(artifact_id, content) else {
            return Ok(None);
        };
        self.log_event("artifact_edited", json!({"artifact": artifact_id}));
        self.persist()?;
        Ok(Some(()))
    }

    /// Inject a staged artifact: freeze the active tier, synthesize its
    /// conclusion artifact, spawn the next tier. Returns the new tier level
    /// and the auto-artifact id, or `Ok(None)` when the injection is
    /// refused (unknown / unstaged / already injected).
    pub fn promote(&mut self, artifact_id: &str) -> Result<Option<(u32, String)>> {
        let Some((tier, auto)) = self.project.inject(artifact_id) else {
            return Ok(None);
        };
        let out = (tier.level, auto.id.clone());
        tracing::info!("tier {} frozen, tier {} active", out.0 - 1, out.0);
        self.log_event(
            "tier_promoted",
            json!({"injected": artifact_id, "new_tier": out.0, "auto_artifact": out.1}),
        );
        self.persist()?;
        Ok(Some(out))
    }

    // ---- gates ----

    pub fn gate(&self, letter: char) -> Option<Gate> {
        self.project.gate(letter).cloned()
    }

    pub fn set_gate(&mut self, letter: char, state: GateState) -> Result<Option<GateState>> {
        let Some(()) = self.project.set_gate(letter, state) else {
            return Ok(None);
        };
        self.log_event(
            "gate_set",
            json!({"gate": letter.to_string(), "state": state.glyph().to_string()}),
        );
        self.persist()?;
        Ok(Some(state))
    }

    pub fn cycle_gate(&mut self, letter: char) -> Result<Option<GateState>> {
        let Some(state) = self.project.cycle_gate(letter) else {
            return Ok(None);
        };
        self.log_event(
            "gate_cycled",
            json!({"gate": letter.to_string(), "state": state.glyph().to_string()}),
        );
        self.persist()?;
        Ok(Some(state))
    }

    // ---- rendering ----

    /// Compact stamp of the current master context.
    pub fn stamp(&mut self) -> String {
        self.project.master_stamp()
    }

    /// Compact stamp of one branch of the current tier.
    pub fn branch_stamp(&mut self, branch_id: &str) -> Option<String> {
        self.project.branch_stamp(branch_id)
    }

    /// Verbose boxed rendering of the current master checkpoint.
    pub fn full_stamp(&mut self) -> String {
        self.project.master_record().full()
    }

    /// Rehydration block for re-grounding a resumed session. When no
    /// findings are supplied, the current tier's branch pins are used.
    pub fn rehydrate(
        &mut self,
        tree_state: Option<&str>,
        findings: Option<&BTreeMap<String, String>>,
    ) -> String {
        let mut record = self.project.master_record();
        if record.branch.is_empty() {
            record.branch = self.project.id.clone();
        }
        let collected: BTreeMap<String, String>;
        let findings = match findings {
            Some(f) => Some(f),
            None => {
                collected = self
                    .project
                    .current_tier()
                    .branches
                    .iter()
                    .filter(|b| !b.pin.is_empty())
                    .map(|b| (b.name.clone(), b.pin.clone()))
                    .collect();
                if collected.is_empty() { None } else { Some(&collected) }
            }
        };
        record.rehydrate(tree_state, findings)
    }

    /// Multi-line project status: tier tree, shelf, bucket, gates, stamp.
    pub fn status(&mut self) -> String {
        let stamp = self.project.master_stamp();
        let p = &self.project;
        let mut lines = Vec::new();
        lines.push(format!("PROJECT {} — {}", p.id, p.name));
        lines.push(String::new());
        lines.push("TIER TREE:".to_string());
        for t in p.tiers.iter().rev() {
            let icon = if t.frozen { '❄' } else { '◆' };
            lines.push(format!("  {icon} {}", t.summary()));
            for b in &t.branches {
                lines.push(format!("      {}", b.summary()));
            }
        }
        lines.push(String::new());
        lines.push("ARTIFACT SHELF:".to_string());
        for a in &p.artifacts {
            let status_mark = if a.status == ArtifactStatus::Injected { '✓' } else { '○' };
            lines.push(format!(
                "  {status_mark} {} [{}]",
                a.display(),
                a.status.as_str()
            ));
        }
        lines.push(String::new());
        lines.push("BUCKET:".to_string());
        if p.bucket.is_empty() {
            lines.push("  (empty)".to_string());
        } else {
            for id in &p.bucket {
                if let Some(a) = p.artifact(id) {
                    lines.push(format!("  ▸ {} [{}]", a.name, a.status.as_str()));
                }
            }
        }
        lines.push(String::new());
        lines.push("GATES:".to_string());
        for g in &p.gates {
            lines.push(format!("  {}  {}", g.symbol(), g.question));
        }
        lines.push(String::new());
        lines.push(format!("STAMP: {stamp}"));
        lines.join("\n")
    }

    // ---- persistence & search ----

    /// Persist the current master checkpoint as `<name>.stamp.json`
    /// (defaults to the project id).
    pub fn save_stamp(&mut self, name: Option<&str>) -> Result<PathBuf> {
        let record = self.project.master_record();
        let name = name.unwrap_or(&self.project.id).to_string();
        self.store.save_stamp(&name, &record)
    }

    pub fn load_stamp(&self, name: &str) -> Result<Option<Stamp>> {
        self.store.load_stamp(name)
    }

    /// Scan persisted stamps and saved DOM captures for a query string.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let context = ensure_initialized_once()
            .map(|r| r.config.search.dom_context_chars)
            .unwrap_or(crate::session::search::DOM_CONTEXT_CHARS);
        search_sessions(self.store.root(), query, context)
    }

    // ---- internals ----

    fn persist(&self) -> Result<()> {
        self.store.save_project(&self.project)?;
        Ok(())
    }

    fn log_event(&self, event: &str, data: serde_json::Value) {
        if let Ok(report) = ensure_initialized_once() {
            let _ = logbook::emit_event(
                &report.config.logbook.path,
                event,
                data,
                &Utc::now().to_rfc3339(),
            );
        }
    }
}
