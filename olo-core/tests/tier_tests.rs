use olo_core::services::gates::{Gate, GateState};
use olo_core::services::stamp::ConvState;
use olo_core::services::tiers::{ArtifactOrigin, ArtifactStatus, ForkType, Project};

fn demo_project() -> Project {
    Project::new(
        "olo",
        "OLO Guard",
        vec![Gate::new('A', "Blue?"), Gate::new('B', "JPEG?")],
    )
}

#[test]
fn new_project_starts_with_tier_zero_active() {
    let p = demo_project();
    assert_eq!(p.tiers.len(), 1);
    assert_eq!(p.tiers[0].level, 0);
    assert!(!p.tiers[0].frozen);
    assert_eq!(p.current_level(), Some(0));
}

#[test]
fn tier_zero_master_stamp_matches_wire_format() {
    let mut p = demo_project();
    p.progress_master(5, "blue verified");
    let _ = p.set_gate('A', GateState::Yes);

    let stamp = p.master_stamp();
    assert!(
        stamp.starts_with("[OLO|📍5/0|⚡OPEN|🔒A●B○|📌blue-verified|⏱"),
        "got {stamp}"
    );
    assert!(stamp.ends_with(']'));
}

#[test]
fn forked_branches_carry_the_fork_time_stamp() {
    let mut p = demo_project();
    p.progress_master(5, "blue verified");
    let b = p.branch_from_master("jpeg-test", ForkType::Explore);
    assert_eq!(b.id, "b0-jpeg-test");
    assert_eq!(b.forked_at_depth, 5);
    assert!(b.stamp_at_fork.starts_with("[OLO|"));
}

#[test]
fn duplicate_branch_names_are_permitted() {
    let mut p = demo_project();
    let first = p.branch_from_master("jpeg-test", ForkType::Explore).id.clone();
    let second = p.branch_from_master("jpeg-test", ForkType::Challenge).id.clone();
    assert_eq!(first, "b0-jpeg-test");
    assert_eq!(second, "b1-jpeg-test");
    assert_eq!(p.tiers[0].branches.len(), 2);
}

#[test]
fn collect_from_unknown_branch_returns_none() {
    let mut p = demo_project();
    assert!(p.collect_artifact("b9-nope", "x", "y").is_none());
    assert!(p.artifacts.is_empty());
    assert!(p.bucket.is_empty());
}

#[test]
fn collected_artifacts_land_on_shelf_and_in_bucket() {
    let mut p = demo_project();
    p.branch_from_master("jpeg-test", ForkType::Explore);
    let id = p
        .collect_artifact("b0-jpeg-test", "jpeg-findings", "JPEG destroys 75% blue")
        .expect("branch exists")
        .id
        .clone();
    assert_eq!(id, "art-0");
    let art = p.artifact(&id).expect("on shelf");
    assert_eq!(art.origin, ArtifactOrigin::Manual);
    assert_eq!(art.status, ArtifactStatus::Available);
    assert_eq!(art.source_tier, 0);
    assert_eq!(art.source_branch.as_deref(), Some("b0-jpeg-test"));
    assert_eq!(art.gate_snapshot.len(), 2);
    assert!(p.bucket.contains(&id));
}

#[test]
fn gate_snapshots_do_not_track_live_gates() {
    let mut p = demo_project();
    p.branch_from_master("jpeg-test", ForkType::Explore);
    let _ = p.collect_artifact("b0-jpeg-test", "jpeg-findings", "…");
    let _ = p.set_gate('A', GateState::Yes);

    let art = p.artifact("art-0").expect("on shelf");
    assert_eq!(art.gate_snapshot[0].state, GateState::Open);
    assert_eq!(p.gates[0].state, GateState::Yes);
}

#[test]
fn inject_freezes_spawns_and_synthesizes() {
    let mut p = demo_project();
    p.progress_master(5, "blue verified");
    let _ = p.set_gate('A', GateState::Yes);
    p.branch_from_master("jpeg-test", ForkType::Explore);
    let _ = p.progress_branch(
        "b0-jpeg-test",
        3,
        "JPEG destroys 75% blue",
        Some(ConvState::Done),
    );
    let _ = p.collect_artifact(
        "b0-jpeg-test",
        "jpeg-findings",
        "JPEG 4:2:0 destroys 75% blue channel. Confirmed n=100.",
    );

    let (new_level, auto_id) = {
        let (tier, auto) = p.inject("art-0").expect("staged artifact injects");
        (tier.level, auto.id.clone())
    };
    assert_eq!(new_level, 1);
    assert_eq!(auto_id, "tier-0-auto");

    // Old tier is frozen history.
    assert!(p.tiers[0].frozen);
    assert_eq!(p.tiers[0].promoted_by, "art-0");
    assert!(p.tiers[0].frozen_stamp.starts_with("[OLO|"));

    // Exactly one active tier, one level up.
    assert_eq!(p.tiers.len(), 2);
    assert_eq!(p.current_level(), Some(1));
    assert_eq!(p.tiers[1].master_pin, "promoted from tier 0");
    assert_eq!(p.tiers.iter().filter(|t| !t.frozen).count(), 1);

    // Injected artifact is marked, and out of the bucket.
    assert_eq!(p.artifact("art-0").unwrap().status, ArtifactStatus::Injected);
    assert!(!p.bucket.contains(&"art-0".to_string()));

    // The auto-artifact is shelf-only reference material.
    let auto = p.artifact("tier-0-auto").expect("synthesized");
    assert_eq!(auto.origin, ArtifactOrigin::TierAuto);
    assert!(auto.source_branch.is_none());
    assert!(!p.bucket.contains(&auto.id));
    assert!(auto.content().contains("=== TIER 0 CONCLUSION ==="));
    assert!(auto.content().contains("Master pin: \"blue verified\""));
    assert!(auto.content().contains("Gates: A● B○"));
    assert!(auto.content().contains("jpeg-test"));
    assert!(auto.content().contains("Promoted by: jpeg-findings"));
    assert!(auto.content().contains("Frozen stamp: [OLO|"));
}

#[test]
fn reinjecting_an_injected_artifact_is_refused_without_damage() {
    let mut p = demo_project();
    p.branch_from_master("jpeg-test", ForkType::Explore);
    let _ = p.collect_artifact("b0-jpeg-test", "jpeg-findings", "…");
    p.inject("art-0").expect("first injection");

    assert!(p.inject("art-0").is_none());
    assert_eq!(p.tiers.len(), 2);
    assert!(p.tiers[0].frozen);
    assert!(!p.tiers[1].frozen);
    assert_eq!(p.artifacts.len(), 2);
}

#[test]
fn inject_with_unknown_id_is_a_noop() {
    let mut p = demo_project();
    assert!(p.inject("art-99").is_none());
    assert_eq!(p.tiers.len(), 1);
    assert!(!p.tiers[0].frozen);
}

#[test]
fn tier_levels_increase_by_one_per_promotion() {
    let mut p = demo_project();
    for round in 0..3 {
        let branch_id = p
            .branch_from_master(&format!("probe-{round}"), ForkType::Explore)
            .id
            .clone();
        let art_id = p
            .collect_artifact(&branch_id, &format!("find-{round}"), "content")
            .expect("branch exists")
            .id
            .clone();
        p.inject(&art_id).expect("injects");
    }
    let levels: Vec<u32> = p.tiers.iter().map(|t| t.level).collect();
    assert_eq!(levels, vec![0, 1, 2, 3]);
    assert_eq!(p.tiers.iter().filter(|t| !t.frozen).count(), 1);
    assert_eq!(p.current_level(), Some(3));
}

#[test]
fn fresh_tier_is_created_on_demand_when_all_are_frozen() {
    let mut p = demo_project();
    p.tiers[0].frozen = true;
    assert_eq!(p.current_level(), None);
    let stamp = p.master_stamp();
    assert!(stamp.starts_with("[OLO|"));
    assert_eq!(p.tiers.len(), 2);
    assert_eq!(p.current_level(), Some(1));
}

#[test]
fn higher_tier_stamps_reference_the_tier_below() {
    let mut p = demo_project();
    p.branch_from_master("probe", ForkType::Explore);
    let _ = p.collect_artifact("b0-probe", "find", "content");
    p.inject("art-0").expect("injects");

    let stamp = p.master_stamp();
    assert!(stamp.contains("🌿t1/olo"), "got {stamp}");
    assert!(stamp.contains("⬆t0@d0"), "got {stamp}");
}

#[test]
fn branch_stamp_references_the_owning_tier() {
    let mut p = demo_project();
    p.progress_master(5, "blue verified");
    p.branch_from_master("jpeg-test", ForkType::Explore);
    let _ = p.progress_branch("b0-jpeg-test", 3, "JPEG destroys", None);

    let stamp = p.branch_stamp("b0-jpeg-test").expect("branch exists");
    assert!(stamp.contains("🌿olo/jpeg-test"), "got {stamp}");
    assert!(stamp.contains("📍3/0"), "got {stamp}");
    assert!(stamp.contains("⬆t0@d5"), "got {stamp}");

    assert!(p.branch_stamp("b9-missing").is_none());
}

#[test]
fn artifact_content_can_be_edited_exactly_once() {
    let mut p = demo_project();
    p.branch_from_master("probe", ForkType::Explore);
    let _ = p.collect_artifact("b0-probe", "find", "original text");

    assert!(p.edit_artifact("art-0", "sharper text").is_some());
    let art = p.artifact("art-0").unwrap();
    assert_eq!(art.origin, ArtifactOrigin::Edited);
    assert_eq!(art.content(), "sharper text");

    assert!(p.edit_artifact("art-0", "third draft").is_none());
    assert_eq!(p.artifact("art-0").unwrap().content(), "sharper text");
}

#[test]
fn auto_artifacts_can_be_staged_and_injected_later() {
    let mut p = demo_project();
    p.branch_from_master("probe", ForkType::Explore);
    let _ = p.collect_artifact("b0-probe", "find", "content");
    p.inject("art-0").expect("first promotion");

    // Shelf-only until staged.
    assert!(p.inject("tier-0-auto").is_none());
    assert!(p.stage_artifact("tier-0-auto").is_some());
    assert_eq!(
        p.artifact("tier-0-auto").unwrap().status,
        ArtifactStatus::Staged
    );

    let (tier, _) = p.inject("tier-0-auto").expect("second promotion");
    assert_eq!(tier.level, 2);
    assert!(p.tiers[1].frozen);
}

#[test]
fn branch_summary_reflects_state_and_fork_type() {
    let mut p = demo_project();
    p.branch_from_master("jpeg-test", ForkType::Explore);
    let _ = p.progress_branch("b0-jpeg-test", 3, "JPEG destroys 75% blue", Some(ConvState::Done));
    let summary = p.tiers[0].branches[0].summary();
    assert_eq!(summary, "● → jpeg-test [d=3] \"JPEG destroys 75% blue\"");
}
