use std::fs;

use olo_core::services::gates::{Gate, GateState};
use olo_core::services::stamp::{ConvState, Stamp};
use olo_core::services::tiers::{ForkType, Project};
use olo_core::session::search::{SearchHit, search_sessions};
use olo_core::session::store::StampStore;

fn demo_stamp() -> Stamp {
    let mut gate = Gate::new('A', "Blue channel?");
    gate.state = GateState::Yes;
    Stamp {
        branch: "olo-guard/blue-channel".to_string(),
        depth: 7,
        max_depth: 12,
        parent: "jpeg-base".to_string(),
        parent_depth: 4,
        state: ConvState::Open,
        gates: vec![gate, Gate::new('B', "JPEG kill?")],
        pin: "blue dies in JPEG 4:2:0".to_string(),
        look: String::new(),
        chain: String::new(),
        timestamp: String::new(),
    }
}

#[test]
fn stamps_round_trip_through_disk_wholesale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StampStore::open(dir.path()).expect("store opens");

    let path = store.save_stamp("blue-channel", &demo_stamp()).expect("saves");
    assert!(path.ends_with("blue-channel.stamp.json"));

    let loaded = store
        .load_stamp("blue-channel")
        .expect("reads")
        .expect("exists");
    assert_eq!(loaded.branch, "olo-guard/blue-channel");
    assert_eq!(loaded.depth, 7);
    assert_eq!(loaded.max_depth, 12);
    assert_eq!(loaded.parent, "jpeg-base");
    assert_eq!(loaded.parent_depth, 4);
    assert_eq!(loaded.gates.len(), 2);
    assert_eq!(loaded.gates[0].state, GateState::Yes);
    // Questions persist in JSON (unlike the compact wire form).
    assert_eq!(loaded.gates[1].question, "JPEG kill?");
    // The store timestamps the record at write time.
    assert!(!loaded.timestamp.is_empty());
}

#[test]
fn load_of_a_missing_stamp_is_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StampStore::open(dir.path()).expect("store opens");
    assert!(store.load_stamp("missing").expect("read ok").is_none());
}

#[test]
fn content_unchanged_saves_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StampStore::open(dir.path()).expect("store opens");

    let stamp = demo_stamp();
    let path = store.save_stamp("blue-channel", &stamp).expect("first save");
    let first = fs::read(&path).expect("read");

    // Same content: nothing rewritten, including the embedded timestamp.
    store.save_stamp("blue-channel", &stamp).expect("second save");
    let second = fs::read(&path).expect("read");
    assert_eq!(first, second);

    // Changed content: rewritten.
    let mut changed = stamp.clone();
    changed.pin = "webp survives".to_string();
    store.save_stamp("blue-channel", &changed).expect("third save");
    let third = fs::read(&path).expect("read");
    assert_ne!(first, third);
}

#[test]
fn projects_persist_whole() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StampStore::open(dir.path()).expect("store opens");

    let mut p = Project::new("olo", "OLO Guard", vec![Gate::new('A', "Blue?")]);
    p.progress_master(5, "blue verified");
    p.branch_from_master("jpeg-test", ForkType::Explore);
    let _ = p.collect_artifact("b0-jpeg-test", "jpeg-findings", "finding text");
    p.inject("art-0").expect("injects");

    store.save_project(&p).expect("saves");
    assert!(store.project_exists("olo"));

    let loaded = store.load_project("olo").expect("reads").expect("exists");
    assert_eq!(loaded.tiers.len(), 2);
    assert!(loaded.tiers[0].frozen);
    assert_eq!(loaded.tiers[0].branches.len(), 1);
    assert_eq!(loaded.artifacts.len(), 2);
    assert_eq!(loaded.current_level(), Some(1));
    assert!(store.load_project("other").expect("reads").is_none());
}

#[test]
fn search_finds_stamps_and_dom_captures() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StampStore::open(dir.path()).expect("store opens");
    store.save_stamp("blue-channel", &demo_stamp()).expect("saves");

    let dom_dir = dir.path().join("dom-saves");
    fs::create_dir_all(&dom_dir).expect("mkdir");
    fs::write(
        dom_dir.join("capture.html"),
        "<html><body>\nThe quick brown fox mentions JPEG artifacts here.\n</body></html>",
    )
    .expect("write html");

    let hits = search_sessions(dir.path(), "jpeg", 60).expect("search runs");
    let mut stamp_hits = 0;
    let mut dom_hits = 0;
    for hit in &hits {
        match hit {
            SearchHit::Stamp { stamp, .. } => {
                stamp_hits += 1;
                assert_eq!(stamp.parent, "jpeg-base");
            }
            SearchHit::Dom { context, .. } => {
                dom_hits += 1;
                assert!(context.starts_with("..."));
                assert!(context.ends_with("..."));
                assert!(context.contains("JPEG artifacts"));
                assert!(!context.contains('\n'));
            }
        }
    }
    assert_eq!(stamp_hits, 1);
    assert_eq!(dom_hits, 1);

    assert!(
        search_sessions(dir.path(), "no such needle", 60)
            .expect("search runs")
            .is_empty()
    );
}
