use olo_core::services::gates::{GATE_CYCLE, Gate, GateState};

#[test]
fn cycle_visits_four_states_and_wraps() {
    let mut g = Gate::new('A', "Blue channel?");
    assert_eq!(g.state, GateState::Open);

    let seen: Vec<GateState> = (0..4)
        .map(|_| {
            g.cycle();
            g.state
        })
        .collect();
    assert_eq!(
        seen,
        vec![
            GateState::Half,
            GateState::Yes,
            GateState::No,
            GateState::Open,
        ]
    );
}

#[test]
fn four_cycles_return_to_origin_from_any_cycle_state() {
    for start in GATE_CYCLE {
        let mut g = Gate::new('X', "demo?");
        g.state = start;
        for _ in 0..4 {
            g.cycle();
        }
        assert_eq!(g.state, start, "start state {:?}", start);
    }
}

#[test]
fn blocked_and_revisit_reenter_cycle_at_open() {
    let mut g = Gate::new('B', "JPEG kill?");
    g.state = GateState::Blocked;
    assert!(!g.state.in_cycle());
    g.cycle();
    assert_eq!(g.state, GateState::Open);

    g.state = GateState::Revisit;
    g.cycle();
    assert_eq!(g.state, GateState::Open);
}

#[test]
fn symbol_is_letter_plus_glyph() {
    let mut g = Gate::new('C', "Temporal?");
    assert_eq!(g.symbol(), "C○");
    g.state = GateState::Yes;
    assert_eq!(g.symbol(), "C●");
    assert_eq!(g.display(), "[C●]");
}

#[test]
fn glyphs_round_trip() {
    for state in [
        GateState::Open,
        GateState::Half,
        GateState::Yes,
        GateState::No,
        GateState::Blocked,
        GateState::Revisit,
    ] {
        assert_eq!(GateState::from_glyph(state.glyph()), Some(state));
    }
    assert_eq!(GateState::from_glyph('z'), None);
}

#[test]
fn labels_expand_for_rehydration() {
    assert_eq!(GateState::Yes.label(), "YES (confirmed)");
    assert_eq!(GateState::Revisit.label(), "REVISIT (reopened)");
}
