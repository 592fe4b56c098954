//! End-to-end shapes of the pick/derive cycle, driven through the pure
//! engine layer: the FIFO planner decides allocations, the derivation
//! function decides order state. The database services are thin appliers
//! of exactly these results, so the scenarios here pin the behavior the
//! HTTP surface exposes.

use packflow::orders::derive::validate_split;
use packflow::orders::models::LineProgress;
use packflow::orders::{OrderStatus, derive_state};
use packflow::picking::allocation::{LineSupply, Take, plan_allocation};

/// In-memory stand-in for one order line.
#[derive(Debug, Clone)]
struct Line {
    id: i64,
    ordered: i32,
    picked: i32,
    short: i32,
    batch: i32,
}

impl Line {
    fn new(id: i64, ordered: i32) -> Self {
        Self {
            id,
            ordered,
            picked: 0,
            short: 0,
            batch: 1,
        }
    }

    fn remaining(&self) -> i32 {
        self.ordered - self.picked - self.short
    }

    fn progress(&self) -> LineProgress {
        LineProgress {
            qty_ordered: self.ordered,
            qty_picked: self.picked,
            qty_short: self.short,
        }
    }
}

/// Apply planner output the way the service does, recording audit deltas.
fn apply_takes(lines: &mut [Line], takes: &[Take], events: &mut Vec<i32>) {
    for take in takes {
        let line = lines.iter_mut().find(|l| l.id == take.line_id).unwrap();
        line.picked += take.qty;
        events.push(take.qty);
        assert!(
            line.picked + line.short <= line.ordered,
            "allocation must never overfill a line"
        );
    }
}

fn derive_batch(lines: &[Line], current_batch: i32) -> packflow::orders::DerivedState {
    let progress: Vec<LineProgress> = lines
        .iter()
        .filter(|l| l.batch == current_batch)
        .map(Line::progress)
        .collect();
    derive_state(&progress)
}

#[test]
fn s1_basic_fifo_pick() {
    // Orders A (10:00) and B (10:05), both needing 3 of SKU X. Picking 4
    // must fill A completely before B gains a unit.
    let mut a = Line::new(1, 3);
    let mut b = Line::new(2, 3);

    let supplies = vec![
        LineSupply {
            line_id: a.id,
            remaining: a.remaining(),
        },
        LineSupply {
            line_id: b.id,
            remaining: b.remaining(),
        },
    ];
    let takes = plan_allocation(&supplies, 4).expect("4 <= 6 remaining");

    let mut events = Vec::new();
    let mut both = vec![a.clone(), b.clone()];
    apply_takes(&mut both, &takes, &mut events);
    a = both[0].clone();
    b = both[1].clone();

    assert_eq!(a.picked, 3);
    assert_eq!(b.picked, 1);
    // Two pick events: +3 on A's line, +1 on B's line.
    assert_eq!(events, vec![3, 1]);

    let a_state = derive_batch(&[a], 1);
    assert_eq!(a_state.status, OrderStatus::ReadyToPack);
    assert!(a_state.ready_to_pack);

    let b_state = derive_batch(&[b], 1);
    assert_eq!(b_state.status, OrderStatus::Picking);
    assert!(!b_state.ready_to_pack);
}

#[test]
fn s2_short_allocation_leaves_order_picking() {
    // Order A needs 5 of Y; operator shorts 2 against it explicitly.
    let mut a = Line::new(1, 5);
    a.short += 2;

    assert_eq!(a.remaining(), 3);
    let state = derive_batch(&[a], 1);
    assert_eq!(state.status, OrderStatus::Picking);
    assert!(!state.ready_to_pack);
}

#[test]
fn s3_ready_to_pack_from_pick_plus_short() {
    // Order C: L1 ordered 2, L2 ordered 1. Fully pick L1, short L2.
    let mut l1 = Line::new(1, 2);
    let mut l2 = Line::new(2, 1);

    let takes = plan_allocation(
        &[LineSupply {
            line_id: l1.id,
            remaining: l1.remaining(),
        }],
        2,
    )
    .unwrap();
    let mut events = Vec::new();
    let mut lines = vec![l1.clone()];
    apply_takes(&mut lines, &takes, &mut events);
    l1 = lines[0].clone();
    l2.short += 1;

    let state = derive_batch(&[l1, l2], 1);
    assert_eq!(state.status, OrderStatus::ReadyToPack);
    assert!(state.ready_to_pack);
}

#[test]
fn s4_split_advances_batch_on_pack() {
    // Order D: three lines, split so L1+L2 ship first and L3 second.
    let plan = validate_split(&[1, 2, 3], &[(1, 1), (2, 1), (3, 2)]).unwrap();
    assert_eq!(plan.total_shipments, 2);

    let mut l1 = Line::new(1, 1);
    let mut l2 = Line::new(2, 1);
    let mut l3 = Line::new(3, 4);
    l3.batch = 2;

    // Only batch 1 is visible to picking; fully pick it.
    l1.picked = 1;
    l2.picked = 1;
    let lines = vec![l1, l2, l3.clone()];

    let batch1 = derive_batch(&lines, 1);
    assert!(batch1.ready_to_pack, "batch 1 complete -> ready to pack");

    // MarkPacked advances the cursor; batch 2 is untouched so the order
    // re-opens rather than staying ready.
    let current_shipment = 2;
    let batch2 = derive_batch(&lines, current_shipment);
    assert_eq!(batch2.status, OrderStatus::Open);
    assert!(!batch2.ready_to_pack);

    // L3 now carries the outstanding demand; pick it and the final
    // MarkPacked may terminal-pack the order.
    l3.picked = 4;
    let done = derive_batch(&[l3], current_shipment);
    assert!(done.ready_to_pack);
}

#[test]
fn s7_revert_regresses_ready_order() {
    // From the S3 end state, revert the 2 picked units on L1.
    let mut l1 = Line::new(1, 2);
    l1.picked = 2;
    let mut l2 = Line::new(2, 1);
    l2.short = 1;

    let before = derive_batch(&[l1.clone(), l2.clone()], 1);
    assert!(before.ready_to_pack);

    let revert_qty = 2;
    l1.picked -= revert_qty;
    let revert_event = -revert_qty;

    let after = derive_batch(&[l1, l2], 1);
    assert_eq!(after.status, OrderStatus::Picking, "L2's short still counts as progress");
    assert!(!after.ready_to_pack);
    assert_eq!(revert_event, -2);
}

#[test]
fn fifo_property_earlier_line_fills_first() {
    // Invariant: if L1 precedes L2 and L1 was not yet fully allocated,
    // L1 reaches full allocation before L2 gains any units.
    let l1 = Line::new(1, 5);
    let mut l2 = Line::new(2, 5);
    l2.picked = 1; // L2 already has progress; irrelevant to the property.

    let supplies = vec![
        LineSupply {
            line_id: l1.id,
            remaining: l1.remaining(),
        },
        LineSupply {
            line_id: l2.id,
            remaining: l2.remaining(),
        },
    ];

    for qty in 1..=9 {
        let takes = plan_allocation(&supplies, qty).unwrap();
        let l2_gain: i32 = takes.iter().filter(|t| t.line_id == 2).map(|t| t.qty).sum();
        if l2_gain > 0 {
            let l1_gain: i32 = takes.iter().filter(|t| t.line_id == 1).map(|t| t.qty).sum();
            assert_eq!(l1_gain, 5, "L2 gained units while L1 had remaining demand");
        }
    }
}

#[test]
fn pick_events_reconcile_with_line_quantities() {
    // Invariant: qty_picked equals the sum of pick/revert deltas.
    let mut line = Line::new(1, 10);
    let mut deltas: Vec<i32> = Vec::new();

    for qty in [4, 3] {
        let takes = plan_allocation(
            &[LineSupply {
                line_id: 1,
                remaining: line.remaining(),
            }],
            qty,
        )
        .unwrap();
        let mut lines = vec![line.clone()];
        apply_takes(&mut lines, &takes, &mut deltas);
        line = lines[0].clone();
    }

    // Revert two units.
    line.picked -= 2;
    deltas.push(-2);

    assert_eq!(line.picked, deltas.iter().sum::<i32>());
}

#[test]
fn overdemand_is_rejected_without_partial_application() {
    let l1 = Line::new(1, 2);
    let l2 = Line::new(2, 1);
    let supplies = vec![
        LineSupply {
            line_id: l1.id,
            remaining: l1.remaining(),
        },
        LineSupply {
            line_id: l2.id,
            remaining: l2.remaining(),
        },
    ];

    let err = plan_allocation(&supplies, 4).unwrap_err();
    assert_eq!(err.requested, 4);
    assert_eq!(err.available, 3);
    // Nothing was mutated: the planner returns no takes on failure, so
    // the service never writes anything for this call.
}
