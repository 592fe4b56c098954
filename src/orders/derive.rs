//! Pure order-state derivation and split validation.
//!
//! Derivation recomputes `status` and `ready_to_pack` from the line
//! quantities of the current shipment batch. It has no side effects and
//! no knowledge of the database; the service layer applies its result.

use crate::error::{AppError, AppResult};

use super::models::{LineProgress, OrderStatus};

/// Highest shipment batch an order may be split into.
pub const MAX_SHIPMENT_BATCHES: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedState {
    pub status: OrderStatus,
    pub ready_to_pack: bool,
}

/// Recompute state from the lines of the current shipment batch.
///
/// All lines satisfied => ready to pack (batch advance happens only on an
/// explicit mark-packed, never here). Any progress => picking. No
/// progress => open. A batch with no lines has nothing to pick and stays
/// open.
pub fn derive_state(lines_in_current: &[LineProgress]) -> DerivedState {
    if lines_in_current.is_empty() {
        return DerivedState {
            status: OrderStatus::Open,
            ready_to_pack: false,
        };
    }

    if lines_in_current.iter().all(LineProgress::done) {
        return DerivedState {
            status: OrderStatus::ReadyToPack,
            ready_to_pack: true,
        };
    }

    let status = if lines_in_current.iter().any(LineProgress::touched) {
        OrderStatus::Picking
    } else {
        OrderStatus::Open
    };
    DerivedState {
        status,
        ready_to_pack: false,
    }
}

/// Validated result of a split request: per-line batch assignments plus
/// the new `total_shipments`.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    pub assignments: Vec<(i64, i32)>,
    pub total_shipments: i32,
}

/// Validate a split assignment against the order's lines.
///
/// Rules: every line of the order is assigned exactly once; batches are
/// within `1..=MAX_SHIPMENT_BATCHES`; the used batch numbers form a
/// contiguous prefix `1..=max`; every used batch has at least one line.
pub fn validate_split(line_ids: &[i64], assignments: &[(i64, i32)]) -> AppResult<SplitPlan> {
    if assignments.is_empty() {
        return Err(AppError::Validation("split assignment is empty".into()));
    }

    let mut seen: Vec<i64> = Vec::with_capacity(assignments.len());
    let mut max_batch = 0i32;
    let mut used = [false; MAX_SHIPMENT_BATCHES as usize];

    for &(line_id, batch) in assignments {
        if !(1..=MAX_SHIPMENT_BATCHES).contains(&batch) {
            return Err(AppError::Validation(format!(
                "shipment batch {batch} out of range 1..={MAX_SHIPMENT_BATCHES}"
            )));
        }
        if !line_ids.contains(&line_id) {
            return Err(AppError::Validation(format!(
                "line {line_id} does not belong to the order"
            )));
        }
        if seen.contains(&line_id) {
            return Err(AppError::Validation(format!(
                "line {line_id} assigned more than once"
            )));
        }
        seen.push(line_id);
        used[(batch - 1) as usize] = true;
        max_batch = max_batch.max(batch);
    }

    if seen.len() != line_ids.len() {
        return Err(AppError::Validation(
            "split must assign every line of the order".into(),
        ));
    }

    // Contiguous prefix: batches {1..max} all used.
    if !used[..max_batch as usize].iter().all(|&b| b) {
        return Err(AppError::Validation(
            "shipment batches must form a contiguous sequence starting at 1".into(),
        ));
    }

    Ok(SplitPlan {
        assignments: assignments.to_vec(),
        total_shipments: max_batch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ordered: i32, picked: i32, short: i32) -> LineProgress {
        LineProgress {
            qty_ordered: ordered,
            qty_picked: picked,
            qty_short: short,
        }
    }

    #[test]
    fn untouched_lines_stay_open() {
        let d = derive_state(&[line(3, 0, 0), line(1, 0, 0)]);
        assert_eq!(d.status, OrderStatus::Open);
        assert!(!d.ready_to_pack);
    }

    #[test]
    fn partial_progress_is_picking() {
        let d = derive_state(&[line(3, 1, 0), line(1, 0, 0)]);
        assert_eq!(d.status, OrderStatus::Picking);
        assert!(!d.ready_to_pack);
    }

    #[test]
    fn shorts_count_toward_progress_and_completion() {
        // Picked 2 of 2 on one line, short 1 of 1 on the other: the batch
        // is complete even though nothing more will be picked.
        let d = derive_state(&[line(2, 2, 0), line(1, 0, 1)]);
        assert_eq!(d.status, OrderStatus::ReadyToPack);
        assert!(d.ready_to_pack);
    }

    #[test]
    fn revert_regresses_to_picking() {
        // After a full revert of the picked line, the short on the other
        // line still counts as progress, so the order is picking not open.
        let d = derive_state(&[line(2, 0, 0), line(1, 0, 1)]);
        assert_eq!(d.status, OrderStatus::Picking);
        assert!(!d.ready_to_pack);
    }

    #[test]
    fn empty_batch_is_open() {
        let d = derive_state(&[]);
        assert_eq!(d.status, OrderStatus::Open);
        assert!(!d.ready_to_pack);
    }

    #[test]
    fn split_contiguous_prefix_accepted() {
        let plan = validate_split(&[10, 11, 12], &[(10, 1), (11, 1), (12, 2)]).unwrap();
        assert_eq!(plan.total_shipments, 2);
    }

    #[test]
    fn split_with_gap_rejected() {
        // Batch 2 unused: {1, 3} is not a contiguous prefix.
        let err = validate_split(&[10, 11], &[(10, 1), (11, 3)]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn split_must_cover_all_lines() {
        let err = validate_split(&[10, 11, 12], &[(10, 1), (11, 2)]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn split_rejects_foreign_and_duplicate_lines() {
        assert!(validate_split(&[10], &[(99, 1)]).is_err());
        assert!(validate_split(&[10, 11], &[(10, 1), (10, 2)]).is_err());
    }

    #[test]
    fn split_rejects_batch_out_of_range() {
        assert!(validate_split(&[10], &[(10, 0)]).is_err());
        assert!(validate_split(&[10], &[(10, 6)]).is_err());
    }
}
