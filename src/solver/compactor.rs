//! Compactor (C3): shifts an already-placed block right or down against
//! whatever obstacle or deck boundary stops it first. Both operations route
//! every trial move through `place_block`, so they can never violate the
//! area's invariants.

use std::collections::HashMap;

use tracing::trace;

use crate::domain::PlacementArea;

/// Shifts `block_id` as far right as it will go without violating spacing or
/// the deck bound. Returns `true` iff it moved.
pub fn compact_right(area: &mut PlacementArea, block_id: &str) -> bool {
    let Some(block) = area.placed_blocks().get(block_id) else {
        return false;
    };
    let pos = block.position.expect("placed block has a position");
    let spacing = area.block_spacing();
    let bound = if block.is_crane() {
        area.crane_bound_width() - area.ring_bow_clearance()
    } else {
        area.effective_width()
    };
    let world = block.footprint_at(pos.x, pos.y);

    let mut row_max: HashMap<i64, i64> = HashMap::new();
    for &(x, y) in &world {
        row_max
            .entry(y)
            .and_modify(|m| *m = (*m).max(x))
            .or_insert(x);
    }

    let mut max_shift = i64::MAX;
    for (&y, &ex) in &row_max {
        let mut shift_limit = bound - ex - 1;
        let mut x = ex + 1;
        while x < bound {
            if let Some(occupant) = area.occupant_at(x, y) {
                if occupant != block_id {
                    shift_limit = x - ex - spacing;
                    break;
                }
            }
            x += 1;
        }
        max_shift = max_shift.min(shift_limit);
    }

    if max_shift <= 0 {
        return false;
    }

    try_shifts(area, block_id, max_shift, |d| (pos.x + d, pos.y), pos)
}

/// Shifts `block_id` as far down as it will go. Returns `true` iff it moved.
pub fn compact_down(area: &mut PlacementArea, block_id: &str) -> bool {
    let Some(block) = area.placed_blocks().get(block_id) else {
        return false;
    };
    let pos = block.position.expect("placed block has a position");
    let spacing = area.block_spacing();
    let world = block.footprint_at(pos.x, pos.y);

    let mut col_min: HashMap<i64, i64> = HashMap::new();
    for &(x, y) in &world {
        col_min
            .entry(x)
            .and_modify(|m| *m = (*m).min(y))
            .or_insert(y);
    }

    let mut max_shift = i64::MAX;
    for (&x, &ey) in &col_min {
        let mut shift_limit = ey;
        let mut y = ey - 1;
        while y >= 0 {
            if let Some(occupant) = area.occupant_at(x, y) {
                if occupant != block_id {
                    shift_limit = ey - y - spacing;
                    break;
                }
            }
            y -= 1;
        }
        max_shift = max_shift.min(shift_limit);
    }

    if max_shift <= 0 {
        return false;
    }

    try_shifts(area, block_id, max_shift, |d| (pos.x, pos.y - d), pos)
}

/// Tries shifts `max_shift, max_shift-1, ..., 1` in order, restoring the
/// original position if none succeed.
fn try_shifts(
    area: &mut PlacementArea,
    block_id: &str,
    max_shift: i64,
    candidate_at: impl Fn(i64) -> (i64, i64),
    original: crate::domain::Position,
) -> bool {
    let block = area.remove_block(block_id).expect("block was placed");
    let mut carry = block;
    for d in (1..=max_shift).rev() {
        let (px, py) = candidate_at(d);
        match area.place_block(carry, px, py) {
            Ok(()) => {
                trace!(block_id, shift = d, "compacted block");
                return true;
            }
            Err(returned) => carry = returned,
        }
    }
    area.place_block(carry, original.x, original.y)
        .expect("restoring to the original position must always succeed");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::BlockType;
    use crate::domain::VoxelBlock;

    fn square(id: &str) -> VoxelBlock {
        VoxelBlock::new(
            id,
            vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            (0, 0),
            BlockType::Unknown,
        )
    }

    #[test]
    fn compact_right_moves_block_against_the_bound() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        area.place_block(square("A"), 0, 0).unwrap();
        assert!(compact_right(&mut area, "A"));
        let pos = area.placed_blocks()["A"].position.unwrap();
        assert_eq!((pos.x, pos.y), (8, 0));
    }

    #[test]
    fn compact_right_twice_is_a_no_op_the_second_time() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        area.place_block(square("A"), 0, 0).unwrap();
        assert!(compact_right(&mut area, "A"));
        assert!(!compact_right(&mut area, "A"));
    }

    #[test]
    fn compact_down_moves_block_to_the_floor() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        area.place_block(square("A"), 0, 5).unwrap();
        assert!(compact_down(&mut area, "A"));
        let pos = area.placed_blocks()["A"].position.unwrap();
        assert_eq!((pos.x, pos.y), (0, 0));
    }

    #[test]
    fn compact_right_respects_spacing_to_an_obstacle() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 2, 0);
        area.place_block(square("A"), 0, 0).unwrap();
        area.place_block(square("B"), 8, 0).unwrap();
        compact_right(&mut area, "A");
        let pos = area.placed_blocks()["A"].position.unwrap();
        // B's leftmost cell is x=8; A's rightmost must land at x=6 to leave a gap of 2.
        assert_eq!(pos.x, 5);
    }
}
