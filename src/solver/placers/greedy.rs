//! Greedy-with-compaction placer (C5): two passes of candidate generation,
//! greedy placement, immediate compaction, and a per-block crane rotation
//! fallback.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::{PlacementArea, VoxelBlock};
use crate::solver::compactor;

use super::PlacerOutcome;

fn max_candidates(pass: u32, placed_count: usize) -> usize {
    if pass == 1 {
        (6 * placed_count + 15).min(25)
    } else {
        (10 * placed_count + 30).min(50)
    }
}

fn seed_candidate(area: &PlacementArea, block: &VoxelBlock) -> (i64, i64) {
    let bound = if block.is_crane() {
        area.crane_bound_width() - area.ring_bow_clearance()
    } else {
        area.effective_width()
    };
    let footprint = block.footprint();
    let (ref_x, ref_y) = block.actual_reference();
    let max_x = footprint.iter().map(|c| c.0).max().unwrap();
    let min_y = footprint.iter().map(|c| c.1).min().unwrap();
    let px = bound - 1 - max_x + ref_x;
    let py = ref_y - min_y;
    (px, py)
}

/// Proposes, filters and caps candidate anchor points for `block`. Mirrors
/// the source's column-top scan, including the "new leftmost column"
/// candidate sized by the candidate block's own width (see DESIGN.md for the
/// resolved ambiguity around whose `actual_width` this uses).
pub(super) fn tight_candidates(
    area: &PlacementArea,
    block: &VoxelBlock,
    pass: u32,
) -> Vec<(i64, i64)> {
    if area.placed_blocks().is_empty() {
        let seed = seed_candidate(area, block);
        return if area.can_place(block, seed.0, seed.1) {
            vec![seed]
        } else {
            Vec::new()
        };
    }

    let bound = if block.is_crane() {
        area.crane_bound_width() - area.ring_bow_clearance()
    } else {
        area.effective_width()
    };
    let spacing = area.block_spacing();

    let mut column_tops: HashMap<i64, i64> = HashMap::new();
    let mut leftmost_column = i64::MAX;
    for placed in area.placed_blocks().values() {
        let pos = placed.position.expect("placed block has a position");
        for (x, y) in placed.footprint_at(pos.x, pos.y) {
            column_tops
                .entry(x)
                .and_modify(|top| *top = (*top).max(y + 1))
                .or_insert(y + 1);
            leftmost_column = leftmost_column.min(x);
        }
    }

    let mut candidates: Vec<(i64, i64)> = (0..bound)
        .rev()
        .map(|x| {
            let top = column_tops.get(&x).copied().unwrap_or(0);
            (x, top + spacing)
        })
        .collect();
    candidates.push((leftmost_column - block.width - spacing, 0));

    candidates.retain(|&(px, py)| area.can_place(block, px, py));
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    candidates.truncate(max_candidates(pass, area.placed_blocks().len()));
    candidates
}

/// Tries the first valid candidate; for a crane block that has none, rotates
/// 90 degrees and retries once, restoring the original rotation on failure.
pub(super) fn place_one(
    area: &mut PlacementArea,
    mut block: VoxelBlock,
    pass: u32,
) -> Result<(), VoxelBlock> {
    let candidates = tight_candidates(area, &block, pass);
    if let Some(&(x, y)) = candidates.first() {
        return area.place_block(block, x, y);
    }

    if block.is_crane() {
        block.rotate(90);
        let candidates = tight_candidates(area, &block, pass);
        if let Some(&(x, y)) = candidates.first() {
            return area.place_block(block, x, y);
        }
        block.rotate(270);
    }
    Err(block)
}

pub(super) fn place_one_and_compact(
    area: &mut PlacementArea,
    block: VoxelBlock,
    pass: u32,
) -> Result<(), VoxelBlock> {
    let id = block.id.clone();
    place_one(area, block, pass)?;
    compactor::compact_right(area, &id);
    compactor::compact_down(area, &id);
    compactor::compact_right(area, &id);
    Ok(())
}

pub fn place(
    area: &mut PlacementArea,
    blocks: Vec<VoxelBlock>,
    budget: Duration,
) -> (Vec<VoxelBlock>, PlacerOutcome) {
    let start = Instant::now();
    let mut timed_out = false;

    let mut pass1 = blocks;
    pass1.sort_by(|a, b| b.area().cmp(&a.area()));
    let mut unplaced = Vec::new();
    for block in pass1 {
        if start.elapsed() > budget {
            timed_out = true;
            unplaced.push(block);
            continue;
        }
        if let Err(b) = place_one_and_compact(area, block, 1) {
            unplaced.push(b);
        }
    }

    if !timed_out {
        let mut pass2 = std::mem::take(&mut unplaced);
        pass2.sort_by(|a, b| a.area().cmp(&b.area()));
        for block in pass2 {
            if start.elapsed() > budget {
                timed_out = true;
                unplaced.push(block);
                continue;
            }
            if let Err(b) = place_one_and_compact(area, block, 2) {
                unplaced.push(b);
            }
        }
    }

    for b in &unplaced {
        area.mark_unplaced(b.id.clone());
    }
    if timed_out {
        debug!("greedy placer exhausted its time budget");
    }

    (
        unplaced,
        PlacerOutcome {
            elapsed: start.elapsed(),
            timed_out,
            rotation_attempts: 0,
            rotation_improvements: 0,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::BlockType;

    fn square(id: &str) -> VoxelBlock {
        VoxelBlock::new(
            id,
            vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            (0, 0),
            BlockType::Unknown,
        )
    }

    #[test]
    fn seeds_the_first_block_at_rightmost_bottom() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        let (unplaced, _) = place(&mut area, vec![square("A")], Duration::from_secs(1));
        assert!(unplaced.is_empty());
        let pos = area.placed_blocks()["A"].position.unwrap();
        assert_eq!((pos.x, pos.y), (8, 0));
    }

    #[test]
    fn packs_several_blocks_without_overlap() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        let blocks = vec![square("A"), square("B"), square("C")];
        let (unplaced, outcome) = place(&mut area, blocks, Duration::from_secs(1));
        assert!(unplaced.is_empty());
        assert!(!outcome.timed_out);
        assert_eq!(area.placed_blocks().len(), 3);
    }

    #[test]
    fn leftover_blocks_are_reconciled_into_unplaced_set() {
        // A 1x1 deck can only ever hold one block.
        let mut area = PlacementArea::new(1, 1, 0, 0, 0, 0);
        let tiny = VoxelBlock::new("tiny", vec![(0, 0)], (0, 0), BlockType::Unknown);
        let other = VoxelBlock::new("other", vec![(0, 0)], (0, 0), BlockType::Unknown);
        let (unplaced, _) = place(&mut area, vec![tiny, other], Duration::from_secs(1));
        assert_eq!(unplaced.len(), 1);
        assert!(area.unplaced_blocks().contains(&unplaced[0].id));
    }
}
