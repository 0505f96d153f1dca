//! Bottom-Right-Decreasing placer (C4): a deterministic single-pass baseline
//! with no backtracking and no compaction.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::{PlacementArea, VoxelBlock};

use super::PlacerOutcome;

pub fn place(
    area: &mut PlacementArea,
    mut blocks: Vec<VoxelBlock>,
    budget: Duration,
) -> (Vec<VoxelBlock>, PlacerOutcome) {
    let start = Instant::now();
    blocks.sort_by(|a, b| b.area().cmp(&a.area()));

    let mut unplaced = Vec::new();
    let mut timed_out = false;

    for block in blocks {
        if start.elapsed() > budget {
            timed_out = true;
            unplaced.push(block);
            continue;
        }

        let mut chosen = None;
        'scan: for y in 0..area.height() {
            for x in (0..area.crane_bound_width()).rev() {
                if area.can_place(&block, x, y) {
                    chosen = Some((x, y));
                    break 'scan;
                }
            }
        }

        match chosen {
            Some((x, y)) => {
                let id = block.id.clone();
                area.place_block(block, x, y)
                    .expect("can_place was just confirmed true");
                debug!(block_id = %id, x, y, "BRD placed block");
            }
            None => unplaced.push(block),
        }
    }

    if timed_out {
        debug!("BRD placer exhausted its time budget");
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

    // S1: single block on an empty 10x10 deck places at (8, 0).
    #[test]
    fn s1_single_block_lands_rightmost_bottom() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        let (unplaced, _) = place(&mut area, vec![square("A")], Duration::from_secs(1));
        assert!(unplaced.is_empty());
        let pos = area.placed_blocks()["A"].position.unwrap();
        assert_eq!((pos.x, pos.y), (8, 0));
        assert_eq!(area.enhanced_metrics().placement_rate, 1.0);
    }

    #[test]
    fn blocks_are_placed_in_descending_area_order() {
        let mut area = PlacementArea::new(20, 20, 0, 0, 0, 0);
        let small = VoxelBlock::new("small", vec![(0, 0)], (0, 0), BlockType::Unknown);
        let big = square("big");
        let (unplaced, _) = place(
            &mut area,
            vec![small, big],
            Duration::from_secs(1),
        );
        assert!(unplaced.is_empty());
        // The big block is handled first, so it claims the rightmost column.
        let big_pos = area.placed_blocks()["big"].position.unwrap();
        assert_eq!(big_pos.x, 18);
    }
}
