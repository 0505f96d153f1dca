//! Rotation-optimized placer (C6). Delegates to the greedy placer for every
//! non-trestle block; for trestle blocks, simulates 0 and 180 degree trials
//! at each of the top-N candidates and keeps whichever leaves less dead
//! space, ties going to 0 degrees.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::constant::ROTATION_TOP_N_CANDIDATES;
use crate::domain::{PlacementArea, VoxelBlock};
use crate::solver::compactor;

use super::greedy;
use super::PlacerOutcome;

fn bbox_anchor(block: &VoxelBlock, x: i64, y: i64) -> (i64, i64) {
    let (ref_x, ref_y) = block.actual_reference();
    let min_x = block.footprint().iter().map(|c| c.0).min().unwrap();
    let min_y = block.footprint().iter().map(|c| c.1).min().unwrap();
    (x - ref_x + min_x, y - ref_y + min_y)
}

/// Anchor `(px, py)` for `block` that reproduces the bounding-box origin
/// `(bbx, bby)` computed from a (possibly differently rotated) sibling.
fn anchor_for_bbox(block: &VoxelBlock, bbx: i64, bby: i64) -> (i64, i64) {
    let (ref_x, ref_y) = block.actual_reference();
    let min_x = block.footprint().iter().map(|c| c.0).min().unwrap();
    let min_y = block.footprint().iter().map(|c| c.1).min().unwrap();
    (bbx + ref_x - min_x, bby + ref_y - min_y)
}

/// Places a throwaway clone at `(x, y)`, runs the compaction triple, reads
/// the resulting dead-space ratio, then restores the area exactly as it was.
fn simulate(area: &mut PlacementArea, template: &VoxelBlock, x: i64, y: i64) -> Option<f64> {
    let candidate = template.clone();
    let id = candidate.id.clone();
    match area.place_block(candidate, x, y) {
        Ok(()) => {
            compactor::compact_right(area, &id);
            compactor::compact_down(area, &id);
            compactor::compact_right(area, &id);
            let dead_space = area.enhanced_metrics().dead_space_ratio;
            area.remove_block(&id);
            Some(dead_space)
        }
        Err(_) => None,
    }
}

struct Best {
    dead_space: f64,
    anchor: (i64, i64),
    rotated_180: bool,
}

fn place_trestle(
    area: &mut PlacementArea,
    block: VoxelBlock,
    pass: u32,
) -> (Result<(), VoxelBlock>, bool) {
    let candidates = greedy::tight_candidates(area, &block, pass);
    let top: Vec<(i64, i64)> = candidates.into_iter().take(ROTATION_TOP_N_CANDIDATES).collect();
    if top.is_empty() {
        return (greedy::place_one_and_compact(area, block, pass), false);
    }

    let mut rotated_template = block.clone();
    rotated_template.rotate(180);

    let mut best: Option<Best> = None;
    for &(x, y) in &top {
        if let Some(dead_space) = simulate(area, &block, x, y) {
            let better = best.as_ref().map_or(true, |b| dead_space < b.dead_space);
            if better {
                best = Some(Best {
                    dead_space,
                    anchor: (x, y),
                    rotated_180: false,
                });
            }
        }

        let (bbx, bby) = bbox_anchor(&block, x, y);
        let (rx, ry) = anchor_for_bbox(&rotated_template, bbx, bby);
        if let Some(dead_space) = simulate(area, &rotated_template, rx, ry) {
            let better = best.as_ref().map_or(true, |b| dead_space < b.dead_space);
            if better {
                best = Some(Best {
                    dead_space,
                    anchor: (rx, ry),
                    rotated_180: true,
                });
            }
        }
    }

    match best {
        None => (Err(block), false),
        Some(winner) => {
            let final_block = if winner.rotated_180 {
                let mut b = block;
                b.rotate(180);
                b
            } else {
                block
            };
            let id = final_block.id.clone();
            let result = area
                .place_block(final_block, winner.anchor.0, winner.anchor.1)
                .map(|()| {
                    compactor::compact_right(area, &id);
                    compactor::compact_down(area, &id);
                    compactor::compact_right(area, &id);
                });
            (result, winner.rotated_180)
        }
    }
}

pub fn place(
    area: &mut PlacementArea,
    blocks: Vec<VoxelBlock>,
    budget: Duration,
) -> (Vec<VoxelBlock>, PlacerOutcome) {
    let start = Instant::now();
    let mut timed_out = false;
    let mut rotation_attempts = 0u32;
    let mut rotation_improvements = 0u32;

    let mut pass1 = blocks;
    pass1.sort_by(|a, b| b.area().cmp(&a.area()));
    let mut unplaced = Vec::new();

    let mut run_pass = |area: &mut PlacementArea,
                         items: Vec<VoxelBlock>,
                         pass: u32,
                         unplaced: &mut Vec<VoxelBlock>,
                         timed_out: &mut bool| {
        for block in items {
            if start.elapsed() > budget {
                *timed_out = true;
                unplaced.push(block);
                continue;
            }
            if block.is_trestle() {
                let (result, rotated) = place_trestle(area, block, pass);
                rotation_attempts += 1;
                if rotated {
                    rotation_improvements += 1;
                }
                if let Err(b) = result {
                    unplaced.push(b);
                }
            } else if let Err(b) = greedy::place_one_and_compact(area, block, pass) {
                unplaced.push(b);
            }
        }
    };

    run_pass(area, pass1, 1, &mut unplaced, &mut timed_out);

    if !timed_out {
        let mut pass2 = std::mem::take(&mut unplaced);
        pass2.sort_by(|a, b| a.area().cmp(&b.area()));
        run_pass(area, pass2, 2, &mut unplaced, &mut timed_out);
    }

    for b in &unplaced {
        area.mark_unplaced(b.id.clone());
    }
    if timed_out {
        debug!("rotation-optimized placer exhausted its time budget");
    }

    (
        unplaced,
        PlacerOutcome {
            elapsed: start.elapsed(),
            timed_out,
            rotation_attempts,
            rotation_improvements,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::BlockType;

    fn trestle(id: &str, footprint: Vec<(i64, i64)>) -> VoxelBlock {
        VoxelBlock::new(id, footprint, (0, 0), BlockType::Trestle)
    }

    // S4: a trestle block with asymmetric footprint has different dead-space
    // after 180 degree rotation; the optimizer should not make it worse than
    // the 0 degree baseline and should report the attempt.
    #[test]
    fn trestle_rotation_is_attempted_and_never_worsens_placement() {
        let mut area = PlacementArea::new(12, 12, 0, 0, 0, 0);
        // An L-shaped trestle: asymmetric under 180 degree rotation.
        let block = trestle("T", vec![(0, 0), (1, 0), (2, 0), (0, 1)]);
        let (unplaced, outcome) = place(&mut area, vec![block], Duration::from_secs(1));
        assert!(unplaced.is_empty());
        assert_eq!(outcome.rotation_attempts, 1);
        assert!(area.is_placed("T"));
    }

    #[test]
    fn non_trestle_blocks_delegate_to_greedy_without_rotation_attempts() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        let block = VoxelBlock::new(
            "A",
            vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            (0, 0),
            BlockType::Unknown,
        );
        let (unplaced, outcome) = place(&mut area, vec![block], Duration::from_secs(1));
        assert!(unplaced.is_empty());
        assert_eq!(outcome.rotation_attempts, 0);
    }
}
