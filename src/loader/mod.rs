//! Voyage Loader (L2/C7): for one voyage, offers a capped candidate subset
//! to a placer via the combined -> VIP-only fallback path, then commits
//! whatever got placed.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::config::constant::TARGET_AREA_SLACK;
use crate::config::{self, round_area};
use crate::domain::schedule_state::SchedulingState;
use crate::domain::types::BlockId;
use crate::domain::voyage::{voyage_id, Voyage, VoyageId};
use crate::domain::{PlacementArea, VesselSpec, VoxelBlock};
use crate::io::{PlacedBlockReport, PlacementResult};
use crate::solver::placers::{Placer, PlacerOutcome};
use crate::utils::loading_window;

/// Snapshots `area`'s placed/unplaced state into a reportable result. Must be
/// called before [`Loader::commit`], which empties the area of its placed
/// blocks by moving them out into the scheduling state.
fn build_placement_result(
    area: &PlacementArea,
    voyage_id: &str,
    outcome: &PlacerOutcome,
) -> PlacementResult {
    let metrics = area.enhanced_metrics();
    let placed = area
        .placed_blocks()
        .values()
        .map(|b| PlacedBlockReport {
            block_id: b.id.clone(),
            anchor: b
                .position
                .map(|p| (p.x, p.y))
                .expect("a placed block always has a position"),
            rotation_degrees: b.rotation_degrees(),
        })
        .collect();
    PlacementResult {
        voyage_id: voyage_id.to_string(),
        placed,
        unplaced: area.unplaced_blocks().iter().cloned().collect(),
        placement_rate: metrics.placement_rate,
        cluster_efficiency: metrics.cluster_efficiency,
        dead_space_ratio: metrics.dead_space_ratio,
        space_saving_ratio: metrics.space_saving_ratio,
        elapsed_ms: outcome.elapsed.as_millis(),
    }
}

pub(crate) fn block_area(meta_area: Option<f64>, block: &VoxelBlock) -> f64 {
    meta_area.unwrap_or(block.area() as f64)
}

fn is_eligible(
    block_id: &str,
    vessel: &VesselSpec,
    end: NaiveDate,
    state: &SchedulingState,
) -> bool {
    let Some(&deadline) = state.deadlines.get(block_id) else {
        return false;
    };
    let (window_start, window_end) = loading_window(deadline, config::constant::WINDOW_DAYS);
    if end < window_start || end > window_end {
        return false;
    }
    let Some(meta) = state.block_meta.get(block_id) else {
        return false;
    };
    if !meta.is_compatible_with(vessel.id) {
        return false;
    }
    if meta.is_vip() && vessel.id != 1 {
        return false;
    }
    true
}

/// Sorts by `(deadline ascending, area descending, block_id ascending)`.
fn sort_eligible(
    ids: &mut Vec<BlockId>,
    state: &SchedulingState,
    blocks: &HashMap<BlockId, VoxelBlock>,
) {
    ids.sort_by(|a, b| {
        let da = state.deadlines.get(a);
        let db = state.deadlines.get(b);
        da.cmp(&db)
            .then_with(|| {
                let area_a = block_area(state.block_meta[a].area, &blocks[a]);
                let area_b = block_area(state.block_meta[b].area, &blocks[b]);
                area_b
                    .partial_cmp(&area_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.cmp(b))
    });
}

/// Greedily prefixes `sorted_ids` under an area budget and a count limit.
fn cap(
    sorted_ids: &[BlockId],
    state: &SchedulingState,
    blocks: &HashMap<BlockId, VoxelBlock>,
    target_area: f64,
    limit: usize,
) -> Vec<BlockId> {
    let mut taken = Vec::new();
    let mut accumulated = 0.0;
    for id in sorted_ids {
        if taken.len() >= limit {
            break;
        }
        let area = block_area(state.block_meta[id].area, &blocks[id]);
        let next = round_area(accumulated + area);
        if next > target_area {
            break;
        }
        accumulated = next;
        taken.push(id.clone());
    }
    taken
}

fn sum_area(ids: &[BlockId], state: &SchedulingState, blocks: &HashMap<BlockId, VoxelBlock>) -> f64 {
    round_area(ids.iter().map(|id| block_area(state.block_meta[id].area, &blocks[id])).sum())
}

/// Moves every id in `ids` out of `area` (placed or not) back into the owned
/// `blocks` pool. Used to discard a trial run net of any permanent effect.
fn restore_to_pool(
    area: &mut PlacementArea,
    ids: &[BlockId],
    leftover: Vec<VoxelBlock>,
    blocks: &mut HashMap<BlockId, VoxelBlock>,
) {
    for id in ids {
        if let Some(block) = area.remove_block(id) {
            blocks.insert(id.clone(), block);
        }
    }
    for block in leftover {
        blocks.insert(block.id.clone(), block);
    }
}

pub struct Loader<'a> {
    pub placer: Placer,
    pub vessels: &'a HashMap<u32, VesselSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    CombinedOk,
    FallbackVipOnly,
    NoAssignment,
}

pub struct LoadReport {
    pub path: LoadPath,
    pub committed: usize,
    pub committed_ids: Vec<BlockId>,
    pub outcome: PlacerOutcome,
    pub placement_result: Option<PlacementResult>,
}

impl<'a> Loader<'a> {
    /// Registers the voyage lazily, applies the cooldown guard, runs the
    /// combined -> VIP-only plan, commits whatever was placed, and rolls
    /// back a freshly-created voyage that ends up empty.
    #[instrument(skip(self, blocks, state, voyages), fields(vessel = %vessel.name, %end))]
    pub fn run_for_single_voyage(
        &self,
        blocks: &mut HashMap<BlockId, VoxelBlock>,
        state: &mut SchedulingState,
        voyages: &mut HashMap<VoyageId, Voyage>,
        vessel: &VesselSpec,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LoadReport {
        if !state.cooldown_ok(&vessel.name, end, vessel.cycle_len()) {
            warn!("cooldown guard blocked this voyage");
            return LoadReport {
                path: LoadPath::NoAssignment,
                committed: 0,
                committed_ids: Vec::new(),
                outcome: PlacerOutcome::default(),
                placement_result: None,
            };
        }

        let id = voyage_id(&vessel.name, start, end);
        let is_new = !voyages.contains_key(&id);
        voyages
            .entry(id.clone())
            .or_insert_with(|| Voyage::new(&vessel.name, start, end));

        let report = self.plan(blocks, state, vessel, end, &id);

        if report.committed == 0 && is_new {
            voyages.remove(&id);
        } else if report.committed > 0 {
            voyages
                .get_mut(&id)
                .expect("voyage was just inserted")
                .blocks
                .extend(report.committed_ids.iter().cloned());
        }
        info!(path = ?report.path, committed = report.committed, "voyage load complete");
        report
    }

    fn plan(
        &self,
        blocks: &mut HashMap<BlockId, VoxelBlock>,
        state: &mut SchedulingState,
        vessel: &VesselSpec,
        end: NaiveDate,
        voyage_id: &str,
    ) -> LoadReport {
        let mut vip_ids: Vec<BlockId> = state
            .vip_blocks
            .iter()
            .filter(|id| !state.is_assigned(id) && is_eligible(id, vessel, end, state))
            .cloned()
            .collect();
        let mut normal_ids: Vec<BlockId> = state
            .normal_blocks
            .iter()
            .filter(|id| !state.is_assigned(id) && is_eligible(id, vessel, end, state))
            .cloned()
            .collect();
        sort_eligible(&mut vip_ids, state, blocks);
        sort_eligible(&mut normal_ids, state, blocks);

        let target_area = vessel.deck_area() * TARGET_AREA_SLACK;
        let limit = config::page_limit(vessel.id);

        let vip_seed: Vec<BlockId> = if vessel.id == 1 {
            cap(&vip_ids, state, blocks, target_area, limit)
        } else {
            Vec::new()
        };
        let rem_area = (target_area - sum_area(&vip_seed, state, blocks)).max(0.0);
        let normal_take = cap(&normal_ids, state, blocks, rem_area, limit);

        let vip_seed_set: HashSet<BlockId> = vip_seed.iter().cloned().collect();
        let union: Vec<BlockId> = vip_seed
            .iter()
            .cloned()
            .chain(normal_take.iter().filter(|id| !vip_seed_set.contains(*id)).cloned())
            .collect();

        if union.is_empty() {
            return LoadReport {
                path: LoadPath::NoAssignment,
                committed: 0,
                committed_ids: Vec::new(),
                outcome: PlacerOutcome::default(),
                placement_result: None,
            };
        }

        let timeout = if vip_seed.is_empty() {
            config::constant::TIMEOUT_STANDARD
        } else {
            config::constant::TIMEOUT_SINGLE_WINDOW
        };

        let pool: Vec<VoxelBlock> = union
            .iter()
            .map(|id| blocks.remove(id).expect("eligible block is present in the pool"))
            .collect();
        let mut area = PlacementArea::from_vessel(vessel);
        let (leftover, outcome) = self.placer.place(&mut area, pool, timeout);

        let placed_ids: HashSet<BlockId> = area.placed_blocks().keys().cloned().collect();
        let combined_ok = vip_seed_set.iter().all(|id| placed_ids.contains(id));

        if combined_ok {
            let committed_ids: Vec<BlockId> = area
                .placement_order()
                .iter()
                .filter(|id| placed_ids.contains(*id))
                .cloned()
                .collect();
            let placement_result = build_placement_result(&area, voyage_id, &outcome);
            self.commit(&mut area, &placed_ids, state, voyage_id);
            for block in leftover {
                blocks.insert(block.id.clone(), block);
            }
            return LoadReport {
                path: LoadPath::CombinedOk,
                committed: committed_ids.len(),
                committed_ids,
                outcome,
                placement_result: Some(placement_result),
            };
        }

        restore_to_pool(&mut area, &union, leftover, blocks);

        if vip_seed.is_empty() {
            return LoadReport {
                path: LoadPath::NoAssignment,
                committed: 0,
                committed_ids: Vec::new(),
                outcome,
                placement_result: None,
            };
        }

        let vip_pool: Vec<VoxelBlock> = vip_seed
            .iter()
            .map(|id| blocks.remove(id).expect("vip seed block is present in the pool"))
            .collect();
        let mut vip_area = PlacementArea::from_vessel(vessel);
        let (vip_leftover, vip_outcome) = self.placer.place(
            &mut vip_area,
            vip_pool,
            config::constant::TIMEOUT_SINGLE_WINDOW,
        );
        let vip_placed: HashSet<BlockId> = vip_area.placed_blocks().keys().cloned().collect();
        let committed_ids: Vec<BlockId> = vip_area
            .placement_order()
            .iter()
            .filter(|id| vip_placed.contains(*id))
            .cloned()
            .collect();
        let placement_result = if committed_ids.is_empty() {
            None
        } else {
            Some(build_placement_result(&vip_area, voyage_id, &vip_outcome))
        };
        self.commit(&mut vip_area, &vip_placed, state, voyage_id);
        for block in vip_leftover {
            blocks.insert(block.id.clone(), block);
        }

        LoadReport {
            path: if committed_ids.is_empty() {
                LoadPath::NoAssignment
            } else {
                LoadPath::FallbackVipOnly
            },
            committed: committed_ids.len(),
            committed_ids,
            outcome: vip_outcome,
            placement_result,
        }
    }

    fn commit(
        &self,
        area: &mut PlacementArea,
        placed_ids: &HashSet<BlockId>,
        state: &mut SchedulingState,
        voyage_id: &str,
    ) {
        for id in placed_ids {
            area.remove_block(id);
            state.commit(id.clone(), voyage_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::BlockType;
    use crate::domain::schedule_state::BlockMeta;

    fn vessel(id: u32) -> VesselSpec {
        VesselSpec {
            id,
            name: format!("vessel-{id}"),
            width_m: 100.0,
            height_m: 40.0,
            voyage_cost: 1000.0,
            cycle_phases: (2, 3, 2, 1),
            bow_clearance: 0,
            stern_clearance: 0,
            block_spacing: 0,
            ring_bow_clearance: 0,
            width_grids: 10,
            height_grids: 10,
        }
    }

    fn square(id: &str) -> VoxelBlock {
        VoxelBlock::new(
            id,
            vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            (0, 0),
            BlockType::Unknown,
        )
    }

    #[test]
    fn s6_rollback_on_zero_placements() {
        let vessels = HashMap::from([(1, vessel(1))]);
        let loader = Loader {
            placer: Placer::GreedyCompact,
            vessels: &vessels,
        };
        let mut blocks = HashMap::new();
        let mut state = SchedulingState::new();
        let mut voyages = HashMap::new();

        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let report =
            loader.run_for_single_voyage(&mut blocks, &mut state, &mut voyages, &vessels[&1], start, end);

        assert_eq!(report.committed, 0);
        assert!(voyages.is_empty());
        assert!(state.last_end.get("vessel-1").is_none());
    }

    #[test]
    fn commits_eligible_block_within_its_window() {
        let v = vessel(1);
        let vessels = HashMap::from([(1, v.clone())]);
        let loader = Loader {
            placer: Placer::GreedyCompact,
            vessels: &vessels,
        };
        let mut blocks = HashMap::from([("A".to_string(), square("A"))]);
        let mut state = SchedulingState::new();
        let deadline = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        state.register_block(
            "A".to_string(),
            BlockMeta {
                area: Some(4.0),
                compatible_vessels: None,
            },
            Some(deadline),
        );
        let mut voyages = HashMap::new();
        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let report =
            loader.run_for_single_voyage(&mut blocks, &mut state, &mut voyages, &v, start, end);
        assert_eq!(report.committed, 1);
        assert!(state.is_assigned("A"));
        assert!(blocks.is_empty());
    }
}
