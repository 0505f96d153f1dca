//! Fleet Scheduler (L3/C8): per-round candidate-date synthesis and
//! weighted-independent-set selection per vessel, executed through the
//! loader, followed by a rescue pass and a reporting-only cooldown audit.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{info, instrument, warn};

use crate::config::{self, constant::*, round_area};
use crate::domain::schedule_state::{BlockMeta, SchedulingState, UnassignedReason};
use crate::domain::types::BlockId;
use crate::domain::voyage::{Voyage, VoyageId};
use crate::domain::{VesselSpec, VoxelBlock};
use crate::loader::{block_area, Loader};
use crate::utils::loading_window;

fn vessel_eligible_blocks(vessel: &VesselSpec, state: &SchedulingState) -> Vec<BlockId> {
    state
        .deadlines
        .keys()
        .filter(|id| !state.is_assigned(id))
        .filter(|id| {
            let Some(meta) = state.block_meta.get(id.as_str()) else {
                return false;
            };
            if !meta.is_compatible_with(vessel.id) {
                return false;
            }
            if meta.is_vip() && vessel.id != 1 {
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

/// Union of window endpoints, the top-K most-occupied histogram dates, and a
/// uniform grid, sorted and deduplicated.
fn candidate_dates(windows: &HashMap<BlockId, (NaiveDate, NaiveDate)>) -> Vec<NaiveDate> {
    if windows.is_empty() {
        return Vec::new();
    }

    let mut set: HashSet<NaiveDate> = HashSet::new();
    for &(start, end) in windows.values() {
        set.insert(start);
        set.insert(end);
    }

    let mut histogram: HashMap<NaiveDate, usize> = HashMap::new();
    for &(start, end) in windows.values() {
        let mut d = start;
        while d <= end {
            *histogram.entry(d).or_insert(0) += 1;
            d += chrono::Duration::days(1);
        }
    }
    let mut by_count: Vec<(NaiveDate, usize)> = histogram.into_iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for &(d, _) in by_count.iter().take(CANDIDATE_DATE_TOP_K) {
        set.insert(d);
    }

    let min_edge = windows.values().map(|w| w.0).min().unwrap();
    let max_edge = windows.values().map(|w| w.1).max().unwrap();
    let mut d = min_edge;
    while d <= max_edge {
        set.insert(d);
        d += chrono::Duration::days(CANDIDATE_DATE_GRID_STEP);
    }

    set.into_iter().sorted().collect()
}

/// Sum of weights of the blocks eligible on `date`, prefix-selected under
/// `target_area` in descending `weight/area` order.
fn score_date(
    date: NaiveDate,
    eligible: &[BlockId],
    windows: &HashMap<BlockId, (NaiveDate, NaiveDate)>,
    state: &SchedulingState,
    blocks: &HashMap<BlockId, VoxelBlock>,
    vessel: &VesselSpec,
    target_area: f64,
) -> f64 {
    let mut weighted: Vec<(f64, f64)> = eligible
        .iter()
        .filter(|id| {
            let (start, end) = windows[id.as_str()];
            date >= start && date <= end
        })
        .map(|id| {
            let meta = &state.block_meta[id];
            let area = block_area(meta.area, &blocks[id]);
            let scarcity = meta.scarcity(UNKNOWN_COMPAT_SCARCITY_DIVISOR);
            let vip_bonus = if vessel.id == 1 && meta.is_vip() {
                VIP_SCORE_BONUS
            } else {
                1.0
            };
            (area, area * scarcity * vip_bonus)
        })
        .collect();
    weighted.sort_by(|a, b| {
        let ratio_a = if a.0 > 0.0 { a.1 / a.0 } else { a.1 };
        let ratio_b = if b.0 > 0.0 { b.1 / b.0 } else { b.1 };
        ratio_b.partial_cmp(&ratio_a).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut accumulated = 0.0;
    let mut score = 0.0;
    for (area, weight) in weighted {
        let next = round_area(accumulated + area);
        if next > target_area {
            break;
        }
        accumulated = next;
        score += weight;
    }
    score
}

/// Weighted independent set with a minimum gap between consecutive picks,
/// solved by the standard "last compatible predecessor" DP. Ties in the
/// inclusion test favor *not* re-picking (the earlier, already-settled
/// schedule wins), matching the crate's general tie-break-toward-stability
/// convention.
fn select_dates(dates: &[NaiveDate], scores: &[f64], gap: i64) -> Vec<NaiveDate> {
    let n = dates.len();
    if n == 0 {
        return Vec::new();
    }

    let mut pred = vec![0usize; n];
    for i in 0..n {
        for j in (0..i).rev() {
            if (dates[i] - dates[j]).num_days() >= gap {
                pred[i] = j + 1;
                break;
            }
        }
    }

    let mut dp = vec![0.0f64; n + 1];
    let mut take = vec![false; n + 1];
    for i in 1..=n {
        let incl = scores[i - 1] + dp[pred[i - 1]];
        if incl > dp[i - 1] {
            dp[i] = incl;
            take[i] = true;
        } else {
            dp[i] = dp[i - 1];
        }
    }

    let mut selected = Vec::new();
    let mut i = n;
    while i > 0 {
        if take[i] {
            selected.push(dates[i - 1]);
            i = pred[i - 1];
        } else {
            i -= 1;
        }
    }
    selected.reverse();
    selected
}

fn any_available_with_deadline(state: &SchedulingState) -> bool {
    state.deadlines.keys().any(|id| !state.is_assigned(id))
}

fn feasibility_score(state: &SchedulingState, block_id: &str) -> i64 {
    let compat = state
        .block_meta
        .get(block_id)
        .and_then(|m| m.compatible_vessels.as_ref().map(|s| s.len() as i64))
        .unwrap_or(UNKNOWN_COMPAT_SCARCITY_DIVISOR as i64);
    compat * WINDOW_DAYS
}

/// Compatible vessels in ascending id order; VIP blocks only ever consider
/// vessel 1 (their compatible set is exactly `{1}` by construction).
fn vessel_preference_order(meta: &BlockMeta, vessels: &HashMap<u32, VesselSpec>) -> Vec<u32> {
    let mut order: Vec<u32> = vessels.keys().copied().collect();
    order.sort();
    if meta.is_vip() {
        order.retain(|id| *id == 1);
    } else if let Some(set) = &meta.compatible_vessels {
        order.retain(|id| set.contains(id));
    }
    order
}

#[derive(Debug, Clone)]
pub struct CooldownViolation {
    pub vessel_name: String,
    pub gap_days: i64,
    pub required: i64,
}

#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub rounds_run: u32,
    pub cooldown_violations: Vec<CooldownViolation>,
    pub unassigned: HashMap<BlockId, UnassignedReason>,
}

pub struct Scheduler<'a> {
    pub loader: Loader<'a>,
}

impl<'a> Scheduler<'a> {
    pub fn new(loader: Loader<'a>) -> Self {
        Self { loader }
    }

    /// Runs up to [`MAX_ROUNDS`] rounds, a rescue pass after each, then a
    /// cooldown audit and unassigned-reason classification.
    #[instrument(skip(self, blocks, state, voyages))]
    pub fn run(
        &self,
        blocks: &mut HashMap<BlockId, VoxelBlock>,
        state: &mut SchedulingState,
        voyages: &mut HashMap<VoyageId, Voyage>,
    ) -> ScheduleReport {
        let mut vessel_ids: Vec<u32> = self.loader.vessels.keys().copied().collect();
        vessel_ids.sort();

        let mut rounds_run = 0;
        for round in 1..=MAX_ROUNDS {
            if !any_available_with_deadline(state) {
                break;
            }
            rounds_run = round;
            let _span = tracing::info_span!("round", round).entered();
            for &vessel_id in &vessel_ids {
                let vessel = &self.loader.vessels[&vessel_id];
                self.run_vessel_round(blocks, state, voyages, vessel);
            }
            self.rescue_pass(blocks, state, voyages);
        }

        let cooldown_violations = self.audit_cooldowns(voyages);
        let unassigned = self.classify_unassigned(state);
        info!(
            rounds_run,
            unassigned = unassigned.len(),
            violations = cooldown_violations.len(),
            "scheduling complete"
        );
        ScheduleReport {
            rounds_run,
            cooldown_violations,
            unassigned,
        }
    }

    /// Synthesizes candidate dates for `vessel`, selects a mutually-compatible
    /// subset, and executes each through the loader in chronological order.
    fn run_vessel_round(
        &self,
        blocks: &mut HashMap<BlockId, VoxelBlock>,
        state: &mut SchedulingState,
        voyages: &mut HashMap<VoyageId, Voyage>,
        vessel: &VesselSpec,
    ) -> bool {
        let eligible = vessel_eligible_blocks(vessel, state);
        if eligible.is_empty() {
            return false;
        }
        let windows: HashMap<BlockId, (NaiveDate, NaiveDate)> = eligible
            .iter()
            .map(|id| (id.clone(), loading_window(state.deadlines[id], WINDOW_DAYS)))
            .collect();

        let dates = candidate_dates(&windows);
        let target_area = vessel.deck_area() * TARGET_AREA_SLACK;
        let scores: Vec<f64> = dates
            .iter()
            .map(|&d| score_date(d, &eligible, &windows, state, blocks, vessel, target_area))
            .collect();
        let selected = select_dates(&dates, &scores, vessel.cycle_len());

        let mut progressed = false;
        for end_date in selected {
            let start = end_date - chrono::Duration::days(vessel.cycle_len() - 1);
            let report =
                self.loader
                    .run_for_single_voyage(blocks, state, voyages, vessel, start, end_date);
            if report.committed > 0 {
                state.advance_cooldown(&vessel.name, end_date);
                progressed = true;
            }
        }
        progressed
    }

    /// Hardest-first rescue: for each still-unassigned block with a known
    /// deadline, probes a handful of end-date offsets per compatible vessel
    /// until one call to the loader places something.
    fn rescue_pass(
        &self,
        blocks: &mut HashMap<BlockId, VoxelBlock>,
        state: &mut SchedulingState,
        voyages: &mut HashMap<VoyageId, Voyage>,
    ) {
        let mut remaining: Vec<BlockId> = state
            .deadlines
            .keys()
            .filter(|id| !state.is_assigned(id))
            .cloned()
            .collect();
        remaining.sort_by(|a, b| {
            feasibility_score(state, a)
                .cmp(&feasibility_score(state, b))
                .then_with(|| a.cmp(b))
        });

        for block_id in remaining {
            if state.is_assigned(&block_id) {
                continue;
            }
            let Some(&deadline) = state.deadlines.get(&block_id) else {
                continue;
            };
            let Some(meta) = state.block_meta.get(&block_id).cloned() else {
                continue;
            };
            let (window_start, window_end) = loading_window(deadline, WINDOW_DAYS);
            let vessel_order = vessel_preference_order(&meta, self.loader.vessels);

            'vessels: for vessel_id in vessel_order {
                let vessel = &self.loader.vessels[&vessel_id];
                let earliest = match state.last_end.get(&vessel.name) {
                    Some(&last) => (last + chrono::Duration::days(vessel.cycle_len())).max(window_start),
                    None => window_start,
                };
                let offsets = config::rescue_offsets(vessel.cycle_len());
                let candidate_ends: Vec<NaiveDate> = offsets
                    .iter()
                    .map(|&offset| earliest + chrono::Duration::days(offset))
                    .chain(std::iter::once(window_end))
                    .filter(|&d| d <= window_end)
                    .sorted()
                    .dedup()
                    .take(RESCUE_OFFSET_COUNT)
                    .collect();
                for end_date in candidate_ends {
                    let start = end_date - chrono::Duration::days(vessel.cycle_len() - 1);
                    let report = self.loader.run_for_single_voyage(
                        blocks, state, voyages, vessel, start, end_date,
                    );
                    if report.committed > 0 {
                        state.advance_cooldown(&vessel.name, end_date);
                        break 'vessels;
                    }
                }
            }
        }
    }

    fn audit_cooldowns(&self, voyages: &HashMap<VoyageId, Voyage>) -> Vec<CooldownViolation> {
        let mut violations = Vec::new();
        for vessel in self.loader.vessels.values() {
            let mut end_dates: Vec<NaiveDate> = voyages
                .values()
                .filter(|v| v.vessel_name == vessel.name && !v.is_empty())
                .map(|v| v.end_date)
                .collect();
            end_dates.sort();
            for pair in end_dates.windows(2) {
                let gap = (pair[1] - pair[0]).num_days();
                if gap < vessel.cycle_len() {
                    warn!(
                        vessel = %vessel.name,
                        gap,
                        required = vessel.cycle_len(),
                        "cooldown violation"
                    );
                    violations.push(CooldownViolation {
                        vessel_name: vessel.name.clone(),
                        gap_days: gap,
                        required: vessel.cycle_len(),
                    });
                }
            }
        }
        violations
    }

    fn classify_unassigned(&self, state: &SchedulingState) -> HashMap<BlockId, UnassignedReason> {
        let all_ids: HashSet<BlockId> = state
            .vip_blocks
            .iter()
            .chain(state.normal_blocks.iter())
            .cloned()
            .collect();
        all_ids
            .into_iter()
            .filter(|id| !state.is_assigned(id))
            .map(|id| {
                let reason = self.classify_block(&id, state);
                (id, reason)
            })
            .collect()
    }

    fn classify_block(&self, id: &str, state: &SchedulingState) -> UnassignedReason {
        let Some(&deadline) = state.deadlines.get(id) else {
            return UnassignedReason::NoDeadline;
        };
        let meta = &state.block_meta[id];
        let (window_start, window_end) = loading_window(deadline, WINDOW_DAYS);

        if meta.is_vip() {
            return match self.loader.vessels.get(&1) {
                Some(vessel) if self.window_blocked_by_cooldown(vessel, window_start, window_end, state) => {
                    UnassignedReason::WindowBlockedByCooldown
                }
                _ => UnassignedReason::VipOnlyWaitingShip1,
            };
        }

        let compatible: Vec<u32> = match &meta.compatible_vessels {
            None => self.loader.vessels.keys().copied().collect(),
            Some(set) => set.iter().copied().collect(),
        };
        let all_cooldown_blocked = !compatible.is_empty()
            && compatible.iter().all(|vid| {
                self.loader.vessels.get(vid).is_some_and(|v| {
                    self.window_blocked_by_cooldown(v, window_start, window_end, state)
                })
            });
        if all_cooldown_blocked {
            UnassignedReason::WindowBlockedByCooldown
        } else {
            UnassignedReason::EligibleButUnscheduled
        }
    }

    /// `true` iff the vessel's earliest legal next end-date, given its last
    /// used voyage, already falls after this block's window closes.
    fn window_blocked_by_cooldown(
        &self,
        vessel: &VesselSpec,
        _window_start: NaiveDate,
        window_end: NaiveDate,
        state: &SchedulingState,
    ) -> bool {
        match state.last_end.get(&vessel.name) {
            None => false,
            Some(&last) => last + chrono::Duration::days(vessel.cycle_len()) > window_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::BlockType;
    use crate::solver::placers::Placer;

    fn vessel(id: u32, cycle_len: i64) -> VesselSpec {
        VesselSpec {
            id,
            name: format!("vessel-{id}"),
            width_m: 100.0,
            height_m: 40.0,
            voyage_cost: 1000.0,
            cycle_phases: (cycle_len, 0, 0, 0),
            bow_clearance: 0,
            stern_clearance: 0,
            block_spacing: 0,
            ring_bow_clearance: 0,
            width_grids: 20,
            height_grids: 20,
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

    // S5: gaps (7, 6) between d1/d2/d3, scores (10, 5, 10), gap requirement 12.
    // {d1, d3} (actual gap 13) beats {d2} alone: 20 > 5.
    #[test]
    fn s5_date_selection_prefers_the_further_apart_pair() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = d1 + chrono::Duration::days(7);
        let d3 = d2 + chrono::Duration::days(6);
        let dates = vec![d1, d2, d3];
        let scores = vec![10.0, 5.0, 10.0];
        let selected = select_dates(&dates, &scores, 12);
        assert_eq!(selected, vec![d1, d3]);
    }

    #[test]
    fn select_dates_is_empty_for_no_candidates() {
        assert!(select_dates(&[], &[], 10).is_empty());
    }

    #[test]
    fn candidate_dates_always_include_window_endpoints() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let windows = HashMap::from([("A".to_string(), loading_window(d, WINDOW_DAYS))]);
        let dates = candidate_dates(&windows);
        let (start, end) = windows["A"];
        assert!(dates.contains(&start));
        assert!(dates.contains(&end));
    }

    #[test]
    fn a_block_with_no_deadline_is_classified_accordingly() {
        let vessels = HashMap::from([(1, vessel(1, 8))]);
        let loader = Loader {
            placer: Placer::GreedyCompact,
            vessels: &vessels,
        };
        let scheduler = Scheduler::new(loader);
        let mut state = SchedulingState::new();
        state.register_block(
            "A".to_string(),
            BlockMeta {
                area: Some(4.0),
                compatible_vessels: None,
            },
            None,
        );
        let reasons = scheduler.classify_unassigned(&state);
        assert_eq!(reasons["A"], UnassignedReason::NoDeadline);
    }

    #[test]
    fn a_vip_block_is_classified_as_waiting_on_ship_one() {
        let vessels = HashMap::from([(1, vessel(1, 8))]);
        let loader = Loader {
            placer: Placer::GreedyCompact,
            vessels: &vessels,
        };
        let scheduler = Scheduler::new(loader);
        let mut state = SchedulingState::new();
        let deadline = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        state.register_block(
            "V".to_string(),
            BlockMeta {
                area: Some(4.0),
                compatible_vessels: Some(HashSet::from([1])),
            },
            Some(deadline),
        );
        let reasons = scheduler.classify_unassigned(&state);
        assert_eq!(reasons["V"], UnassignedReason::VipOnlyWaitingShip1);
    }

    #[test]
    fn end_to_end_round_commits_a_single_eligible_block() {
        let v = vessel(1, 8);
        let vessels = HashMap::from([(1, v)]);
        let loader = Loader {
            placer: Placer::GreedyCompact,
            vessels: &vessels,
        };
        let scheduler = Scheduler::new(loader);

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

        let report = scheduler.run(&mut blocks, &mut state, &mut voyages);

        assert!(state.is_assigned("A"));
        assert!(blocks.is_empty());
        assert!(report.unassigned.is_empty());
        assert!(report.cooldown_violations.is_empty());
    }
}
