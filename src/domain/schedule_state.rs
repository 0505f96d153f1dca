//! Scheduling state threaded through L2/L3: deadlines, VIP classification,
//! per-vessel cooldowns and the assignment bookkeeping.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use super::types::BlockId;

/// Per-block metadata the loader/scheduler need beyond the voxel footprint:
/// declared area, known compatible vessels (`None` means "any"), and deadline.
#[derive(Debug, Clone)]
pub struct BlockMeta {
    pub area: Option<f64>,
    pub compatible_vessels: Option<HashSet<u32>>,
}

impl BlockMeta {
    /// `true` iff the block's compatible-vessel set is exactly `{1}`.
    pub fn is_vip(&self) -> bool {
        matches!(&self.compatible_vessels, Some(set) if set.len() == 1 && set.contains(&1))
    }

    pub fn is_compatible_with(&self, vessel_id: u32) -> bool {
        match &self.compatible_vessels {
            None => true,
            Some(set) => set.contains(&vessel_id),
        }
    }

    /// Scarcity weight: `1 / |compatible_vessels|`, treating "unknown" as 5 candidate vessels.
    pub fn scarcity(&self, unknown_divisor: f64) -> f64 {
        match &self.compatible_vessels {
            None => 1.0 / unknown_divisor,
            Some(set) if set.is_empty() => 1.0 / unknown_divisor,
            Some(set) => 1.0 / set.len() as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignedReason {
    NoDeadline,
    WindowBlockedByCooldown,
    VipOnlyWaitingShip1,
    EligibleButUnscheduled,
}

#[derive(Debug, Default)]
pub struct SchedulingState {
    pub deadlines: HashMap<BlockId, NaiveDate>,
    pub block_meta: HashMap<BlockId, BlockMeta>,
    pub vip_blocks: HashSet<BlockId>,
    pub normal_blocks: HashSet<BlockId>,
    pub last_end: HashMap<String, NaiveDate>,
    pub block_assignments: HashMap<BlockId, String>,
    pub voyage_blocks: HashMap<String, Vec<BlockId>>,
}

impl SchedulingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_block(&mut self, block_id: BlockId, meta: BlockMeta, deadline: Option<NaiveDate>) {
        if let Some(date) = deadline {
            self.deadlines.insert(block_id.clone(), date);
        }
        if meta.is_vip() {
            self.vip_blocks.insert(block_id.clone());
        } else {
            self.normal_blocks.insert(block_id.clone());
        }
        self.block_meta.insert(block_id, meta);
    }

    pub fn is_assigned(&self, block_id: &str) -> bool {
        self.block_assignments.contains_key(block_id)
    }

    /// Records a committed assignment of `block_id` to `voyage_id`.
    pub fn commit(&mut self, block_id: BlockId, voyage_id: &str) {
        self.block_assignments
            .insert(block_id.clone(), voyage_id.to_string());
        self.voyage_blocks
            .entry(voyage_id.to_string())
            .or_default()
            .push(block_id);
    }

    /// Undoes a commit: used when a freshly-created voyage ends up empty and
    /// is rolled back, or never happens — kept symmetric with `commit` so a
    /// caller can always restore a speculative assignment.
    pub fn uncommit_voyage(&mut self, voyage_id: &str) {
        if let Some(blocks) = self.voyage_blocks.remove(voyage_id) {
            for block_id in blocks {
                self.block_assignments.remove(&block_id);
            }
        }
    }

    /// `end_date - last_end(vessel) >= cycle_len(vessel)`, vacuously true if the
    /// vessel has no prior voyage.
    pub fn cooldown_ok(&self, vessel_name: &str, end_date: NaiveDate, cycle_len: i64) -> bool {
        match self.last_end.get(vessel_name) {
            None => true,
            Some(&last) => (end_date - last).num_days() >= cycle_len,
        }
    }

    pub fn advance_cooldown(&mut self, vessel_name: &str, end_date: NaiveDate) {
        self.last_end.insert(vessel_name.to_string(), end_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vip_detection_requires_exactly_vessel_one() {
        let vip = BlockMeta {
            area: Some(10.0),
            compatible_vessels: Some(HashSet::from([1])),
        };
        let not_vip = BlockMeta {
            area: Some(10.0),
            compatible_vessels: Some(HashSet::from([1, 2])),
        };
        let unknown = BlockMeta {
            area: None,
            compatible_vessels: None,
        };
        assert!(vip.is_vip());
        assert!(!not_vip.is_vip());
        assert!(!unknown.is_vip());
    }

    #[test]
    fn scarcity_uses_fallback_divisor_for_unknown_compatibility() {
        let unknown = BlockMeta {
            area: None,
            compatible_vessels: None,
        };
        assert_eq!(unknown.scarcity(5.0), 0.2);
        let single = BlockMeta {
            area: None,
            compatible_vessels: Some(HashSet::from([3])),
        };
        assert_eq!(single.scarcity(5.0), 1.0);
    }

    #[test]
    fn cooldown_ok_is_vacuously_true_without_history() {
        let state = SchedulingState::new();
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(state.cooldown_ok("vessel-1", d, 10));
    }

    #[test]
    fn commit_and_uncommit_are_inverses() {
        let mut state = SchedulingState::new();
        state.commit("A".to_string(), "voyage-1");
        assert!(state.is_assigned("A"));
        state.uncommit_voyage("voyage-1");
        assert!(!state.is_assigned("A"));
        assert!(state.voyage_blocks.get("voyage-1").is_none());
    }
}
