//! Placement Area (C2): owns the occupancy grid and enforces the geometric and
//! transporter-access invariants on every mutation.

use std::collections::{HashMap, HashSet};

use super::block::VoxelBlock;
use super::types::{BlockId, Position};
use super::vessel::VesselSpec;
use crate::config::constant::CLUSTER_LEFT_TRIM_FRACTION;
use crate::utils::chebyshev;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterMetrics {
    pub placement_rate: f64,
    pub cluster_bounding_box: (i64, i64, i64, i64), // (left, bottom, right, top)
    pub cluster_area: f64,
    pub total_block_area: f64,
    pub cluster_efficiency: f64,
    pub dead_space_ratio: f64,
    pub space_saving_ratio: f64,
}

#[derive(Debug)]
pub struct PlacementArea {
    effective_width: i64,
    height: i64,
    bow_clearance: i64,
    stern_clearance: i64,
    block_spacing: i64,
    ring_bow_clearance: i64,

    grid: HashMap<(i64, i64), BlockId>,
    placed_blocks: HashMap<BlockId, VoxelBlock>,
    unplaced_blocks: HashSet<BlockId>,
    placement_order: Vec<BlockId>,
    seen_ids: HashSet<BlockId>,
}

impl PlacementArea {
    pub fn new(
        effective_width: i64,
        height: i64,
        bow_clearance: i64,
        stern_clearance: i64,
        block_spacing: i64,
        ring_bow_clearance: i64,
    ) -> Self {
        Self {
            effective_width,
            height,
            bow_clearance,
            stern_clearance,
            block_spacing,
            ring_bow_clearance,
            grid: HashMap::new(),
            placed_blocks: HashMap::new(),
            unplaced_blocks: HashSet::new(),
            placement_order: Vec::new(),
            seen_ids: HashSet::new(),
        }
    }

    pub fn from_vessel(vessel: &VesselSpec) -> Self {
        Self::new(
            vessel.effective_width(),
            vessel.height_grids,
            vessel.bow_clearance,
            vessel.stern_clearance,
            vessel.block_spacing,
            vessel.ring_bow_clearance,
        )
    }

    pub fn effective_width(&self) -> i64 {
        self.effective_width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn block_spacing(&self) -> i64 {
        self.block_spacing
    }

    pub fn bow_clearance(&self) -> i64 {
        self.bow_clearance
    }

    pub fn ring_bow_clearance(&self) -> i64 {
        self.ring_bow_clearance
    }

    /// The physical grid width cranes may intrude into: `effective_width + bow_clearance`.
    pub fn crane_bound_width(&self) -> i64 {
        self.effective_width + self.bow_clearance
    }

    pub fn placed_blocks(&self) -> &HashMap<BlockId, VoxelBlock> {
        &self.placed_blocks
    }

    pub fn unplaced_blocks(&self) -> &HashSet<BlockId> {
        &self.unplaced_blocks
    }

    pub fn placement_order(&self) -> &[BlockId] {
        &self.placement_order
    }

    pub fn is_placed(&self, block_id: &str) -> bool {
        self.placed_blocks.contains_key(block_id)
    }

    pub fn occupant_at(&self, x: i64, y: i64) -> Option<&str> {
        self.grid.get(&(x, y)).map(|id| id.as_str())
    }

    /// Marks a block that was never placed as unplaced, so that after a placer
    /// run `unplaced_blocks` can be reconciled to `input_ids - placed_ids`
    /// without ever having gone through `place_block`/`remove_block`.
    pub fn mark_unplaced(&mut self, block_id: BlockId) {
        if !self.placed_blocks.contains_key(&block_id) {
            self.unplaced_blocks.insert(block_id);
        }
    }

    /// Checks non-overlap/bounds, crane ring-bow clearance, transporter access, and
    /// inter-block spacing, in that order, without mutating anything.
    pub fn can_place(&self, block: &VoxelBlock, px: i64, py: i64) -> bool {
        let world_cells = block.footprint_at(px, py);
        let bound_width = if block.is_crane() {
            self.crane_bound_width()
        } else {
            self.effective_width
        };

        for &(x, y) in &world_cells {
            if x < 0 || y < 0 || x >= bound_width || y >= self.height {
                return false;
            }
            if let Some(occupant) = self.grid.get(&(x, y)) {
                if occupant != &block.id {
                    return false;
                }
            }
        }

        if block.is_crane() {
            let rightmost = world_cells.iter().map(|c| c.0).max().unwrap();
            let limit = self.crane_bound_width() - self.ring_bow_clearance - 1;
            if rightmost > limit {
                return false;
            }
        } else if !self.has_transporter_access(&world_cells, &block.id) {
            return false;
        }

        self.satisfies_spacing(block, px, py)
    }

    fn has_transporter_access(&self, world_cells: &[(i64, i64)], self_id: &str) -> bool {
        let min_y = world_cells.iter().map(|c| c.1).min().unwrap();
        let max_y = world_cells.iter().map(|c| c.1).max().unwrap();
        let leftmost_x = world_cells.iter().map(|c| c.0).min().unwrap();

        for y in min_y..=max_y {
            for x in 0..leftmost_x {
                if let Some(occupant) = self.grid.get(&(x, y)) {
                    if occupant != self_id {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn satisfies_spacing(&self, block: &VoxelBlock, px: i64, py: i64) -> bool {
        if self.block_spacing <= 0 {
            return true;
        }
        let candidate_boundary = translated_boundary(block, px, py);
        for (other_id, other) in &self.placed_blocks {
            if other_id == &block.id {
                continue;
            }
            let other_boundary = other.world_boundary_cells();
            for &a in &candidate_boundary {
                for &b in &other_boundary {
                    if chebyshev(a, b) < self.block_spacing {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Atomically writes the block's world footprint into the grid. On failure the
    /// block is handed back unmodified so the caller loses nothing.
    pub fn place_block(&mut self, mut block: VoxelBlock, px: i64, py: i64) -> Result<(), VoxelBlock> {
        if !self.can_place(&block, px, py) {
            return Err(block);
        }

        let world_cells = block.footprint_at(px, py);
        block.position = Some(Position::new(px, py));

        for cell in world_cells {
            self.grid.insert(cell, block.id.clone());
        }

        self.unplaced_blocks.remove(&block.id);
        if self.seen_ids.insert(block.id.clone()) {
            self.placement_order.push(block.id.clone());
        }
        self.placed_blocks.insert(block.id.clone(), block);
        Ok(())
    }

    /// Removes a placed block, clearing its grid cells and marking it unplaced.
    /// Idempotent: returns `None` for a block that is not currently placed.
    pub fn remove_block(&mut self, block_id: &str) -> Option<VoxelBlock> {
        let mut block = self.placed_blocks.remove(block_id)?;
        let Some(pos) = block.position else {
            // Should not happen for a block that was in placed_blocks, but keep the
            // removal atomic regardless.
            self.unplaced_blocks.insert(block_id.to_string());
            return Some(block);
        };
        for cell in block.footprint_at(pos.x, pos.y) {
            self.grid.remove(&cell);
        }
        block.position = None;
        self.unplaced_blocks.insert(block_id.to_string());
        Some(block)
    }

    pub fn enhanced_metrics(&self) -> ClusterMetrics {
        let total_block_area: f64 = self.placed_blocks.values().map(|b| b.area() as f64).sum();
        let total_blocks = self.placed_blocks.len() + self.unplaced_blocks.len();
        let placement_rate = if total_blocks == 0 {
            1.0
        } else {
            self.placed_blocks.len() as f64 / total_blocks as f64
        };

        if self.placed_blocks.is_empty() {
            return ClusterMetrics {
                placement_rate,
                ..Default::default()
            };
        }

        let mut occupied: Vec<(i64, i64)> = Vec::new();
        for block in self.placed_blocks.values() {
            let pos = block.position.expect("placed block has a position");
            occupied.extend(block.footprint_at(pos.x, pos.y));
        }

        let mut rows: HashMap<i64, i64> = HashMap::new();
        for &(x, y) in &occupied {
            rows.entry(y)
                .and_modify(|leftmost| *leftmost = (*leftmost).min(x))
                .or_insert(x);
        }

        let mut leftmost_per_row: Vec<i64> = rows.values().copied().collect();
        leftmost_per_row.sort_unstable();
        let keep = ((leftmost_per_row.len() as f64) * (1.0 - CLUSTER_LEFT_TRIM_FRACTION)).floor()
            as usize;
        let keep = keep.max(1).min(leftmost_per_row.len());
        let trimmed_mean = leftmost_per_row[..keep].iter().sum::<i64>() as f64 / keep as f64;

        let max_x = occupied.iter().map(|c| c.0).max().unwrap();
        let min_y = occupied.iter().map(|c| c.1).min().unwrap();
        let max_y = occupied.iter().map(|c| c.1).max().unwrap();

        let left = (trimmed_mean - self.block_spacing as f64).max(0.0);
        let right = (max_x + 1 + self.block_spacing) as f64;
        let bottom = ((min_y - self.block_spacing).max(0)) as f64;
        let top = (max_y + 1 + self.block_spacing) as f64;

        let cluster_area = ((right - left).max(0.0)) * ((top - bottom).max(0.0));
        let cluster_efficiency = if cluster_area > 0.0 {
            total_block_area / cluster_area
        } else {
            0.0
        };
        let total_deck_area = (self.crane_bound_width() * self.height) as f64;
        let space_saving_ratio = if total_deck_area > 0.0 {
            cluster_area / total_deck_area
        } else {
            0.0
        };

        ClusterMetrics {
            placement_rate,
            cluster_bounding_box: (left as i64, bottom as i64, right as i64, top as i64),
            cluster_area,
            total_block_area,
            cluster_efficiency,
            dead_space_ratio: 1.0 - cluster_efficiency,
            space_saving_ratio,
        }
    }
}

fn translated_boundary(block: &VoxelBlock, px: i64, py: i64) -> Vec<(i64, i64)> {
    let (ref_x, ref_y) = block.actual_reference();
    block
        .boundary_cells()
        .into_iter()
        .map(|(vx, vy)| (px - ref_x + vx, py - ref_y + vy))
        .collect()
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

    fn crane_square(id: &str, side: i64) -> VoxelBlock {
        let mut footprint = Vec::new();
        for x in 0..side {
            for y in 0..side {
                footprint.push((x, y));
            }
        }
        VoxelBlock::new(id, footprint, (0, 0), BlockType::Crane)
    }

    // S1: single block on an empty 10x10 deck with zero clearances places flush
    // rightmost-bottom.
    #[test]
    fn s1_single_block_fits_rightmost_bottom() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        let block = square("A");
        assert!(area.can_place(&block, 8, 0));
        area.place_block(block, 8, 0).unwrap();
        assert_eq!(area.enhanced_metrics().placement_rate, 1.0);
    }

    // S2: with spacing=2, a second 2x2 block may sit at x=5 but not x=6.
    #[test]
    fn s2_spacing_enforcement() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 2, 0);
        area.place_block(square("A"), 8, 0).unwrap();

        let b_ok = square("B");
        assert!(area.can_place(&b_ok, 5, 0));

        let b_bad = square("B");
        assert!(!area.can_place(&b_bad, 6, 0));
    }

    // S3: crane ring-bow clearance constrains the rightmost legal position.
    #[test]
    fn s3_crane_ring_bow_clearance() {
        // effective_width=10, bow_clearance=4 => crane_bound_width=14.
        // ring_bow_clearance=6 => rightmost cell must be <= 14-6-1 = 7.
        let area = PlacementArea::new(10, 10, 4, 0, 0, 6);
        let crane = crane_square("C", 3);

        // Flush right against the crane bound (x=11..13) violates ring-bow.
        assert!(!area.can_place(&crane, 11, 0));
        // x=5 gives cells 5..7, satisfying rightmost <= 7.
        assert!(area.can_place(&crane, 5, 0));
    }

    #[test]
    fn non_crane_block_needs_transporter_corridor() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        // Block occupying the full left column at y=0..1 blocks the corridor for a
        // block placed to its right at the same y-span.
        let blocker = square("blocker");
        area.place_block(blocker, 0, 0).unwrap();

        let candidate = square("candidate");
        // Candidate at x=4 has its corridor (x=0..3, y=0..1) obstructed by blocker's
        // cells at x=0..1.
        assert!(!area.can_place(&candidate, 4, 0));
    }

    #[test]
    fn place_then_remove_restores_state() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        let block = square("A");
        area.place_block(block, 8, 0).unwrap();
        assert!(area.is_placed("A"));

        let removed = area.remove_block("A").unwrap();
        assert!(!area.is_placed("A"));
        assert!(area.unplaced_blocks().contains("A"));
        assert!(removed.position.is_none());
        assert_eq!(area.placement_order(), &["A".to_string()]);

        // Re-placing does not duplicate the placement_order entry.
        area.place_block(removed, 8, 0).unwrap();
        assert_eq!(area.placement_order(), &["A".to_string()]);
    }

    #[test]
    fn remove_block_is_idempotent_for_absent_ids() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        assert!(area.remove_block("nope").is_none());
    }

    #[test]
    fn place_block_fails_fast_without_mutation() {
        let mut area = PlacementArea::new(10, 10, 0, 0, 0, 0);
        area.place_block(square("A"), 8, 0).unwrap();
        let overlapping = square("B");
        let err = area.place_block(overlapping, 8, 0);
        assert!(err.is_err());
        assert_eq!(area.placed_blocks().len(), 1);
    }
}
