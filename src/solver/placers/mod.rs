//! Placer capability (C4/C5/C6). Dynamic dispatch in the source maps to a
//! variant enum; the rotation-optimized variant composes the greedy variant by
//! delegation rather than inheritance.

pub mod brd;
pub mod greedy;
pub mod rotation;

use std::time::Duration;

use crate::domain::{PlacementArea, VoxelBlock};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlacerOutcome {
    pub elapsed: Duration,
    pub timed_out: bool,
    pub rotation_attempts: u32,
    pub rotation_improvements: u32,
}

impl PlacerOutcome {
    pub fn improvement_rate(&self) -> f64 {
        if self.rotation_attempts == 0 {
            0.0
        } else {
            self.rotation_improvements as f64 / self.rotation_attempts as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placer {
    Brd,
    GreedyCompact,
    RotationOptimized,
}

impl Placer {
    /// Places as many `blocks` as possible into `area` within `budget`.
    /// Returns the blocks that did not fit and bookkeeping about the run.
    pub fn place(
        &self,
        area: &mut PlacementArea,
        blocks: Vec<VoxelBlock>,
        budget: Duration,
    ) -> (Vec<VoxelBlock>, PlacerOutcome) {
        match self {
            Placer::Brd => brd::place(area, blocks, budget),
            Placer::GreedyCompact => greedy::place(area, blocks, budget),
            Placer::RotationOptimized => rotation::place(area, blocks, budget),
        }
    }
}
