//! Typed external data contracts (supplements §3/§6): the shapes a caller's
//! CSV/JSON/CAD parser must produce and a reporter must consume. Parsing the
//! raw bytes is the caller's job; this crate only defines and converts the
//! shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct VesselSpecInput {
    pub id: u32,
    pub name: String,
    pub width_m: f64,
    pub height_m: f64,
    pub voyage_cost: f64,
    pub cycle_phases: [u32; 4],
    pub bow_clearance: i64,
    pub stern_clearance: i64,
    pub block_spacing: i64,
    pub ring_bow_clearance: i64,
    pub width_grids: i64,
    pub height_grids: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockLabelInput {
    pub block_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub area: Option<f64>,
    pub compatible_vessels: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassificationInput {
    pub vip_blocks: Vec<String>,
}

/// `(x, y, (zmin, zmax))`; the z-range is carried through but never interpreted —
/// this crate only consumes the 2D projection.
#[derive(Debug, Clone, Deserialize)]
pub struct VoxelCacheEntry {
    pub block_id: String,
    pub block_type: String,
    pub resolution: f64,
    pub voxel_positions: Vec<(i64, i64, (i64, i64))>,
}

/// Either an ISO date (`"2024-06-15"`) or the `YYMMDD` shorthand (`"240615"`).
/// Conversion lives in [`crate::utils::parse_deadline`], not here.
#[derive(Debug, Clone, Deserialize)]
pub struct DeadlineInput {
    pub block_id: String,
    pub raw: String,
}

/// Optional warm-start input: seeds `last_end` so a fresh run respects a
/// schedule already in flight.
#[derive(Debug, Clone, Deserialize)]
pub struct VoyageScheduleRow {
    pub vessel_name: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedBlockReport {
    pub block_id: String,
    pub anchor: (i64, i64),
    pub rotation_degrees: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementResult {
    pub voyage_id: String,
    pub placed: Vec<PlacedBlockReport>,
    pub unplaced: Vec<String>,
    pub placement_rate: f64,
    pub cluster_efficiency: f64,
    pub dead_space_ratio: f64,
    pub space_saving_ratio: f64,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct VesselUsageSummary {
    pub vessel_name: String,
    pub voyages_used: usize,
    pub blocks_carried: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentResult {
    pub voyage_assignments: std::collections::HashMap<String, Vec<String>>,
    pub block_assignments: std::collections::HashMap<String, String>,
    pub unassigned_block_list: Vec<String>,
    pub usage_summary: Vec<VesselUsageSummary>,
    pub logs: Vec<String>,
    pub total_cost_krw: f64,
    pub elapsed_ms: u128,
}
