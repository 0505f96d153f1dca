//! Fallible conversion from the typed external contracts (`crate::io`) into the
//! internal domain model. Pure and independent of how the bytes reached the
//! caller — no file I/O lives here.

use std::collections::{HashMap, HashSet};

use tracing::{error, info, warn};

use crate::domain::{BlockType, SchedulingState, VesselSpec, VoxelBlock};
use crate::domain::schedule_state::BlockMeta;
use crate::error::{Result, SchedulerError};
use crate::io::{
    BlockLabelInput, ClassificationInput, DeadlineInput, VesselSpecInput, VoxelCacheEntry,
    VoyageScheduleRow,
};
use crate::utils::parse_deadline;

/// Builds the vessel registry, failing if vessel 1 (the flagship every VIP
/// block depends on) is absent.
pub fn build_vessel_specs(inputs: Vec<VesselSpecInput>) -> Result<HashMap<u32, VesselSpec>> {
    info!("building vessel registry from {} inputs", inputs.len());
    let mut specs = HashMap::new();
    for input in inputs {
        let [p1, p2, p3, p4] = input.cycle_phases;
        specs.insert(
            input.id,
            VesselSpec {
                id: input.id,
                name: input.name,
                width_m: input.width_m,
                height_m: input.height_m,
                voyage_cost: input.voyage_cost,
                cycle_phases: (p1 as i64, p2 as i64, p3 as i64, p4 as i64),
                bow_clearance: input.bow_clearance,
                stern_clearance: input.stern_clearance,
                block_spacing: input.block_spacing,
                ring_bow_clearance: input.ring_bow_clearance,
                width_grids: input.width_grids,
                height_grids: input.height_grids,
            },
        );
    }
    if !specs.contains_key(&1) {
        error!("vessel registry is missing vessel 1");
        return Err(SchedulerError::MissingVesselSpec { vessel_id: 1 });
    }
    Ok(specs)
}

fn parse_block_type(raw: &str) -> BlockType {
    match raw.to_ascii_lowercase().as_str() {
        "crane" => BlockType::Crane,
        "trestle" => BlockType::Trestle,
        "height_aware" | "height-aware" => BlockType::HeightAware,
        _ => BlockType::Unknown,
    }
}

/// Builds voxel blocks from the cache, projecting voxel columns onto distinct
/// `(x, y)` cells and anchoring each block at its first listed cell.
pub fn build_voxel_blocks(entries: Vec<VoxelCacheEntry>) -> Result<HashMap<String, VoxelBlock>> {
    let mut blocks = HashMap::new();
    for entry in entries {
        if entry.voxel_positions.is_empty() {
            return Err(SchedulerError::EmptyFootprint {
                block_id: entry.block_id,
            });
        }
        let mut footprint: Vec<(i64, i64)> = Vec::new();
        let mut seen = HashSet::new();
        for &(x, y, _z_range) in &entry.voxel_positions {
            if seen.insert((x, y)) {
                footprint.push((x, y));
            }
        }
        let reference = footprint[0];
        let block_type = parse_block_type(&entry.block_type);
        let block = VoxelBlock::new(entry.block_id.clone(), footprint, reference, block_type);
        blocks.insert(entry.block_id, block);
    }
    Ok(blocks)
}

/// Builds the scheduling state: deadlines, VIP/normal classification and
/// per-block metadata. VIP blocks with no parseable deadline are a fatal
/// configuration error — a VIP block can only ever sail on vessel 1, so one
/// that can never be windowed is a data defect, not an ordinary scheduling
/// dead end. Non-VIP blocks without a deadline degrade gracefully to
/// `UnassignedReason::NoDeadline` at scheduling time.
pub fn build_scheduling_state(
    labels: Vec<BlockLabelInput>,
    classification: ClassificationInput,
    deadlines: Vec<DeadlineInput>,
) -> Result<SchedulingState> {
    let vip_ids: HashSet<String> = classification.vip_blocks.into_iter().collect();

    let mut parsed_deadlines: HashMap<String, chrono::NaiveDate> = HashMap::new();
    for entry in deadlines {
        let date = parse_deadline(&entry.raw).ok_or_else(|| SchedulerError::InvalidDeadlineFormat {
            raw: entry.raw.clone(),
        })?;
        parsed_deadlines.insert(entry.block_id, date);
    }

    let mut state = SchedulingState::new();
    for label in labels {
        if label.block_id.trim().is_empty() {
            return Err(SchedulerError::MalformedBlockLabel {
                block_id: label.block_id,
                reason: "block_id is empty".to_string(),
            });
        }
        if let Some(area) = label.area {
            if area <= 0.0 {
                return Err(SchedulerError::MalformedBlockLabel {
                    block_id: label.block_id,
                    reason: format!("non-positive area {area}"),
                });
            }
        }

        let is_vip = vip_ids.contains(&label.block_id);
        let compatible_vessels = if is_vip {
            Some(HashSet::from([1]))
        } else {
            label.compatible_vessels.map(|v| v.into_iter().collect())
        };
        let meta = BlockMeta {
            area: label.area,
            compatible_vessels,
        };

        let deadline = parsed_deadlines.get(&label.block_id).copied();
        if deadline.is_none() && is_vip {
            return Err(SchedulerError::MissingDeadline {
                block_id: label.block_id,
            });
        }
        if deadline.is_none() {
            warn!(block_id = %label.block_id, "block has no known deadline; will report as unassigned");
        }

        state.register_block(label.block_id, meta, deadline);
    }

    Ok(state)
}

/// Warm-starts `state.last_end` from a schedule already in flight, so a fresh
/// run respects cooldowns from voyages it never itself committed. Rows are
/// applied in order; a vessel seen more than once keeps its latest `end_date`.
pub fn seed_voyage_schedule(state: &mut SchedulingState, rows: Vec<VoyageScheduleRow>) -> Result<()> {
    for row in rows {
        let end_date = parse_deadline(&row.end_date).ok_or_else(|| SchedulerError::InvalidDeadlineFormat {
            raw: row.end_date.clone(),
        })?;
        let should_advance = match state.last_end.get(&row.vessel_name) {
            Some(&existing) => end_date > existing,
            None => true,
        };
        if should_advance {
            state.advance_cooldown(&row.vessel_name, end_date);
        }
    }
    Ok(())
}
