pub mod area;
pub mod block;
pub mod schedule_state;
pub mod types;
pub mod vessel;
pub mod voyage;

pub use area::{ClusterMetrics, PlacementArea};
pub use block::{BlockType, Rotation, VoxelBlock};
pub use schedule_state::{SchedulingState, UnassignedReason};
pub use types::Position;
pub use vessel::VesselSpec;
pub use voyage::{Voyage, VoyageId};
