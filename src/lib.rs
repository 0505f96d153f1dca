//! Fleet scheduling and 2D deck-packing for ship-block transport: a 2D block
//! placement engine (L1), a per-voyage loader (L2), and a fleet scheduler
//! (L3) that synthesizes voyages over a horizon.

pub mod config;
pub mod domain;
pub mod error;
pub mod fixtures;
pub mod io;
pub mod loader;
pub mod scheduler;
pub mod setup;
pub mod solver;
pub mod utils;

pub use domain::{PlacementArea, VesselSpec, Voyage, VoxelBlock};
pub use error::{Result, SchedulerError};
pub use loader::{LoadPath, LoadReport, Loader};
pub use scheduler::{ScheduleReport, Scheduler};
pub use solver::Placer;
