//! Fatal, startup-time configuration failures only. Everything that is
//! expected control flow rather than an error (geometric infeasibility,
//! placer timeouts, cooldown violations) stays a plain `bool`/`Option`/
//! partial result elsewhere in the crate and never surfaces here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no vessel spec registered for vessel id {vessel_id}")]
    MissingVesselSpec { vessel_id: u32 },

    #[error("block {block_id} has a malformed label: {reason}")]
    MalformedBlockLabel { block_id: String, reason: String },

    #[error("block {block_id} has no known deadline")]
    MissingDeadline { block_id: String },

    #[error("could not parse deadline {raw:?} as an ISO date or YYMMDD shorthand")]
    InvalidDeadlineFormat { raw: String },

    #[error("voxel cache entry for block {block_id} has an empty footprint")]
    EmptyFootprint { block_id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
