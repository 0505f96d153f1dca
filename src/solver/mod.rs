pub mod compactor;
pub mod placers;

pub use placers::{Placer, PlacerOutcome};
