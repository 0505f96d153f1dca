//! Deterministic synthetic data for unit and scenario tests (no network or
//! filesystem I/O), mirroring the host crate's fixtures module.

pub mod data_generator;

pub use data_generator::{generate_blocks, generate_fleet};
