//! Policy scalars and tunables, centralized the way the rest of the crate
//! expects to find them rather than sprinkled as magic numbers.

pub mod constant {
    /// Loading window length in days: `[deadline - WINDOW_DAYS, deadline - 1]`.
    pub const WINDOW_DAYS: i64 = 14;

    /// Area slack applied to a vessel's deck area when capping a candidate pool.
    pub const TARGET_AREA_SLACK: f64 = 1.05;

    /// Scarcity weight assumed when a block's compatible-vessel count is unknown.
    pub const UNKNOWN_COMPAT_SCARCITY_DIVISOR: f64 = 5.0;

    /// Multiplier applied to a VIP block's weight when scoring candidate dates for vessel 1.
    pub const VIP_SCORE_BONUS: f64 = 1.6;

    /// Wall-clock budget for a combined (VIP + normal) placement call.
    pub const TIMEOUT_STANDARD: std::time::Duration = std::time::Duration::from_secs(60);

    /// Wall-clock budget for a single-window call: a combined call with a non-empty
    /// VIP seed, or any VIP-only fallback call.
    pub const TIMEOUT_SINGLE_WINDOW: std::time::Duration = std::time::Duration::from_secs(180);

    /// Top-K candidate dates kept from the per-vessel window histogram.
    pub const CANDIDATE_DATE_TOP_K: usize = 30;

    /// Step, in days, of the uniform candidate-date grid fallback.
    pub const CANDIDATE_DATE_GRID_STEP: i64 = 3;

    /// Scheduling rounds before the scheduler stops looking for more voyages.
    pub const MAX_ROUNDS: u32 = 3;

    /// Number of rescue-pass offsets probed per block, per compatible vessel.
    pub const RESCUE_OFFSET_COUNT: usize = 5;

    /// Fixed precision (fractional digits) used when summing areas, so capping
    /// decisions are deterministic across platforms.
    pub const AREA_ROUNDING_DIGITS: i32 = 6;

    /// Number of top candidates the rotation optimizer simulates per trestle block.
    pub const ROTATION_TOP_N_CANDIDATES: usize = 3;

    /// Fraction of per-row leftmost boundary values discarded (as outliers, from the
    /// rightmost end) before averaging for the cluster's left boundary.
    pub const CLUSTER_LEFT_TRIM_FRACTION: f64 = 0.2;
}

/// Per-vessel page limit (max candidate block count) used by the loader's area-bounded
/// capping. Vessel 1 is the flagship with the deepest queue; vessels 2-5 share smaller caps.
pub fn page_limit(vessel_id: u32) -> usize {
    match vessel_id {
        1 => 80,
        2 | 4 => 44,
        3 | 5 => 40,
        _ => 40,
    }
}

/// Rescue-pass candidate offsets (days) from the earliest allowed end date, tried in order
/// until one of them yields a placement.
pub fn rescue_offsets(cycle_len: i64) -> [i64; 7] {
    [0, 2, 4, 7, 10, cycle_len, cycle_len + 3]
}

/// Rounds an area sum to [`constant::AREA_ROUNDING_DIGITS`] fractional digits so that
/// capping decisions do not depend on floating-point summation order.
pub fn round_area(value: f64) -> f64 {
    let factor = 10f64.powi(constant::AREA_ROUNDING_DIGITS);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_limits_match_vessel_tiers() {
        assert_eq!(page_limit(1), 80);
        assert_eq!(page_limit(2), 44);
        assert_eq!(page_limit(4), 44);
        assert_eq!(page_limit(3), 40);
        assert_eq!(page_limit(5), 40);
    }

    #[test]
    fn round_area_is_stable_across_summation_order() {
        let a = round_area(0.1 + 0.2);
        let b = round_area(0.3);
        assert_eq!(a, b);
    }
}
