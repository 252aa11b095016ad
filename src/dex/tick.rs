//! Tick alignment to a pool's spacing.

use crate::errors::RebalanceError;
use uniswap_v3_math::tick_math::MAX_TICK;

/// Result of aligning a raw tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedTick {
    /// Multiple of the spacing inside `[MIN_TICK, MAX_TICK]`.
    pub tick: i32,
    /// Rounding landed outside the tick range and the result was pulled back
    /// to the nearest valid boundary. Advisory only.
    pub clamped: bool,
}

/// `round(raw_tick / spacing) * spacing`, ties away from zero.
pub fn align_tick(raw_tick: i32, spacing: i32) -> Result<AlignedTick, RebalanceError> {
    if spacing <= 0 {
        return Err(RebalanceError::InvalidSpacing { spacing });
    }

    let spacing = i64::from(spacing);
    let magnitude = i64::from(raw_tick).abs();
    // floor(|t| / s + 1/2) rounds half up on the magnitude
    let quotient = (2 * magnitude + spacing) / (2 * spacing);
    let rounded = quotient * spacing * i64::from(raw_tick).signum();

    let upper = (i64::from(MAX_TICK) / spacing) * spacing;
    let lower = -upper;
    let tick = rounded.clamp(lower, upper);

    Ok(AlignedTick {
        // within ±MAX_TICK after the clamp
        tick: tick as i32,
        clamped: tick != rounded,
    })
}
