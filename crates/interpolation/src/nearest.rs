//! Nearest neighbour

/// Pixel closest to `v`, rounding halves away from zero, clamped to `[min, max]`
#[inline]
pub(crate) fn nearest_index(v: f64, min: i64, max: i64) -> i64 {
    (v.round() as i64).clamp(min, max)
}
