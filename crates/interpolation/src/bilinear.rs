//! Bilinear weights

/// Fill `weights` for taps `floor(v)` and `floor(v) + 1`; returns the first tap
#[inline]
pub(crate) fn weights(v: f64, weights: &mut Vec<f64>) -> i64 {
    let base = v.floor();
    let t = v - base;
    weights.clear();
    weights.extend_from_slice(&[1.0 - t, t]);
    base as i64
}
