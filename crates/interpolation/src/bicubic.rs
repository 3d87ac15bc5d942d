//! Keys cubic convolution

/// Keys kernel with coefficient `a` (−0.5 gives Catmull-Rom)
#[inline]
pub(crate) fn keys(t: f64, a: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((a * t - 5.0 * a) * t + 8.0 * a) * t - 4.0 * a
    } else {
        0.0
    }
}

/// Fill `weights` for taps `floor(v) - 1 ..= floor(v) + 2`; returns the first tap
#[inline]
pub(crate) fn weights(v: f64, a: f64, weights: &mut Vec<f64>) -> i64 {
    let base = v.floor();
    let t = v - base;
    weights.clear();
    weights.extend((-1..=2).map(|i| keys(t - i as f64, a)));
    base as i64 - 1
}
