//! Lanczos windowed sinc

use std::f64::consts::PI;

/// `sinc(t) · sinc(t / a)` for `|t| < a`, zero outside
#[inline]
pub(crate) fn lanczos(t: f64, a: f64) -> f64 {
    if t == 0.0 {
        return 1.0;
    }
    if t.abs() >= a {
        return 0.0;
    }
    let pt = PI * t;
    a * pt.sin() * (pt / a).sin() / (pt * pt)
}

/// Fill `weights` for taps `floor(v) - a + 1 ..= floor(v) + a`, normalized to
/// sum to one; returns the first tap
pub(crate) fn weights(v: f64, window: usize, weights: &mut Vec<f64>) -> i64 {
    let a = window as i64;
    let base = v.floor();
    let t = v - base;

    weights.clear();
    if t == 0.0 {
        // Exactly on a pixel: a single unit tap at the center
        weights.extend((1 - a..=a).map(|i| if i == 0 { 1.0 } else { 0.0 }));
    } else {
        weights.extend((1 - a..=a).map(|i| lanczos(t - i as f64, a as f64)));
        let sum: f64 = weights.iter().sum();
        if sum != 0.0 {
            weights.iter_mut().for_each(|w| *w /= sum);
        }
    }
    base as i64 + 1 - a
}
