//! Per-band statistics gathered through a read cursor

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::iterator::ReadCursor;

/// Basic statistics for one band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nan_count: usize,
}

/// Running per-band accumulator.
///
/// Feed it from any cursor, possibly one area at a time, then call
/// [`StatisticsAccumulator::finish`].
#[derive(Debug, Clone)]
pub struct StatisticsAccumulator {
    min: Vec<f64>,
    max: Vec<f64>,
    sum: Vec<f64>,
    valid: Vec<usize>,
    nan: Vec<usize>,
}

impl StatisticsAccumulator {
    pub fn new(bands: usize) -> Self {
        Self {
            min: vec![f64::INFINITY; bands],
            max: vec![f64::NEG_INFINITY; bands],
            sum: vec![0.0; bands],
            valid: vec![0; bands],
            nan: vec![0; bands],
        }
    }

    /// Record one sample; bands past the accumulator width are ignored
    pub fn push(&mut self, band: usize, value: f64) {
        if band >= self.sum.len() {
            return;
        }
        if value.is_nan() {
            self.nan[band] += 1;
            return;
        }
        self.min[band] = self.min[band].min(value);
        self.max[band] = self.max[band].max(value);
        self.sum[band] += value;
        self.valid[band] += 1;
    }

    /// Drain a cursor from its current position to the end
    pub fn consume<C: ReadCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<usize> {
        let mut count = 0;
        while cursor.next()? {
            self.push(cursor.band(), cursor.sample_f64()?);
            count += 1;
        }
        Ok(count)
    }

    pub fn finish(self) -> Vec<BandStatistics> {
        (0..self.sum.len())
            .map(|b| {
                let has_values = self.valid[b] > 0;
                BandStatistics {
                    min: has_values.then_some(self.min[b]),
                    max: has_values.then_some(self.max[b]),
                    mean: has_values.then(|| self.sum[b] / self.valid[b] as f64),
                    valid_count: self.valid[b],
                    nan_count: self.nan[b],
                }
            })
            .collect()
    }
}

/// Statistics of every band visited by `cursor`
pub fn band_statistics<C: ReadCursor + ?Sized>(cursor: &mut C) -> Result<Vec<BandStatistics>> {
    let mut acc = StatisticsAccumulator::new(cursor.num_bands());
    acc.consume(cursor)?;
    Ok(acc.finish())
}
