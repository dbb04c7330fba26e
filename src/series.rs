//! Per-snapshot values attached to a single asset.
//!
//! Scenario edits never mutate a series in place. Each transformation returns a new [`TimeSeries`]
//! which replaces the old one on the owning component, so a copied network never observes edits
//! made to its parent.
use std::ops::{Index, Range};

/// A sequence of values, one per snapshot of the owning network
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries(Vec<f64>);

impl TimeSeries {
    /// Create a new series from the given values
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// A series with the same value at every snapshot
    pub fn constant(value: f64, len: usize) -> Self {
        Self(vec![value; len])
    }

    /// The number of values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series has no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying values
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Iterate over the values
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// The first value, if any
    pub fn first(&self) -> Option<f64> {
        self.0.first().copied()
    }

    /// Sum of all values
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Arithmetic mean of all values, or `None` for an empty series
    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.sum() / self.len() as f64)
    }

    /// Multiply the values at the given snapshot indices by `factor`, leaving the rest untouched.
    ///
    /// Indices beyond the end of the series are ignored.
    pub fn scaled_within(&self, range: Range<usize>, factor: f64) -> Self {
        let range = range.start.min(self.len())..range.end.min(self.len());
        let mut values = self.0.clone();
        for value in &mut values[range] {
            *value *= factor;
        }

        Self(values)
    }

    /// Divide every value by `divisor`
    pub fn divided_by(&self, divisor: f64) -> Self {
        self.0.iter().map(|value| value / divisor).collect()
    }

    /// Take the values at the given snapshot indices
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self(self.0[range].to_vec())
    }

    /// Overwrite the values starting at `offset` with `values`
    pub fn overwrite_from(&mut self, offset: usize, values: &[f64]) {
        self.0[offset..offset + values.len()].copy_from_slice(values);
    }
}

impl Index<usize> for TimeSeries {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl FromIterator<f64> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<f64>> for TimeSeries {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Store `values` at the snapshots starting from `offset` of a result series.
///
/// The series is created (filled with zeros) if it doesn't exist yet, so that results of a
/// solve over part of the horizon can be collected into a series covering all snapshots.
pub fn write_result(series: &mut Option<TimeSeries>, len: usize, offset: usize, values: &[f64]) {
    let series = series.get_or_insert_with(|| TimeSeries::constant(0.0, len));
    series.overwrite_from(offset, values);
}
