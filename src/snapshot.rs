//! The time dimension of a network: snapshots and their weightings.
use anyhow::{Result, ensure};
use chrono::{NaiveDateTime, TimeDelta};
use std::ops::Range;

/// Timestamp format used when reading and writing snapshots
pub const SNAPSHOT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alternative (ISO 8601) timestamp format accepted when reading snapshots
const SNAPSHOT_FORMAT_ISO: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a snapshot timestamp in either of the supported formats
pub fn parse_snapshot(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, SNAPSHOT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, SNAPSHOT_FORMAT_ISO))
        .map_err(|_| anyhow::anyhow!("Invalid snapshot timestamp: {s}"))
}

/// Weightings applied to a snapshot, in hours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotWeighting {
    /// Weighting of operational costs in the objective
    pub objective: f64,
    /// Weighting of storage energy balances
    pub stores: f64,
    /// Weighting of generated energy (e.g. for emission or equity constraints)
    pub generators: f64,
}

impl Default for SnapshotWeighting {
    fn default() -> Self {
        Self {
            objective: 1.0,
            stores: 1.0,
            generators: 1.0,
        }
    }
}

/// The ordered snapshots of a network
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshots {
    timestamps: Vec<NaiveDateTime>,
    weightings: Vec<SnapshotWeighting>,
}

impl Snapshots {
    /// Create a new set of snapshots.
    ///
    /// Timestamps must be strictly increasing and there must be one weighting per timestamp.
    pub fn new(timestamps: Vec<NaiveDateTime>, weightings: Vec<SnapshotWeighting>) -> Result<Self> {
        ensure!(
            timestamps.len() == weightings.len(),
            "Got {} snapshots but {} weightings",
            timestamps.len(),
            weightings.len()
        );
        ensure!(
            timestamps.windows(2).all(|pair| pair[0] < pair[1]),
            "Snapshots must be strictly increasing"
        );

        Ok(Self {
            timestamps,
            weightings,
        })
    }

    /// Snapshots with the default weighting of one hour each
    pub fn with_unit_weightings(timestamps: Vec<NaiveDateTime>) -> Result<Self> {
        let weightings = vec![SnapshotWeighting::default(); timestamps.len()];
        Self::new(timestamps, weightings)
    }

    /// The number of snapshots
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether there are no snapshots
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The snapshot timestamps
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// The weighting of each snapshot
    pub fn weightings(&self) -> &[SnapshotWeighting] {
        &self.weightings
    }

    /// Iterate over timestamps along with their weightings
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDateTime, &SnapshotWeighting)> {
        self.timestamps.iter().zip(self.weightings.iter())
    }

    /// The duration between the first two snapshots, if there are at least two
    pub fn timestep(&self) -> Option<TimeDelta> {
        match self.timestamps.as_slice() {
            [first, second, ..] => Some(*second - *first),
            _ => None,
        }
    }

    /// The number of snapshots spanning the given number of days, rounded to the nearest integer.
    ///
    /// The timestep is assumed to be uniform and is taken from the first two snapshots.
    pub fn steps_for_days(&self, days: u32) -> Option<usize> {
        let timestep_days = self.timestep()?.num_seconds() as f64 / 86_400.0;
        Some((f64::from(days) / timestep_days).round() as usize)
    }

    /// The indices of snapshots falling within the window (inclusive at both ends)
    pub fn window_range(&self, window: &SnapshotWindow) -> Range<usize> {
        let start = self.timestamps.partition_point(|t| *t < window.start);
        let end = self.timestamps.partition_point(|t| *t <= window.end);
        start..end.max(start)
    }

    /// The snapshots at the given indices
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            timestamps: self.timestamps[range.clone()].to_vec(),
            weightings: self.weightings[range].to_vec(),
        }
    }
}

/// A contiguous period of time, inclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotWindow {
    /// The first instant covered by the window
    pub start: NaiveDateTime,
    /// The last instant covered by the window
    pub end: NaiveDateTime,
}

impl SnapshotWindow {
    /// The window starting at `start` and ending a whole number of days later
    pub fn from_start_and_days(start: NaiveDateTime, days: u32) -> Self {
        Self {
            start,
            end: start + TimeDelta::days(i64::from(days)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, daily_snapshots};
    use rstest::rstest;

    #[rstest]
    fn test_timestep(#[from(daily_snapshots)] snapshots: Snapshots) {
        assert_eq!(snapshots.timestep(), Some(TimeDelta::days(1)));
    }

    #[test]
    fn test_timestep_single_snapshot() {
        let snapshots =
            Snapshots::with_unit_weightings(vec![parse_snapshot("2013-01-01 00:00:00").unwrap()])
                .unwrap();
        assert_eq!(snapshots.timestep(), None);
        assert_eq!(snapshots.steps_for_days(7), None);
    }

    #[rstest]
    #[case(7, 7)]
    #[case(0, 0)]
    #[case(30, 30)]
    fn test_steps_for_days(
        #[from(daily_snapshots)] snapshots: Snapshots,
        #[case] days: u32,
        #[case] expected: usize,
    ) {
        assert_eq!(snapshots.steps_for_days(days), Some(expected));
    }

    #[test]
    fn test_steps_for_days_hourly() {
        let start = parse_snapshot("2013-01-01 00:00:00").unwrap();
        let timestamps = (0..48).map(|h| start + TimeDelta::hours(h)).collect();
        let snapshots = Snapshots::with_unit_weightings(timestamps).unwrap();
        assert_eq!(snapshots.steps_for_days(1), Some(24));
    }

    #[rstest]
    fn test_window_range_inclusive(#[from(daily_snapshots)] snapshots: Snapshots) {
        let start = snapshots.timestamps()[3];
        let window = SnapshotWindow::from_start_and_days(start, 7);

        // Seven days after day 3 is day 10, which is also included
        assert_eq!(snapshots.window_range(&window), 3..11);
    }

    #[rstest]
    fn test_window_range_past_end(#[from(daily_snapshots)] snapshots: Snapshots) {
        let start = snapshots.timestamps()[25];
        let window = SnapshotWindow::from_start_and_days(start, 7);
        assert_eq!(snapshots.window_range(&window), 25..snapshots.len());
    }

    #[test]
    fn test_new_not_increasing() {
        let t = parse_snapshot("2013-01-01 00:00:00").unwrap();
        assert_error!(
            Snapshots::with_unit_weightings(vec![t, t]),
            "Snapshots must be strictly increasing"
        );
    }

    #[rstest]
    #[case("2013-01-01 06:00:00")]
    #[case("2013-01-01T06:00:00")]
    fn test_parse_snapshot(#[case] s: &str) {
        let expected =
            NaiveDateTime::parse_from_str("2013-01-01 06:00:00", SNAPSHOT_FORMAT).unwrap();
        assert_eq!(parse_snapshot(s).unwrap(), expected);
    }
}
