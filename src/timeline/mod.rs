//! Byte offset to wall-clock time mapping
//!
//! The capture file carries no timestamps. The size/time log records, about
//! once a second, how many bytes the capture file had reached. A [`Timeline`]
//! resamples that log onto a one second grid and answers "when was byte N
//! written" by picking the grid second whose size is closest to N.

pub mod log;

pub use log::{parse_log, read_log, LogError, LogSample, DEFAULT_SKIP_ROWS};

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("no capture file given and the log refers to {0} capture files")]
    AmbiguousSource(usize),
    #[error("no size/time log rows for {0}")]
    EmptySeries(String),
    #[error("capture file {0} is not covered by this timeline")]
    UnknownSourceFile(String),
    #[error("capture size drops from {previous} to {size} bytes at {at}")]
    SizeRegression {
        at: DateTime<Utc>,
        previous: u64,
        size: u64,
    },
}

/// One second resampled size/time series of a single capture file
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Grid timestamps, one second apart, starting at the first observation
    times: Vec<DateTime<Utc>>,
    /// Interpolated cumulative size at each grid timestamp (non-decreasing)
    sizes: Vec<f64>,
    /// File identifier of the series; every grid point carries it forward
    /// from the observation before it
    file: String,
    /// Distinct identifiers of the rows the timeline was built from
    log_files: Vec<String>,
}

impl Timeline {
    /// Build a timeline from log rows.
    ///
    /// With `file` set, only rows for that capture file are used. Without it,
    /// the log must name a single capture file.
    pub fn build(rows: &[LogSample], file: Option<&str>) -> Result<Self, TimelineError> {
        let log_files = list_sources(rows);

        let file = match file {
            Some(name) => base_name(name).to_string(),
            None => match log_files.as_slice() {
                [] => return Err(TimelineError::EmptySeries("any capture file".to_string())),
                [only] => only.clone(),
                many => return Err(TimelineError::AmbiguousSource(many.len())),
            },
        };

        let mut observed: Vec<(DateTime<Utc>, u64)> = rows
            .iter()
            .filter(|row| row.file == file)
            .map(|row| (row.time, row.size))
            .collect();
        if observed.is_empty() {
            return Err(TimelineError::EmptySeries(file));
        }

        // stable sort keeps file order among equal timestamps; the last one wins
        observed.sort_by_key(|(time, _)| *time);
        let mut points: Vec<(DateTime<Utc>, u64)> = Vec::with_capacity(observed.len());
        for (time, size) in observed {
            match points.last_mut() {
                Some(last) if last.0 == time => last.1 = size,
                _ => points.push((time, size)),
            }
        }

        for pair in points.windows(2) {
            if pair[1].1 < pair[0].1 {
                return Err(TimelineError::SizeRegression {
                    at: pair[1].0,
                    previous: pair[0].1,
                    size: pair[1].1,
                });
            }
        }

        let (times, sizes) = resample(&points);
        debug!(
            "Timeline for {}: {} observations, {} grid points",
            file,
            points.len(),
            times.len()
        );

        Ok(Self {
            times,
            sizes,
            file,
            log_files,
        })
    }

    /// Grid timestamp whose size is closest to `offset`, earliest on ties.
    ///
    /// With `file` set, the query fails unless this timeline covers that
    /// capture file.
    pub fn time_at_offset(&self, offset: u64, file: Option<&str>) -> Result<DateTime<Utc>, TimelineError> {
        if let Some(name) = file {
            let name = base_name(name);
            if name != self.file {
                return Err(TimelineError::UnknownSourceFile(name.to_string()));
            }
        }

        let target = offset as f64;
        let above = self.sizes.partition_point(|&size| size < target);

        let nearest = if above == 0 {
            0
        } else if above == self.sizes.len() {
            above - 1
        } else {
            let below = above - 1;
            if target - self.sizes[below] <= self.sizes[above] - target {
                below
            } else {
                above
            }
        };

        // first grid point of a flat run holds the earliest time for that size
        let nearest_size = self.sizes[nearest];
        let earliest = self.sizes.partition_point(|&size| size < nearest_size);
        Ok(self.times[earliest])
    }

    /// Whether the rows this timeline was built from mention `file`
    pub fn includes(&self, file: &str) -> bool {
        let name = base_name(file);
        self.log_files.iter().any(|f| f == name)
    }

    /// Capture file this timeline describes
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.times[0]
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.times[self.times.len() - 1]
    }

    /// Date of the first grid entry
    pub fn date(&self) -> NaiveDate {
        self.start().date_naive()
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Grid as `(time, size)` pairs
    pub fn points(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.times.iter().copied().zip(self.sizes.iter().copied())
    }
}

/// Distinct capture file names of the log, in order of first appearance
pub fn list_sources(rows: &[LogSample]) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(row.file.as_str()))
        .map(|row| row.file.clone())
        .collect()
}

/// Resample sorted, de-duplicated observations onto a one second grid.
///
/// The grid starts at the first observation and stops at or before the last,
/// so every grid point lies between two observations and is linearly
/// interpolated in time between them.
fn resample(points: &[(DateTime<Utc>, u64)]) -> (Vec<DateTime<Utc>>, Vec<f64>) {
    let start = points[0].0;
    let end = points[points.len() - 1].0;
    let steps = (end - start).num_seconds();

    let mut times = Vec::with_capacity(steps as usize + 1);
    let mut sizes = Vec::with_capacity(steps as usize + 1);

    // index of the first observation at or after the current grid time
    let mut upper = 0;
    for step in 0..=steps {
        let time = start + Duration::seconds(step);
        while points[upper].0 < time {
            upper += 1;
        }

        let (t1, s1) = points[upper];
        let size = if t1 == time {
            s1 as f64
        } else {
            let (t0, s0) = points[upper - 1];
            let fraction = seconds(time - t0) / seconds(t1 - t0);
            s0 as f64 + (s1 as f64 - s0 as f64) * fraction
        };

        times.push(time);
        sizes.push(size);
    }

    (times, sizes)
}

fn seconds(delta: Duration) -> f64 {
    delta
        .num_microseconds()
        .map(|us| us as f64 / 1e6)
        .unwrap_or_else(|| delta.num_seconds() as f64)
}

/// Log rows name capture files without directories
fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 17, 10, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn row(secs: i64, size: u64, file: &str) -> LogSample {
        LogSample::new(at(secs), size, file)
    }

    fn assert_sizes(timeline: &Timeline, expected: &[f64]) {
        let sizes: Vec<f64> = timeline.points().map(|(_, size)| size).collect();
        assert_eq!(sizes.len(), expected.len());
        for (got, want) in sizes.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{:?} != {:?}", sizes, expected);
        }
    }

    #[test]
    fn test_midpoint_lookup() {
        let timeline = Timeline::build(&[row(0, 0, "a"), row(10, 100, "a")], None).unwrap();
        assert_eq!(timeline.len(), 11);
        assert_eq!(timeline.time_at_offset(50, Some("a")).unwrap(), at(5));
        assert_eq!(timeline.time_at_offset(50, None).unwrap(), at(5));
    }

    #[test]
    fn test_lookup_outside_range_clamps() {
        let timeline = Timeline::build(&[row(0, 100, "a"), row(10, 200, "a")], None).unwrap();
        assert_eq!(timeline.time_at_offset(0, None).unwrap(), at(0));
        assert_eq!(timeline.time_at_offset(10_000, None).unwrap(), at(10));
    }

    #[test]
    fn test_tie_resolves_to_earliest() {
        // grid sizes 0, 10, 20: offset 15 is equidistant from 10 and 20
        let timeline = Timeline::build(&[row(0, 0, "a"), row(2, 20, "a")], None).unwrap();
        assert_eq!(timeline.time_at_offset(15, None).unwrap(), at(1));
    }

    #[test]
    fn test_flat_run_resolves_to_earliest() {
        // capture stalled between t=2 and t=6
        let rows = [row(0, 0, "a"), row(2, 200, "a"), row(6, 200, "a"), row(7, 300, "a")];
        let timeline = Timeline::build(&rows, None).unwrap();
        assert_eq!(timeline.time_at_offset(200, None).unwrap(), at(2));
        assert_eq!(timeline.time_at_offset(210, None).unwrap(), at(2));
        assert_eq!(timeline.time_at_offset(260, None).unwrap(), at(7));
    }

    #[test]
    fn test_ambiguous_source() {
        let rows = [row(0, 0, "a"), row(1, 0, "b")];
        assert_eq!(Timeline::build(&rows, None).unwrap_err(), TimelineError::AmbiguousSource(2));
    }

    #[test]
    fn test_filter_by_source() {
        let rows = [row(0, 0, "a"), row(0, 1000, "b"), row(10, 100, "a"), row(10, 2000, "b")];
        let timeline = Timeline::build(&rows, Some("b")).unwrap();
        assert_eq!(timeline.file(), "b");
        assert_eq!(timeline.time_at_offset(1500, Some("b")).unwrap(), at(5));
        assert!(timeline.includes("a"));
        assert!(timeline.includes("/mnt/capture/b"));
        assert!(!timeline.includes("c"));
    }

    #[test]
    fn test_filter_by_path_uses_base_name() {
        let rows = [row(0, 0, "c1234.tmp"), row(4, 40, "c1234.tmp")];
        let timeline = Timeline::build(&rows, Some("/data/c1234.tmp")).unwrap();
        assert_eq!(timeline.time_at_offset(20, Some("/other/dir/c1234.tmp")).unwrap(), at(2));
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(
            Timeline::build(&[], None).unwrap_err(),
            TimelineError::EmptySeries("any capture file".to_string())
        );
        assert_eq!(
            Timeline::build(&[row(0, 0, "a")], Some("b")).unwrap_err(),
            TimelineError::EmptySeries("b".to_string())
        );
    }

    #[test]
    fn test_unknown_source_query() {
        let timeline = Timeline::build(&[row(0, 0, "a")], None).unwrap();
        assert_eq!(
            timeline.time_at_offset(0, Some("b")).unwrap_err(),
            TimelineError::UnknownSourceFile("b".to_string())
        );
    }

    #[test]
    fn test_single_row() {
        let timeline = Timeline::build(&[row(3, 500, "a")], None).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.time_at_offset(0, None).unwrap(), at(3));
        assert_eq!(timeline.date(), t0().date_naive());
    }

    #[test]
    fn test_unsorted_rows_are_sorted() {
        let rows = [row(10, 100, "a"), row(0, 0, "a")];
        let timeline = Timeline::build(&rows, None).unwrap();
        assert_eq!(timeline.start(), at(0));
        assert_eq!(timeline.end(), at(10));
        assert_eq!(timeline.time_at_offset(30, None).unwrap(), at(3));
    }

    #[test]
    fn test_duplicate_timestamps_keep_last() {
        let rows = [row(0, 0, "a"), row(4, 10, "a"), row(4, 40, "a")];
        let timeline = Timeline::build(&rows, None).unwrap();
        let sizes: Vec<f64> = timeline.points().map(|(_, size)| size).collect();
        assert_eq!(sizes, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_size_regression() {
        let rows = [row(0, 100, "a"), row(1, 50, "a")];
        assert_eq!(
            Timeline::build(&rows, None).unwrap_err(),
            TimelineError::SizeRegression {
                at: at(1),
                previous: 100,
                size: 50
            }
        );
    }

    #[test]
    fn test_off_grid_observations_are_interpolated() {
        // observations at 0s, 1.5s and 3s; grid at 0, 1, 2, 3
        let rows = [
            row(0, 0, "a"),
            LogSample::new(at(1) + Duration::milliseconds(500), 300, "a"),
            row(3, 600, "a"),
        ];
        let timeline = Timeline::build(&rows, None).unwrap();
        assert_sizes(&timeline, &[0.0, 200.0, 400.0, 600.0]);
    }

    #[test]
    fn test_grid_stops_before_fractional_end() {
        let rows = [row(0, 0, "a"), LogSample::new(at(2) + Duration::milliseconds(500), 250, "a")];
        let timeline = Timeline::build(&rows, None).unwrap();
        assert_eq!(timeline.end(), at(2));
        assert_sizes(&timeline, &[0.0, 100.0, 200.0]);
    }

    #[test]
    fn test_list_sources_in_first_appearance_order() {
        let rows = [row(0, 0, "b"), row(0, 0, "a"), row(1, 0, "b"), row(2, 0, "c")];
        assert_eq!(list_sources(&rows), vec!["b", "a", "c"]);
        assert!(list_sources(&[]).is_empty());
    }
}
