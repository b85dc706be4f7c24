//! Time-ordered history series handed to charting consumers.

use chrono::{Duration, NaiveTime};
use thiserror::Error;

use crate::telemetry::HistoryPoint;

/// Number of entries shown in the short-range view
pub const RECENT_WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history point {index} is out of time order")]
    OutOfOrder { index: usize },
}

/// Ordered, time-ascending series as returned by the server.
///
/// The series is never extended locally; each successful poll replaces it.
/// Times are times of day, so a single step backwards of more than twelve
/// hours is read as the series crossing midnight. After that crossing no
/// point may reach the time the series started at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySeriesBuffer {
    points: Vec<HistoryPoint>,
}

impl HistorySeriesBuffer {
    pub fn try_from_points(points: Vec<HistoryPoint>) -> Result<Self, HistoryError> {
        check_order(&points)?;
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.last()
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryPoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    pub fn csi_series(&self) -> Vec<(NaiveTime, f64)> {
        self.series(|p| p.csi)
    }

    pub fn temperature_series(&self) -> Vec<(NaiveTime, f64)> {
        self.series(|p| p.temperature)
    }

    pub fn humidity_series(&self) -> Vec<(NaiveTime, f64)> {
        self.series(|p| p.humidity)
    }

    fn series(&self, value: impl Fn(&HistoryPoint) -> f64) -> Vec<(NaiveTime, f64)> {
        self.points.iter().map(|p| (p.time, value(p))).collect()
    }
}

impl<'a> IntoIterator for &'a HistorySeriesBuffer {
    type Item = &'a HistoryPoint;
    type IntoIter = std::slice::Iter<'a, HistoryPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

fn check_order(points: &[HistoryPoint]) -> Result<(), HistoryError> {
    let Some(first) = points.first().map(|p| p.time) else {
        return Ok(());
    };
    let mut crossed_midnight = false;

    for (i, pair) in points.windows(2).enumerate() {
        let (prev, next) = (pair[0].time, pair[1].time);
        if next < prev {
            if crossed_midnight || prev.signed_duration_since(next) <= Duration::hours(12) {
                return Err(HistoryError::OutOfOrder { index: i + 1 });
            }
            crossed_midnight = true;
        }
        // After the wrap the series must stay before where it started
        if crossed_midnight && next >= first {
            return Err(HistoryError::OutOfOrder { index: i + 1 });
        }
    }

    Ok(())
}
