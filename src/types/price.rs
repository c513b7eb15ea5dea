use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// Observation where open/high/low/close are all the same price.
    pub fn flat(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }
}

/// Malformed series. Produced only by callers that built the points wrong.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("dates not strictly ascending at index {index} ({date})")]
    NotAscending { index: usize, date: NaiveDate },
}

/// Daily observations ordered ascending by date, no duplicate dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting unordered or duplicated dates.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].date <= pair[0].date)
        {
            return Err(SeriesError::NotAscending {
                index: index + 1,
                date: points[index + 1].date,
            });
        }
        Ok(Self { points })
    }

    /// Build a series from upstream rows in any order.
    ///
    /// Rows are sorted by date; when a date repeats, the row that came later
    /// in the input wins.
    pub fn from_unsorted(mut points: Vec<PricePoint>) -> Self {
        // Stable sort keeps input order within a date, so the last duplicate
        // is the one retained below.
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Index of the first observation inside the trailing `days` calendar
    /// days that end at the latest observation.
    pub fn window_start(&self, days: i64) -> usize {
        let Some(last) = self.points.last() else {
            return 0;
        };
        // A window reaching past the calendar covers the whole series.
        match chrono::Duration::try_days(days).and_then(|d| last.date.checked_sub_signed(d)) {
            Some(cutoff) => self.points.partition_point(|p| p.date <= cutoff),
            None => 0,
        }
    }

    /// Observations in the trailing `days` calendar days.
    pub fn window_days(&self, days: i64) -> &[PricePoint] {
        &self.points[self.window_start(days)..]
    }
}
