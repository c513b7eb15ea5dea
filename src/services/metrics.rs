//! Metrics engine.
//!
//! Turns a daily price series into SMA-50, SMA-200, a deviation statistic
//! and a trading signal, and prepares the windowed chart overlays. Pure: no
//! I/O, and the only ambient input is the wall clock for `computed_at`.
//!
//! Standard deviation is the sample statistic (n - 1 denominator) over the
//! last 50 closes.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::types::{
    CandlePoint, ChartSeries, MetricsRecord, OverlayPoint, PriceSeries, Signal, StdBands,
};

/// Short moving-average period; also the deviation window.
pub const SMA_SHORT: usize = 50;
/// Long moving-average period.
pub const SMA_LONG: usize = 200;

/// Mean of the last `period` values, or `None` if fewer exist.
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    Some(closes.iter().rev().take(period).sum::<f64>() / period as f64)
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Standard deviations between the latest close and `sma_50`.
///
/// Absent when SMA-50 is absent or the last 50 closes have zero spread.
pub fn deviation(closes: &[f64], sma_50: Option<f64>) -> Option<f64> {
    let sma_50 = sma_50?;
    let current = *closes.last()?;
    let window = &closes[closes.len().saturating_sub(SMA_SHORT)..];
    let sd = std_dev(window)?;

    // A constant run can leave float noise instead of an exact zero.
    if !sd.is_finite() || sd <= f64::EPSILON * sma_50.abs().max(1.0) {
        return None;
    }
    Some((current - sma_50) / sd)
}

/// Compute the metrics record for `ticker` stamped with the current time.
pub fn compute(ticker: &str, series: &PriceSeries) -> Result<MetricsRecord> {
    compute_at(ticker, series, Utc::now())
}

/// Compute the metrics record with an explicit `computed_at`.
pub fn compute_at(ticker: &str, series: &PriceSeries, now: DateTime<Utc>) -> Result<MetricsRecord> {
    let current_price = series
        .last()
        .map(|p| p.close)
        .ok_or_else(|| AppError::NoData(ticker.to_string()))?;

    let closes = series.closes();
    let sma_50 = sma(&closes, SMA_SHORT);
    let sma_200 = sma(&closes, SMA_LONG);
    let deviation = deviation(&closes, sma_50);

    Ok(MetricsRecord {
        ticker: ticker.to_string(),
        sma_50,
        sma_200,
        deviation,
        signal: Signal::from_deviation(deviation),
        current_price,
        data_points: series.len(),
        computed_at: now,
    })
}

/// Trailing SMA at every index; `None` until `period` values exist.
pub fn rolling_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| sma(&closes[..=i], period))
        .collect()
}

/// Trailing sample standard deviation over `period` values at every index.
pub fn rolling_std(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                None
            } else {
                std_dev(&closes[i + 1 - period..=i])
            }
        })
        .collect()
}

/// Chart data for the trailing `window_days` calendar days.
///
/// Overlays are computed over the whole series first and only then cut to
/// the display window, so SMA-200 keeps its full history.
pub fn chart_series(ticker: &str, series: &PriceSeries, window_days: i64) -> Result<ChartSeries> {
    let record = compute(ticker, series)?;

    let closes = series.closes();
    let sma_50 = rolling_sma(&closes, SMA_SHORT);
    let sma_200 = rolling_sma(&closes, SMA_LONG);
    let std_50 = rolling_std(&closes, SMA_SHORT);

    let start = series.window_start(window_days);
    let mut chart = ChartSeries {
        ticker: ticker.to_string(),
        dates: Vec::with_capacity(series.len() - start),
        candlestick_data: Vec::with_capacity(series.len() - start),
        sma_50: Vec::with_capacity(series.len() - start),
        sma_200: Vec::with_capacity(series.len() - start),
        std_bands: StdBands::default(),
        current_price: record.current_price,
        sma_50_current: record.sma_50,
        sma_200_current: record.sma_200,
        devstep: record.deviation,
        signal: record.signal,
    };

    for (i, point) in series.points().iter().enumerate().skip(start) {
        let x = point.date.format("%Y-%m-%d").to_string();
        let band = |k: f64| match (sma_50[i], std_50[i]) {
            (Some(mid), Some(sd)) => Some(mid + k * sd),
            _ => None,
        };

        chart.candlestick_data.push(CandlePoint {
            x: x.clone(),
            open: point.open,
            high: point.high,
            low: point.low,
            close: point.close,
        });
        chart.sma_50.push(OverlayPoint { x: x.clone(), y: sma_50[i] });
        chart.sma_200.push(OverlayPoint { x: x.clone(), y: sma_200[i] });
        chart.std_bands.std_1_upper.push(OverlayPoint { x: x.clone(), y: band(1.0) });
        chart.std_bands.std_1_lower.push(OverlayPoint { x: x.clone(), y: band(-1.0) });
        chart.std_bands.std_2_upper.push(OverlayPoint { x: x.clone(), y: band(2.0) });
        chart.std_bands.std_2_lower.push(OverlayPoint { x: x.clone(), y: band(-2.0) });
        chart.dates.push(x);
    }

    Ok(chart)
}
