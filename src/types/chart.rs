use serde::{Deserialize, Serialize};

use super::Signal;

/// Candlestick for the chart, keyed by ISO date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub x: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One point of an indicator overlay; `y` is null until enough history exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayPoint {
    pub x: String,
    pub y: Option<f64>,
}

/// Standard-deviation bands around SMA-50.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StdBands {
    pub std_1_upper: Vec<OverlayPoint>,
    pub std_1_lower: Vec<OverlayPoint>,
    pub std_2_upper: Vec<OverlayPoint>,
    pub std_2_lower: Vec<OverlayPoint>,
}

/// Windowed series plus indicator overlays for chart rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub ticker: String,
    pub dates: Vec<String>,
    pub candlestick_data: Vec<CandlePoint>,
    pub sma_50: Vec<OverlayPoint>,
    pub sma_200: Vec<OverlayPoint>,
    pub std_bands: StdBands,
    pub current_price: f64,
    pub sma_50_current: Option<f64>,
    pub sma_200_current: Option<f64>,
    pub devstep: Option<f64>,
    pub signal: Signal,
}
