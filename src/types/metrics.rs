use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categorical trading signal derived from the deviation statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Overbought")]
    Overbought,
    #[serde(rename = "Extreme Overbought")]
    ExtremeOverbought,
    #[serde(rename = "Oversold")]
    Oversold,
    #[serde(rename = "Extreme Oversold")]
    ExtremeOversold,
}

impl Signal {
    /// Classify a deviation (in standard-deviation units from SMA-50).
    ///
    /// Each band is closed on the side nearer zero: exactly 1.0 is
    /// Overbought, exactly -2.0 is Extreme Oversold. An absent deviation
    /// is Neutral.
    pub fn from_deviation(deviation: Option<f64>) -> Self {
        match deviation {
            Some(d) if d >= 2.0 => Signal::ExtremeOverbought,
            Some(d) if d >= 1.0 => Signal::Overbought,
            Some(d) if d <= -2.0 => Signal::ExtremeOversold,
            Some(d) if d <= -1.0 => Signal::Oversold,
            _ => Signal::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Neutral => "Neutral",
            Signal::Overbought => "Overbought",
            Signal::ExtremeOverbought => "Extreme Overbought",
            Signal::Oversold => "Oversold",
            Signal::ExtremeOversold => "Extreme Oversold",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Neutral" => Ok(Signal::Neutral),
            "Overbought" => Ok(Signal::Overbought),
            "Extreme Overbought" => Ok(Signal::ExtremeOverbought),
            "Oversold" => Ok(Signal::Oversold),
            "Extreme Oversold" => Ok(Signal::ExtremeOversold),
            other => Err(format!("unknown signal: {}", other)),
        }
    }
}

/// Indicators and signal computed from one price series snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Normalized ticker (trimmed, uppercase).
    pub ticker: String,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    /// Distance of `current_price` from `sma_50` in standard deviations.
    pub deviation: Option<f64>,
    pub signal: Signal,
    pub current_price: f64,
    pub data_points: usize,
    pub computed_at: DateTime<Utc>,
}

impl MetricsRecord {
    /// Same record with `computed_at` replaced.
    pub fn with_computed_at(mut self, computed_at: DateTime<Utc>) -> Self {
        self.computed_at = computed_at;
        self
    }
}

/// A cached metrics record.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub record: MetricsRecord,
}

impl CacheEntry {
    pub fn new(record: MetricsRecord) -> Self {
        Self { record }
    }

    pub fn ticker(&self) -> &str {
        &self.record.ticker
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.record.computed_at
    }

    /// True while `now - computed_at` is within the freshness window.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        now.signed_duration_since(self.computed_at()) <= window
    }
}

/// Single-ticker lookup response. Field names are the public wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub ticker: String,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub devstep: Option<f64>,
    pub signal: Signal,
    pub current_price: f64,
    pub data_points: usize,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_timestamp: Option<String>,
}

impl MetricsResponse {
    /// Shape a record for the wire, rounding for display.
    pub fn from_record(
        record: &MetricsRecord,
        cached: bool,
        cache_timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            ticker: record.ticker.clone(),
            sma_50: record.sma_50.map(|v| round_to(v, 2)),
            sma_200: record.sma_200.map(|v| round_to(v, 2)),
            devstep: record.deviation.map(|v| round_to(v, 4)),
            signal: record.signal,
            current_price: round_to(record.current_price, 2),
            data_points: record.data_points,
            cached,
            cache_timestamp: if cached {
                cache_timestamp.map(|ts| ts.to_rfc3339())
            } else {
                None
            },
        }
    }
}

/// Per-ticker row in a multi-ticker lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TickerResult {
    Metrics(MetricsResponse),
    Error { ticker: String, error: String },
}

impl TickerResult {
    pub fn ticker(&self) -> &str {
        match self {
            TickerResult::Metrics(m) => &m.ticker,
            TickerResult::Error { ticker, .. } => ticker,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TickerResult::Error { .. })
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(deviation: Option<f64>) -> MetricsRecord {
        MetricsRecord {
            ticker: "AAPL".to_string(),
            sma_50: Some(100.123_456),
            sma_200: None,
            deviation,
            signal: Signal::from_deviation(deviation),
            current_price: 101.456,
            data_points: 120,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_signal_boundaries() {
        let cases = [
            (None, Signal::Neutral),
            (Some(0.0), Signal::Neutral),
            (Some(0.999), Signal::Neutral),
            (Some(-0.999), Signal::Neutral),
            (Some(1.0), Signal::Overbought),
            (Some(1.999), Signal::Overbought),
            (Some(2.0), Signal::ExtremeOverbought),
            (Some(7.5), Signal::ExtremeOverbought),
            (Some(-1.0), Signal::Oversold),
            (Some(-1.999), Signal::Oversold),
            (Some(-2.0), Signal::ExtremeOversold),
            (Some(-9.0), Signal::ExtremeOversold),
        ];

        for (deviation, expected) in cases {
            assert_eq!(Signal::from_deviation(deviation), expected, "deviation {:?}", deviation);
        }
    }

    #[test]
    fn test_signal_wire_names() {
        assert_eq!(
            serde_json::to_string(&Signal::ExtremeOverbought).unwrap(),
            "\"Extreme Overbought\""
        );
        for signal in [
            Signal::Neutral,
            Signal::Overbought,
            Signal::ExtremeOverbought,
            Signal::Oversold,
            Signal::ExtremeOversold,
        ] {
            assert_eq!(signal.as_str().parse::<Signal>(), Ok(signal));
        }
        assert!("Bullish".parse::<Signal>().is_err());
    }

    #[test]
    fn test_cache_entry_freshness() {
        let now = Utc::now();
        let entry = CacheEntry::new(record(None).with_computed_at(now - chrono::Duration::minutes(59)));

        assert!(entry.is_fresh(now, chrono::Duration::minutes(60)));
        assert!(entry.is_fresh(now, chrono::Duration::minutes(59)));
        assert!(!entry.is_fresh(now, chrono::Duration::minutes(58)));
    }

    #[test]
    fn test_response_rounding_and_nulls() {
        let response = MetricsResponse::from_record(&record(Some(1.234_567_8)), false, None);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["sma_50"], 100.12);
        assert!(json["sma_200"].is_null());
        assert_eq!(json["devstep"], 1.2346);
        assert_eq!(json["signal"], "Overbought");
        assert_eq!(json["current_price"], 101.46);
        assert_eq!(json["cached"], false);
        assert!(json.get("cache_timestamp").is_none());
    }

    #[test]
    fn test_response_cache_timestamp_only_when_cached() {
        let ts = Utc::now();
        let cached = MetricsResponse::from_record(&record(None), true, Some(ts));
        assert_eq!(cached.cache_timestamp, Some(ts.to_rfc3339()));

        let fresh = MetricsResponse::from_record(&record(None), false, Some(ts));
        assert!(fresh.cache_timestamp.is_none());
    }

    #[test]
    fn test_ticker_result_error_row() {
        let row = TickerResult::Error {
            ticker: "ZZZZ".to_string(),
            error: "Data unavailable: unknown ticker".to_string(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["ticker"], "ZZZZ");
        assert!(json["error"].is_string());
        assert!(row.is_error());
    }
}
