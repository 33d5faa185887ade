//! Reconciles backend history, the next-hour forecast and the live
//! simulation buffer into chart-ready series.
//!
//! One refresh cycle:
//!
//! 1. Fetch history. A failed or empty fetch ends the cycle in a no-data
//!    state; nothing is synthesized and no forecast is requested.
//! 2. Round AQI and particulates to one decimal and sort ascending by time.
//! 3. Classify the trend from the last two observations.
//! 4. Take the peak over the observations only.
//! 5. Fetch the forecast. Failure degrades to "no forecast".
//! 6. With a forecast, bridge the last observation into the forecast line and
//!    append the forecast point one hour later.

use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use std::fmt;

use crate::api::{HistoryRecord, TrendSource};
use crate::simulation::ScoredReading;
use crate::trends::AqiCategory;

/// Change within this many AQI points counts as stable.
pub const TREND_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Increasing => "Increasing",
            Self::Decreasing => "Decreasing",
            Self::Stable => "Stable",
        })
    }
}

#[must_use]
pub fn classify_trend(latest: f64, previous: f64) -> TrendDirection {
    if latest > previous + TREND_TOLERANCE {
        TrendDirection::Increasing
    } else if latest < previous - TREND_TOLERANCE {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// One point of the AQI chart.
///
/// Observations carry `aqi`; the synthetic forecast point carries only
/// `forecast_aqi`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    #[serde(rename = "time")]
    pub label: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "AQI", skip_serializing_if = "Option::is_none")]
    pub aqi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm25: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm10: Option<f64>,
    #[serde(rename = "forecastAQI", skip_serializing_if = "Option::is_none")]
    pub forecast_aqi: Option<f64>,
}

impl TrendPoint {
    #[must_use]
    pub fn observed(record: &HistoryRecord) -> Self {
        Self {
            label: time_label(record.timestamp),
            timestamp: record.timestamp,
            aqi: Some(round_to(record.aqi, 1)),
            pm25: Some(record.pm25.map_or(0.0, |v| round_to(v, 1))),
            pm10: Some(record.pm10.map_or(0.0, |v| round_to(v, 1))),
            forecast_aqi: None,
        }
    }

    #[must_use]
    pub fn forecast(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            label: format!("{} (FCST)", time_label(timestamp)),
            timestamp,
            aqi: None,
            pm25: None,
            pm10: None,
            forecast_aqi: Some(value),
        }
    }
}

/// One point of the particulate sub-chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticulatePoint {
    #[serde(rename = "time")]
    pub label: String,
    #[serde(rename = "PM25")]
    pub pm25: f64,
    #[serde(rename = "PM10")]
    pub pm10: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub series: Vec<TrendPoint>,
    pub current_aqi: f64,
    pub current_category: AqiCategory,
    pub peak_aqi: f64,
    pub direction: TrendDirection,
    pub forecast_aqi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoDataReason {
    Empty,
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrendState {
    Loading,
    NoData(NoDataReason),
    Ready(TrendReport),
}

impl TrendState {
    #[must_use]
    pub fn report(&self) -> Option<&TrendReport> {
        match self {
            Self::Ready(report) => Some(report),
            _ => None,
        }
    }
}

#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn time_label(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

/// Rounded observations, oldest first. Source order is not trusted.
#[must_use]
pub fn normalize_history(records: &[HistoryRecord]) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = records.iter().map(TrendPoint::observed).collect();
    points.sort_by_key(|p| p.timestamp);
    points
}

/// Bridge the last observation into the forecast line and append the
/// forecast point one hour after it.
///
/// `series` must end with an observation.
pub fn append_forecast(series: &mut Vec<TrendPoint>, forecast: f64) {
    let Some(last) = series.last_mut() else {
        return;
    };
    last.forecast_aqi = last.aqi;
    let at = last.timestamp + Duration::hours(1);
    series.push(TrendPoint::forecast(at, forecast));
}

/// Derive the report from sorted observations. `None` if there are none.
#[must_use]
pub fn build_report(mut series: Vec<TrendPoint>, forecast: Option<f64>) -> Option<TrendReport> {
    let current = series.last()?.aqi?;
    let previous = series
        .len()
        .checked_sub(2)
        .and_then(|i| series[i].aqi)
        .unwrap_or(current);
    let direction = classify_trend(current, previous);

    let peak = series
        .iter()
        .filter_map(|p| p.aqi)
        .fold(f64::NEG_INFINITY, f64::max);

    if let Some(value) = forecast {
        append_forecast(&mut series, value);
    }

    Some(TrendReport {
        series,
        current_aqi: current,
        current_category: AqiCategory::from_aqi(current),
        peak_aqi: peak,
        direction,
        forecast_aqi: forecast,
    })
}

/// Run one refresh cycle against `source`.
pub async fn run_cycle<S: TrendSource>(source: &S, region_id: i32) -> TrendState {
    let records = match source.history(region_id).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %e, region_id, "Error fetching trend history");
            return TrendState::NoData(NoDataReason::FetchFailed(e.to_string()));
        }
    };

    if records.is_empty() {
        tracing::debug!(region_id, "No history available");
        return TrendState::NoData(NoDataReason::Empty);
    }

    let series = normalize_history(&records);

    let forecast = match source.forecast(region_id).await {
        Ok(value) => value.map(|v| round_to(v, 2)),
        Err(e) => {
            tracing::warn!(error = %e, region_id, "Forecast fetch failed, continuing without forecast");
            None
        }
    };

    match build_report(series, forecast) {
        Some(report) => {
            tracing::debug!(
                region_id,
                points = report.series.len(),
                current_aqi = report.current_aqi,
                peak_aqi = report.peak_aqi,
                direction = %report.direction,
                forecast_aqi = ?report.forecast_aqi,
                "Trend cycle completed"
            );
            TrendState::Ready(report)
        }
        None => TrendState::NoData(NoDataReason::Empty),
    }
}

/// Particulate series for the sub-chart.
///
/// Live simulated readings win when there are any (oldest first); otherwise
/// the trend series points without a forecast value are used, which leaves
/// out both the forecast point and the observation bridged to it. The two
/// sources are never mixed.
#[must_use]
pub fn particulate_series(live: &[ScoredReading], series: &[TrendPoint]) -> Vec<ParticulatePoint> {
    if live.is_empty() {
        return series
            .iter()
            .filter(|p| p.forecast_aqi.is_none())
            .map(|p| ParticulatePoint {
                label: p.label.clone(),
                pm25: p.pm25.unwrap_or(0.0),
                pm10: p.pm10.unwrap_or(0.0),
            })
            .collect();
    }

    live.iter()
        .rev()
        .map(|r| ParticulatePoint {
            label: time_label(r.reading.timestamp),
            pm25: r.reading.pollutants.pm2_5,
            pm10: r.reading.pollutants.pm10,
        })
        .collect()
}
