use crate::datagen::Observation;
use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Descriptive statistics of an observation series
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    /// Number of observations
    pub records: usize,

    /// First timestamp of the series
    pub start: NaiveDateTime,

    /// Last timestamp of the series
    pub end: NaiveDateTime,

    /// Mean consumption in kWh
    pub mean: f64,

    /// Total consumption in kWh
    pub total: f64,

    /// Minimum observed value
    pub min: f64,

    /// Maximum observed value
    pub max: f64,

    /// Population standard deviation
    pub std_dev: f64,
}

/// Average consumption for one calendar month
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyAverage {
    /// Month number, 1-12
    pub month: u32,

    /// Month name for display
    pub name: String,

    /// Mean consumption across all observations in that month
    pub average: f64,
}

/// One bin of a consumption distribution histogram
#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower bound of the bin
    pub start: f64,

    /// Exclusive upper bound (inclusive for the last bin)
    pub end: f64,

    /// Number of observations falling in the bin
    pub count: usize,
}

/// Compute summary statistics over a series
///
/// Assumes the series is sorted ascending by date. Returns `None` for an
/// empty series.
pub fn summarize(observations: &[Observation]) -> Option<SeriesSummary> {
    if observations.is_empty() {
        return None;
    }

    let n = observations.len() as f64;
    let total: f64 = observations.iter().map(|o| o.consumption_kwh).sum();
    let mean = total / n;

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sq_sum = 0.0;
    for obs in observations {
        min = min.min(obs.consumption_kwh);
        max = max.max(obs.consumption_kwh);
        let diff = obs.consumption_kwh - mean;
        sq_sum += diff * diff;
    }

    Some(SeriesSummary {
        records: observations.len(),
        start: observations[0].date,
        end: observations[observations.len() - 1].date,
        mean,
        total,
        min,
        max,
        std_dev: (sq_sum / n).sqrt(),
    })
}

/// Mean consumption per calendar month, ordered January through December
///
/// Months with no observations are omitted.
pub fn monthly_averages(observations: &[Observation]) -> Vec<MonthlyAverage> {
    let mut totals = [0.0; 12];
    let mut counts = [0usize; 12];

    for obs in observations {
        let idx = obs.date.month() as usize - 1;
        totals[idx] += obs.consumption_kwh;
        counts[idx] += 1;
    }

    (0..12)
        .filter(|&idx| counts[idx] > 0)
        .map(|idx| MonthlyAverage {
            month: idx as u32 + 1,
            name: MONTH_NAMES[idx].to_string(),
            average: totals[idx] / counts[idx] as f64,
        })
        .collect()
}

/// Fixed-bin histogram of consumption values
///
/// A flat series (min == max) collapses into a single bin.
pub fn histogram(observations: &[Observation], bins: usize) -> Vec<HistogramBin> {
    if observations.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for obs in observations {
        min = min.min(obs.consumption_kwh);
        max = max.max(obs.consumption_kwh);
    }

    if max <= min {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: observations.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for obs in observations {
        let idx = (((obs.consumption_kwh - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}
