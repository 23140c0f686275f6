use crate::analysis::SeriesSummary;
use crate::datagen::Observation;
use crate::model::ForecastPoint;

/// Render the forecast table as CSV
///
/// Columns: `date` (day granularity) and `predicted_consumption`, one row
/// per forecast point in horizon order.
pub fn forecast_to_csv(forecast: &[ForecastPoint]) -> String {
    let mut csv = String::from("date,predicted_consumption\n");
    for point in forecast {
        csv.push_str(&format!(
            "{},{:.2}\n",
            point.date.format("%Y-%m-%d"),
            point.predicted_kwh
        ));
    }
    csv
}

/// Render history and forecast as one CSV, tagged by a `data_type` column
pub fn combined_to_csv(history: &[Observation], forecast: &[ForecastPoint]) -> String {
    let mut csv = String::from("date,consumption_kwh,data_type\n");
    for obs in history {
        csv.push_str(&format!(
            "{},{:.2},historical\n",
            obs.date.format("%Y-%m-%d"),
            obs.consumption_kwh
        ));
    }
    for point in forecast {
        csv.push_str(&format!(
            "{},{:.2},forecast\n",
            point.date.format("%Y-%m-%d"),
            point.predicted_kwh
        ));
    }
    csv
}

/// Render a metric/value summary report comparing history and forecast
///
/// Mirrors the metrics shown on the results screen: periods, averages,
/// relative change and peaks.
pub fn summary_to_csv(summary: &SeriesSummary, forecast: &[ForecastPoint]) -> String {
    let forecast_avg = if forecast.is_empty() {
        0.0
    } else {
        forecast.iter().map(|p| p.predicted_kwh).sum::<f64>() / forecast.len() as f64
    };
    let forecast_peak = forecast.iter().map(|p| p.predicted_kwh).fold(0.0, f64::max);
    let change_percent = if summary.mean != 0.0 {
        (forecast_avg - summary.mean) / summary.mean * 100.0
    } else {
        0.0
    };

    let forecast_period = match (forecast.first(), forecast.last()) {
        (Some(first), Some(last)) => format!(
            "{} to {}",
            first.date.format("%Y-%m-%d"),
            last.date.format("%Y-%m-%d")
        ),
        _ => "no forecast".to_string(),
    };

    let mut csv = String::from("Metric,Value\n");
    csv.push_str(&format!(
        "Historical Period,{} to {}\n",
        summary.start.format("%Y-%m-%d"),
        summary.end.format("%Y-%m-%d")
    ));
    csv.push_str(&format!("Forecast Period,{}\n", forecast_period));
    csv.push_str(&format!("Historical Average,{:.2} kWh\n", summary.mean));
    csv.push_str(&format!("Forecast Average,{:.2} kWh\n", forecast_avg));
    csv.push_str(&format!("Change %,{:+.2}%\n", change_percent));
    csv.push_str(&format!("Peak Historical,{:.2} kWh\n", summary.max));
    csv.push_str(&format!("Peak Forecast,{:.2} kWh\n", forecast_peak));
    csv
}
