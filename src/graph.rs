#![cfg(not(tarpaulin_include))]

use crate::analysis::{HistogramBin, MonthlyAverage};
use crate::datagen::Observation;
use crate::model::ForecastPoint;
use plotters::prelude::*;
use std::fs::remove_file;

/// Configuration options for chart generation
///
/// Width, height and labels shared by all chart types.
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Energy Consumption".to_string(),
            x_label: "Day".to_string(),
            y_label: "Consumption (kWh)".to_string(),
            width: 900,
            height: 480,
        }
    }
}

// Render through a file-based bitmap backend, then read the bytes back
fn render_to_png<F>(filename: &str, draw: F) -> Result<Vec<u8>, Box<dyn std::error::Error>>
where
    F: FnOnce(&str) -> Result<(), Box<dyn std::error::Error>>,
{
    draw(filename)?;
    let png_data = std::fs::read(filename)?;
    remove_file(filename)?;
    Ok(png_data)
}

/// Render the historical series as a line chart
///
/// The X-axis is the day index into the series; the Y-axis auto-scales to
/// the observed range.
///
/// # Returns
/// * PNG image data as bytes, or an error
pub fn history_chart(
    observations: &[Observation],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if observations.is_empty() {
        return Err("No data to plot".into());
    }

    let values: Vec<f64> = observations.iter().map(|o| o.consumption_kwh).collect();
    let min_y = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    render_to_png("temp_history.png", |filename| {
        let root =
            BitMapBackend::new(filename, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..values.len() as f64, min_y..max_y + 1.0)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(LineSeries::new(
            values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
            &BLUE,
        ))?;

        root.present()?;
        Ok(())
    })
}

/// Render monthly average consumption as a bar chart
pub fn monthly_chart(
    monthly: &[MonthlyAverage],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if monthly.is_empty() {
        return Err("No data to plot".into());
    }

    let max_y = monthly.iter().map(|m| m.average).fold(0.0, f64::max);

    render_to_png("temp_monthly.png", |filename| {
        let root =
            BitMapBackend::new(filename, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..13f64, 0f64..max_y + 1.0)?;

        chart
            .configure_mesh()
            .x_desc("Month")
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(monthly.iter().map(|m| {
            Rectangle::new(
                [
                    (m.month as f64 - 0.4, 0.0),
                    (m.month as f64 + 0.4, m.average),
                ],
                BLUE.filled(),
            )
        }))?;

        root.present()?;
        Ok(())
    })
}

/// Render a consumption distribution histogram
pub fn distribution_chart(
    bins: &[HistogramBin],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if bins.is_empty() {
        return Err("No data to plot".into());
    }

    let min_x = bins[0].start;
    let max_x = bins[bins.len() - 1].end;
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0);

    render_to_png("temp_distribution.png", |filename| {
        let root =
            BitMapBackend::new(filename, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(min_x..max_x, 0f64..max_count as f64 + 1.0)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc("Frequency")
            .draw()?;

        chart.draw_series(bins.iter().map(|b| {
            Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], RED.filled())
        }))?;

        root.present()?;
        Ok(())
    })
}

/// Render the historical series and forecast on one chart
///
/// History is drawn in blue, the forecast continues in red, and a vertical
/// marker shows where the forecast starts.
pub fn overlay_chart(
    observations: &[Observation],
    forecast: &[ForecastPoint],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if observations.is_empty() || forecast.is_empty() {
        return Err("No data to plot".into());
    }

    let history: Vec<f64> = observations.iter().map(|o| o.consumption_kwh).collect();
    let predicted: Vec<f64> = forecast.iter().map(|p| p.predicted_kwh).collect();

    let min_y = history
        .iter()
        .chain(predicted.iter())
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let max_y = history
        .iter()
        .chain(predicted.iter())
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    let total = history.len() + predicted.len();
    let split = history.len() as f64 - 1.0;

    render_to_png("temp_overlay.png", |filename| {
        let root =
            BitMapBackend::new(filename, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..total as f64, min_y..max_y + 1.0)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart
            .draw_series(LineSeries::new(
                history.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                &BLUE,
            ))?
            .label("Historical")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        chart
            .draw_series(LineSeries::new(
                predicted
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| ((history.len() + i) as f64, v)),
                &RED,
            ))?
            .label("Forecast")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        // Forecast start marker
        chart.draw_series(LineSeries::new(
            vec![(split, min_y), (split, max_y)],
            &BLACK.mix(0.5),
        ))?;

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    })
}
