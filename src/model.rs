use crate::datagen::Observation;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Number of trailing daily values used as lag features
pub const WINDOW: usize = 7;

// Lag values plus day-of-week and month of the target date
const FEATURES: usize = WINDOW + 2;

// Small diagonal term keeping the normal equations solvable on short series
const RIDGE: f64 = 1e-6;

/// One predicted point of the forecast horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Date the prediction is for
    pub date: NaiveDateTime,

    /// Predicted consumption in kWh
    pub predicted_kwh: f64,
}

/// Lag-feature regression model for daily consumption
///
/// A single linear regressor fit by ordinary least squares on a sliding
/// window of the preceding `WINDOW` days plus the target's day-of-week and
/// month. Multi-step forecasting is iterative, so error compounds with the
/// horizon length; no correction mechanism is applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnergyModel {
    /// Intercept followed by one weight per feature
    weights: Vec<f64>,

    /// Whether the model has been fitted
    fitted: bool,
}

/// Build one feature row from a chronological window and a target date
///
/// `window` holds the `WINDOW` values preceding the target, oldest first.
fn feature_row(window: &[f64], target: NaiveDate) -> Vec<f64> {
    let mut row = Vec::with_capacity(FEATURES);
    row.extend_from_slice(window);
    row.push(target.weekday().num_days_from_monday() as f64);
    row.push(target.month() as f64);
    row
}

/// Turn an observation series into a lag-feature matrix and target vector
///
/// Each sample maps the `WINDOW` preceding values (plus date features of
/// the target day) to the value observed on that day. The series must be
/// sorted ascending by date.
///
/// # Returns
/// * `Result<(Vec<Vec<f64>>, Vec<f64>), String>` - Feature rows and targets
///
/// # Errors
/// * Returns an error when fewer than `WINDOW + 1` observations are
///   available, or when any value is NaN or infinite
pub fn prepare_data(observations: &[Observation]) -> Result<(Vec<Vec<f64>>, Vec<f64>), String> {
    if observations.len() < WINDOW + 1 {
        return Err(format!(
            "Need at least {} days of data to train the model",
            WINDOW + 1
        ));
    }

    if observations
        .iter()
        .any(|o| o.consumption_kwh.is_nan() || o.consumption_kwh.is_infinite())
    {
        return Err("Data contains NaN or infinite values".to_string());
    }

    let values: Vec<f64> = observations.iter().map(|o| o.consumption_kwh).collect();

    let mut x = Vec::with_capacity(values.len() - WINDOW);
    let mut y = Vec::with_capacity(values.len() - WINDOW);

    for i in WINDOW..values.len() {
        x.push(feature_row(
            &values[i - WINDOW..i],
            observations[i].date.date(),
        ));
        y.push(values[i]);
    }

    Ok((x, y))
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, String> {
    let n = b.len();

    for col in 0..n {
        // Pick the pivot row
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return Err("Training failed: feature matrix is singular".to_string());
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        // Eliminate below
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        let mut sum = b[col];
        for k in col + 1..n {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }

    Ok(x)
}

impl EnergyModel {
    /// Fit the regressor on a prepared feature matrix
    ///
    /// Ordinary least squares through the normal equations, with a small
    /// ridge term on the diagonal. No cross-validation or hyperparameter
    /// search is performed.
    ///
    /// # Arguments
    /// * `x` - Feature rows from [`prepare_data`]
    /// * `y` - Target values, one per row
    ///
    /// # Errors
    /// * Returns an error on empty or mismatched inputs, or when the
    ///   normal equations cannot be solved
    pub fn train(x: &[Vec<f64>], y: &[f64]) -> Result<EnergyModel, String> {
        if x.is_empty() || x.len() != y.len() {
            return Err("Training data is empty or mismatched".to_string());
        }

        // Augmented dimension: intercept plus one weight per feature
        let d = FEATURES + 1;

        let mut xtx = vec![vec![0.0; d]; d];
        let mut xty = vec![0.0; d];

        for (row, &target) in x.iter().zip(y.iter()) {
            if row.len() != FEATURES {
                return Err("Feature row has unexpected width".to_string());
            }

            let mut augmented = Vec::with_capacity(d);
            augmented.push(1.0);
            augmented.extend_from_slice(row);

            for i in 0..d {
                for j in 0..d {
                    xtx[i][j] += augmented[i] * augmented[j];
                }
                xty[i] += augmented[i] * target;
            }
        }

        for (i, row) in xtx.iter_mut().enumerate() {
            row[i] += RIDGE;
        }

        let weights = solve_linear_system(xtx, xty)?;

        Ok(EnergyModel {
            weights,
            fitted: true,
        })
    }

    /// Whether the model has been fitted
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Predict a single value from one feature row
    fn predict_row(&self, features: &[f64]) -> f64 {
        let mut value = self.weights[0];
        for (w, f) in self.weights[1..].iter().zip(features.iter()) {
            value += w * f;
        }
        value
    }

    /// Forecast the next `horizon` days after the end of a series
    ///
    /// Iterative multi-step prediction: each step's prediction is appended
    /// to the trailing window and consumed by the next step.
    ///
    /// # Arguments
    /// * `history` - Chronologically sorted observations; the last `WINDOW`
    ///   values seed the first window
    /// * `horizon` - Number of future days to predict
    ///
    /// # Returns
    /// * `Result<Vec<ForecastPoint>, String>` - Exactly `horizon` points,
    ///   one per day after the last observation, clamped non-negative
    ///
    /// # Errors
    /// * Returns an error when the model is not fitted or the history is
    ///   shorter than the lag window
    pub fn predict_future(
        &self,
        history: &[Observation],
        horizon: usize,
    ) -> Result<Vec<ForecastPoint>, String> {
        if !self.fitted {
            return Err("Model has not been trained yet".to_string());
        }
        if history.len() < WINDOW {
            return Err(format!(
                "Need at least {} days of history to forecast",
                WINDOW
            ));
        }

        let mut window: Vec<f64> = history[history.len() - WINDOW..]
            .iter()
            .map(|o| o.consumption_kwh)
            .collect();
        let last_date = history[history.len() - 1].date.date();

        let mut forecast = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            let target = last_date + Duration::days(step as i64);
            let features = feature_row(&window, target);
            let predicted = self.predict_row(&features).max(0.0);

            forecast.push(ForecastPoint {
                date: NaiveDateTime::new(target, NaiveTime::MIN),
                predicted_kwh: predicted,
            });

            window.remove(0);
            window.push(predicted);
        }

        Ok(forecast)
    }

    /// Mean squared error over the trailing 20% of a prepared dataset
    ///
    /// Returns `None` when the model is unfitted or the holdout slice is
    /// empty.
    pub fn evaluate(&self, x: &[Vec<f64>], y: &[f64]) -> Option<f64> {
        if !self.fitted || x.is_empty() || x.len() != y.len() {
            return None;
        }

        let split = (x.len() * 4) / 5;
        if split == x.len() {
            return None;
        }

        let mut sum = 0.0;
        for (row, &target) in x[split..].iter().zip(y[split..].iter()) {
            let err = target - self.predict_row(row);
            sum += err * err;
        }

        Some(sum / (x.len() - split) as f64)
    }

    #[cfg(test)]
    fn with_weights(weights: Vec<f64>) -> EnergyModel {
        EnergyModel {
            weights,
            fitted: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagen::generate_energy_data;

    fn daily_series(values: &[f64]) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation {
                date: NaiveDateTime::new(start + Duration::days(i as i64), NaiveTime::MIN),
                consumption_kwh: v,
            })
            .collect()
    }

    #[test]
    fn test_prepare_data_insufficient() {
        let short = daily_series(&[1.0, 2.0, 3.0]);
        assert!(prepare_data(&short).is_err());
    }

    #[test]
    fn test_prepare_data_window_shifts_by_one() {
        let series = daily_series(&(0..20).map(|i| i as f64).collect::<Vec<_>>());
        let (x, y) = prepare_data(&series).unwrap();

        assert_eq!(x.len(), 20 - WINDOW);
        assert_eq!(y[0], WINDOW as f64);

        // Consecutive rows share WINDOW-1 lag values, shifted by one
        for i in 0..x.len() - 1 {
            assert_eq!(x[i][1..WINDOW], x[i + 1][..WINDOW - 1]);
        }
    }

    #[test]
    fn test_train_and_predict_horizon_length() {
        let series = generate_energy_data(120, Some(9)).unwrap();
        let (x, y) = prepare_data(&series).unwrap();
        let model = EnergyModel::train(&x, &y).unwrap();
        assert!(model.is_fitted());

        let forecast = model.predict_future(&series, 30).unwrap();
        assert_eq!(forecast.len(), 30);
        assert!(forecast.iter().all(|p| p.predicted_kwh >= 0.0));

        // One point per consecutive day after the series end
        let last = series.last().unwrap().date.date();
        for (i, point) in forecast.iter().enumerate() {
            assert_eq!(point.date.date(), last + Duration::days(i as i64 + 1));
        }
    }

    #[test]
    fn test_iterative_prediction_feeds_next_step() {
        // Weight 1.0 on the most recent lag, intercept 1.0: each step
        // predicts previous + 1, so the chain only works if predictions
        // re-enter the window.
        let mut weights = vec![0.0; FEATURES + 1];
        weights[0] = 1.0;
        weights[WINDOW] = 1.0;
        let model = EnergyModel::with_weights(weights);

        let series = daily_series(&[5.0; WINDOW]);
        let forecast = model.predict_future(&series, 3).unwrap();

        assert_eq!(forecast[0].predicted_kwh, 6.0);
        assert_eq!(forecast[1].predicted_kwh, 7.0);
        assert_eq!(forecast[2].predicted_kwh, 8.0);
    }

    #[test]
    fn test_predict_unfitted_rejected() {
        let model = EnergyModel {
            weights: vec![0.0; FEATURES + 1],
            fitted: false,
        };
        let series = daily_series(&[5.0; WINDOW]);
        assert!(model.predict_future(&series, 5).is_err());
    }

    #[test]
    fn test_evaluate_returns_holdout_mse() {
        let series = generate_energy_data(200, Some(3)).unwrap();
        let (x, y) = prepare_data(&series).unwrap();
        let model = EnergyModel::train(&x, &y).unwrap();

        let mse = model.evaluate(&x, &y).unwrap();
        assert!(mse.is_finite());
        assert!(mse >= 0.0);
    }
}
