use chrono::Duration;
use ecowatt::datagen::generate_energy_data;
use ecowatt::model::{EnergyModel, WINDOW, prepare_data};
use ecowatt::saving::{load_model, save_model};
use tempfile::tempdir;

fn main() {
    println!("=== Model Test Suite ===\n");

    println!("Test 1: Too little data fails gracefully");
    let short = generate_energy_data(WINDOW, Some(1)).expect("Generation failed");
    let err = prepare_data(&short).expect_err("Expected insufficient data error");
    assert!(err.contains("at least"), "Unexpected message: {}", err);
    println!("{} rows rejected: \"{}\" - PASS\n", short.len(), err);

    println!("Test 2: Feature matrix shape");
    let series = generate_energy_data(100, Some(2)).expect("Generation failed");
    let (x, y) = prepare_data(&series).expect("Preparation failed");
    assert_eq!(x.len(), series.len() - WINDOW);
    assert_eq!(x.len(), y.len());
    assert_eq!(x[0].len(), WINDOW + 2);
    println!("{} rows of {} features - PASS\n", x.len(), x[0].len());

    println!("Test 3: Lag window slides by one day");
    for i in 0..x.len() - 1 {
        assert_eq!(x[i][1..WINDOW], x[i + 1][..WINDOW - 1]);
    }
    println!("Adjacent rows share {} lags - PASS\n", WINDOW - 1);

    println!("Test 4: Training and forecasting");
    let series = generate_energy_data(730, Some(3)).expect("Generation failed");
    let (x, y) = prepare_data(&series).expect("Preparation failed");
    let model = EnergyModel::train(&x, &y).expect("Training failed");
    let forecast = model.predict_future(&series, 30).expect("Forecast failed");
    assert_eq!(forecast.len(), 30);
    let last = series.last().unwrap().date;
    for (i, point) in forecast.iter().enumerate() {
        assert_eq!(point.date, last + Duration::days(i as i64 + 1));
        assert!(point.predicted_kwh >= 0.0);
        assert!(point.predicted_kwh.is_finite());
    }
    println!("30-day forecast continues the series - PASS\n");

    println!("Test 5: Forecast stays near the historical level");
    let mean = series.iter().map(|o| o.consumption_kwh).sum::<f64>() / series.len() as f64;
    let forecast_mean =
        forecast.iter().map(|p| p.predicted_kwh).sum::<f64>() / forecast.len() as f64;
    assert!(
        (forecast_mean - mean).abs() < mean,
        "Forecast mean {:.1} far from history mean {:.1}",
        forecast_mean,
        mean
    );
    println!(
        "History mean {:.1} kWh, forecast mean {:.1} kWh - PASS\n",
        mean, forecast_mean
    );

    println!("Test 6: Unfitted model refuses to forecast");
    let blank = EnergyModel::default();
    assert!(blank.predict_future(&series, 10).is_err());
    println!("Unfitted model rejected - PASS\n");

    println!("Test 7: Holdout evaluation");
    let mse = model.evaluate(&x, &y).expect("Expected an MSE");
    assert!(mse.is_finite() && mse >= 0.0);
    println!("Holdout MSE {:.2} - PASS\n", mse);

    println!("Test 8: Persistence round trip");
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("energy_model.bin.gz");
    let path = path.to_str().expect("Invalid path");
    save_model(&model, path).expect("Save failed");
    let loaded = load_model(path).expect("Load failed");
    let original = model.predict_future(&series, 10).expect("Forecast failed");
    let restored = loaded.predict_future(&series, 10).expect("Forecast failed");
    for (a, b) in original.iter().zip(restored.iter()) {
        assert_eq!(a.date, b.date);
        assert!((a.predicted_kwh - b.predicted_kwh).abs() < 1e-9);
    }
    println!("Reloaded model reproduces predictions - PASS\n");

    println!("=== All model tests passed ===");
}
