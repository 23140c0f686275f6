use chrono::Duration;
use ecowatt::datagen::generate_energy_data;
use ecowatt::saving::{read_observations, write_observations};
use tempfile::tempdir;

fn main() {
    println!("=== Data Generator Test Suite ===\n");

    println!("Test 1: Requested length and daily cadence");
    let series = generate_energy_data(365, Some(42)).expect("Generation failed");
    assert_eq!(series.len(), 365);
    for pair in series.windows(2) {
        assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
    }
    println!("365 consecutive daily observations - PASS\n");

    println!("Test 2: Values are non-negative");
    assert!(series.iter().all(|o| o.consumption_kwh >= 0.0));
    println!("All values >= 0 - PASS\n");

    println!("Test 3: Seeded generation is deterministic");
    let again = generate_energy_data(365, Some(42)).expect("Generation failed");
    assert_eq!(series, again);
    let other = generate_energy_data(365, Some(43)).expect("Generation failed");
    assert_ne!(series, other);
    println!("Same seed reproduces the series, different seed diverges - PASS\n");

    println!("Test 4: Zero periods is rejected");
    assert!(generate_energy_data(0, None).is_err());
    println!("Empty request rejected - PASS\n");

    println!("Test 5: Series shows seasonal variation");
    let long = generate_energy_data(730, Some(7)).expect("Generation failed");
    let min = long.iter().map(|o| o.consumption_kwh).fold(f64::INFINITY, f64::min);
    let max = long
        .iter()
        .map(|o| o.consumption_kwh)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(max - min > 20.0, "Expected visible seasonal spread, got {}", max - min);
    println!("Two-year spread {:.1} kWh - PASS\n", max - min);

    println!("Test 6: CSV round trip preserves the series");
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("energy_data.csv");
    let path = path.to_str().expect("Invalid path");
    write_observations(&series, path).expect("Write failed");
    let loaded = read_observations(path).expect("Read failed");
    assert_eq!(loaded.len(), series.len());
    for (a, b) in series.iter().zip(loaded.iter()) {
        assert_eq!(a.date, b.date);
        assert!((a.consumption_kwh - b.consumption_kwh).abs() < 1e-9);
    }
    println!("{} rows written and read back - PASS\n", loaded.len());

    println!("=== All datagen tests passed ===");
}
