use chrono::{NaiveDate, NaiveTime};
use ecowatt::loader::parse_csv;

fn main() {
    println!("=== Loader Test Suite ===\n");

    println!("Test 1: Basic CSV with bare dates");
    let csv = "date,consumption_kwh\n2024-01-01,120.5\n2024-01-02,118.2\n";
    let rows = parse_csv(csv).expect("Parse failed");
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].date,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_time(NaiveTime::MIN)
    );
    assert!((rows[0].consumption_kwh - 120.5).abs() < 1e-9);
    println!("Bare dates parsed to midnight timestamps - PASS\n");

    println!("Test 2: Optional time column is combined with the date");
    let csv = "date,time,consumption_kwh\n2024-01-01,14:30:00,95.0\n";
    let rows = parse_csv(csv).expect("Parse failed");
    let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(14, 30, 0)
        .unwrap();
    assert_eq!(rows[0].date, expected);
    println!("date + time concatenated - PASS\n");

    println!("Test 3: Header lookup is case-insensitive and order-free");
    let csv = "Consumption_kWh,DATE\n42.0,2024-03-05\n";
    let rows = parse_csv(csv).expect("Parse failed");
    assert_eq!(rows.len(), 1);
    assert!((rows[0].consumption_kwh - 42.0).abs() < 1e-9);
    println!("Reordered uppercase headers accepted - PASS\n");

    println!("Test 4: Rows come back sorted by date");
    let csv = "date,consumption_kwh\n2024-01-03,3.0\n2024-01-01,1.0\n2024-01-02,2.0\n";
    let rows = parse_csv(csv).expect("Parse failed");
    let values: Vec<f64> = rows.iter().map(|r| r.consumption_kwh).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
    println!("Out-of-order input sorted chronologically - PASS\n");

    println!("Test 5: Missing required columns are rejected");
    let err = parse_csv("date,value\n2024-01-01,5.0\n").expect_err("Expected column error");
    assert!(err.contains("consumption_kwh"), "Unexpected message: {}", err);
    println!("Missing consumption column rejected: \"{}\" - PASS\n", err);

    println!("Test 6: Bad rows are reported with their row number");
    let csv = "date,consumption_kwh\n2024-01-01,100.0\nnot-a-date,50.0\n";
    let err = parse_csv(csv).expect_err("Expected row error");
    assert!(err.contains("Row 3"), "Unexpected message: {}", err);
    println!("Malformed row reported: \"{}\" - PASS\n", err);

    println!("Test 7: Non-numeric consumption is rejected");
    let csv = "date,consumption_kwh\n2024-01-01,lots\n";
    assert!(parse_csv(csv).is_err());
    println!("Non-numeric value rejected - PASS\n");

    println!("Test 8: Empty input and header-only input are rejected");
    assert!(parse_csv("").is_err());
    assert!(parse_csv("date,consumption_kwh\n").is_err());
    println!("Empty inputs rejected - PASS\n");

    println!("Test 9: Quoted fields with embedded commas");
    let csv = "date,consumption_kwh,notes\n2024-01-01,77.0,\"cold, windy\"\n";
    let rows = parse_csv(csv).expect("Parse failed");
    assert!((rows[0].consumption_kwh - 77.0).abs() < 1e-9);
    println!("Quoted extra column ignored cleanly - PASS\n");

    println!("=== All loader tests passed ===");
}
