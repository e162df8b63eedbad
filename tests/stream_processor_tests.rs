mod common;

use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use solar_telemetry::infra::anomaly_log_adapter::FileAnomalyLog;
use solar_telemetry::pipeline::processing::quality_gate::RangeValidator;
use solar_telemetry::pipeline::processing::record::Record;
use solar_telemetry::pipeline::processing::stream_processor::InverterStreamProcessor;

fn reading(reading_id: &str, timestamp: &str, voltage: Value, frequency: Value) -> Record {
    common::reading_record(reading_id, timestamp, voltage, frequency)
}

fn setup() -> (TempDir, InverterStreamProcessor, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("anomalies_log.txt");
    let log = FileAnomalyLog::open(&log_path).unwrap();
    let processor = InverterStreamProcessor::new(RangeValidator::default(), Arc::new(log));
    (dir, processor, log_path)
}

fn log_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn out_of_range_voltage_takes_previous_reading() {
    let (_dir, mut processor, log_path) = setup();

    let a = processor
        .process(reading("R1", "2025-06-01T10:00:00Z", json!(230), json!(50.0)))
        .unwrap();
    assert_eq!(a.get(&["electrical", "acVoltage"]), Some(&json!(230)));

    let b = processor
        .process(reading("R2", "2025-06-01T10:05:00Z", json!(300), json!(50.0)))
        .unwrap();
    assert_eq!(b.get(&["electrical", "acVoltage"]), Some(&json!(230)));
    // units and other metadata survive the correction
    assert_eq!(
        b.clone().into_value()["properties"]["electrical"]["properties"]["acVoltage"]["unit"],
        json!("V")
    );

    assert_eq!(
        log_lines(&log_path),
        vec!["R2 - electrical.acVoltage value 300 out of range [215, 245], replaced with previous 230"]
    );
}

#[test]
fn duplicate_reading_is_logged_and_returned_unchanged() {
    let (_dir, mut processor, log_path) = setup();

    processor.process(reading("R1", "T1", json!(230), json!(50.0))).unwrap();
    let duplicate = reading("R1", "T1", json!(400), json!(80.0));
    let out = processor.process(duplicate.clone()).unwrap();

    assert_eq!(out, duplicate);
    assert_eq!(log_lines(&log_path), vec!["R1 - Duplicate reading, skipped"]);

    // The rejected duplicate must not become the fallback for the next reading
    let next = processor.process(reading("R2", "T2", json!(300), json!(50.0))).unwrap();
    assert_eq!(next.get(&["electrical", "acVoltage"]), Some(&json!(230)));
}

#[test]
fn missing_identity_is_keyed_unknown() {
    let (_dir, mut processor, log_path) = setup();

    let anonymous = Record::from_value(json!({
        "properties": {
            "electrical": {"properties": {"acVoltage": {"value": 999}}}
        }
    }));
    let out = processor.process(anonymous.clone()).unwrap();

    assert_eq!(out, anonymous);
    assert_eq!(
        log_lines(&log_path),
        vec!["UNKNOWN - Invalid reading: missing readingId, inverterId, or timestamp"]
    );
    assert!(processor.previous().is_none());
}

#[test]
fn missing_timestamp_is_keyed_by_inverter() {
    let (_dir, mut processor, log_path) = setup();

    let record = Record::from_value(json!({
        "properties": {
            "readingId": {"value": "R9"},
            "asset": {"properties": {"inverterId": {"value": "INV-7"}}}
        }
    }));
    processor.process(record).unwrap();

    assert_eq!(
        log_lines(&log_path),
        vec!["INV-7 - Invalid reading: missing readingId, inverterId, or timestamp"]
    );
}

#[test]
fn first_reading_keeps_its_own_bad_value() {
    let (_dir, mut processor, log_path) = setup();

    let out = processor
        .process(reading("R1", "T1", json!(300), json!(50.0)))
        .unwrap();

    assert_eq!(out.get(&["electrical", "acVoltage"]), Some(&json!(300)));
    assert_eq!(
        log_lines(&log_path),
        vec!["R1 - electrical.acVoltage value 300 out of range [215, 245], replaced with previous 300"]
    );
}

#[test]
fn in_range_values_pass_through_untouched() {
    let (_dir, mut processor, log_path) = setup();

    let input = reading("R1", "T1", json!(244.9), json!(50.02));
    let out = processor.process(input.clone()).unwrap();

    assert_eq!(out, input);
    assert!(log_lines(&log_path).is_empty());
}

#[test]
fn float_ranges_are_rendered_with_decimals() {
    let (_dir, mut processor, log_path) = setup();

    processor.process(reading("R1", "T1", json!(230), json!(50.0))).unwrap();
    processor.process(reading("R2", "T2", json!(230), json!(52.5))).unwrap();

    assert_eq!(
        log_lines(&log_path),
        vec!["R2 - electrical.frequency value 52.5 out of range [49.0, 51.0], replaced with previous 50.0"]
    );
}

#[test]
fn stream_keeps_length_and_order() {
    let (_dir, mut processor, _log_path) = setup();

    let input = vec![
        reading("R1", "T1", json!(230), json!(50.0)),
        reading("R2", "T2", json!(231), json!(50.0)),
        reading("R1", "T1", json!(232), json!(50.0)),
        reading("R3", "T3", json!(233), json!(50.0)),
    ];
    let output = processor.process_stream(input).unwrap();

    let ids: Vec<String> = output.iter().map(Record::log_identity).collect();
    assert_eq!(ids, vec!["R1", "R2", "R1", "R3"]);
    assert_eq!(processor.stats().processed, 3);
    assert_eq!(processor.stats().duplicates, 1);
}

#[test]
fn revalidating_a_corrected_record_changes_nothing() {
    let validator = RangeValidator::default();
    let previous = reading("R1", "T1", json!(230), json!(50.0));

    let first = validator.validate_record(
        reading("R2", "T2", json!(300), json!(60.0)),
        Some(&previous),
    );
    assert_eq!(first.corrected_fields, 2);

    let second = validator.validate_record(first.record.clone(), Some(&previous));
    assert_eq!(second.record, first.record);
    assert_eq!(second.corrected_fields, 0);
    assert!(second.anomalies.is_empty());
}

#[test]
fn log_is_appended_across_processors() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("logs").join("anomalies_log.txt");
    fs::create_dir_all(log_path.parent().unwrap()).unwrap();
    fs::write(&log_path, "earlier - kept\n").unwrap();

    for _ in 0..2 {
        let log = FileAnomalyLog::open(&log_path).unwrap();
        let mut processor = InverterStreamProcessor::new(RangeValidator::default(), Arc::new(log));
        processor.process(reading("R1", "T1", json!(230), json!(50.0))).unwrap();
        processor.process(reading("R1", "T1", json!(230), json!(50.0))).unwrap();
    }

    assert_eq!(
        log_lines(&log_path),
        vec![
            "earlier - kept",
            "R1 - Duplicate reading, skipped",
            "R1 - Duplicate reading, skipped"
        ]
    );
}

#[test]
fn null_previous_reading_is_carried_forward() {
    let (_dir, mut processor, log_path) = setup();

    processor.process(reading("R1", "T1", json!(null), json!(50.0))).unwrap();
    let out = processor.process(reading("R2", "T2", json!(300), json!(50.0))).unwrap();

    assert_eq!(out.get_stored(&["electrical", "acVoltage"]), Some(&json!(null)));
    assert_eq!(
        log_lines(&log_path),
        vec![
            "R1 - electrical.acVoltage value None out of range [215, 245], replaced with previous None",
            "R2 - electrical.acVoltage value 300 out of range [215, 245], replaced with previous None",
        ]
    );
}

#[test]
fn numeric_and_text_ids_are_distinct_readings() {
    let (_dir, mut processor, log_path) = setup();

    processor.process(reading_with_id(json!(1))).unwrap();
    processor.process(reading_with_id(json!("1"))).unwrap();
    assert!(log_lines(&log_path).is_empty());
    assert_eq!(processor.stats().processed, 2);

    processor.process(reading_with_id(json!(1.0))).unwrap();
    assert_eq!(log_lines(&log_path), vec!["1.0 - Duplicate reading, skipped"]);
}

fn reading_with_id(reading_id: Value) -> Record {
    let mut value = common::canonical_reading("placeholder", "T1", json!(230), json!(50.0));
    value["properties"]["readingId"]["value"] = reading_id;
    Record::from_value(value)
}
