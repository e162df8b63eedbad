#![allow(dead_code)]

use serde_json::{json, Value};

use solar_telemetry::pipeline::processing::record::Record;

/// A canonical reading with every ruled field in range, except the two under
/// test.
pub fn canonical_reading(reading_id: &str, timestamp: &str, voltage: Value, frequency: Value) -> Value {
    json!({
        "properties": {
            "readingId": {"value": reading_id},
            "timestamp": {"value": timestamp},
            "asset": {"properties": {
                "inverterId": {"value": "INV-7"},
                "siteId": {"value": "SITE-1"}
            }},
            "power": {"properties": {
                "acActive": {"unit": "W", "value": 1800},
                "acReactive": {"unit": "var", "value": 120},
                "powerFactor": {"value": 0.99}
            }},
            "electrical": {"properties": {
                "acVoltage": {"unit": "V", "value": voltage},
                "acCurrent": {"unit": "A", "value": 8.2},
                "frequency": {"unit": "Hz", "value": frequency}
            }},
            "energy": {"properties": {
                "today": {"unit": "kWh", "value": 12.5},
                "lifetime": {"unit": "kWh", "value": 5400}
            }},
            "thermal": {"properties": {
                "inverterTemp1": {"unit": "degC", "value": 41},
                "ambientTemp": {"unit": "degC", "value": 24}
            }},
            "runtime": {"properties": {
                "todayHours": {"unit": "h", "value": 6.5}
            }},
            "safety": {"properties": {
                "insulationResistance": {"unit": "kOhm", "value": 2000},
                "groundLeakageCurrent": {"unit": "mA", "value": 12}
            }}
        }
    })
}

pub fn reading_record(reading_id: &str, timestamp: &str, voltage: Value, frequency: Value) -> Record {
    Record::from_value(canonical_reading(reading_id, timestamp, voltage, frequency))
}
