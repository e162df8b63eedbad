//! Per-field range validation with last-known-good recovery.
//!
//! Each ruled field of a reading is compared against its inclusive range. A
//! value that is missing, non-numeric or out of range is replaced by the same
//! field of the previously accepted reading, and an anomaly note describing the
//! substitution is produced for the audit log.

pub mod rules;

use serde_json::Value;
use std::sync::Arc;

use crate::pipeline::processing::record::Record;
pub use rules::{Bound, RangeRule, RangeTable, ValidationRule};

/// Outcome of checking one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCheck {
    /// The value the field should hold after validation.
    pub value: Option<Value>,
    /// Set when the current value was rejected.
    pub anomaly: Option<String>,
}

impl FieldCheck {
    fn pass(value: Option<&Value>) -> Self {
        Self {
            value: value.cloned(),
            anomaly: None,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        self.anomaly.is_some()
    }
}

/// A record after range validation plus the notes describing what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub record: Record,
    pub anomalies: Vec<String>,
    /// Fields whose stored value was actually rewritten.
    pub corrected_fields: usize,
}

/// Render a reading the way the anomaly log has always shown it.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Range validator over a shared rule table.
#[derive(Debug, Clone)]
pub struct RangeValidator {
    table: Arc<RangeTable>,
}

impl RangeValidator {
    pub fn new(table: RangeTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &RangeTable {
        &self.table
    }

    /// Check one field against its rule.
    ///
    /// Fields without a rule pass through untouched. Otherwise a missing,
    /// non-numeric or out-of-range `current` is replaced by `fallback`.
    pub fn validate_field(
        &self,
        section: &str,
        field: &str,
        current: Option<&Value>,
        fallback: Option<&Value>,
    ) -> FieldCheck {
        let Some(rule) = self.table.rule(section, field) else {
            return FieldCheck::pass(current);
        };

        let in_range = current
            .and_then(Value::as_f64)
            .map_or(false, |v| rule.contains(v));
        if in_range {
            return FieldCheck::pass(current);
        }

        FieldCheck {
            value: fallback.cloned(),
            anomaly: Some(format!(
                "{}.{} value {} out of range {}, replaced with previous {}",
                section,
                field,
                display_value(current),
                rule,
                display_value(fallback)
            )),
        }
    }

    /// Validate every ruled field of `record`, falling back to `previous`.
    ///
    /// With no previous value for a field the current value is its own
    /// fallback, so the first reading of a stream is kept as received.
    pub fn validate_record(&self, mut record: Record, previous: Option<&Record>) -> ValidatedRecord {
        let mut anomalies = Vec::new();
        let mut corrected_fields = 0;

        for (section, field, _) in self.table.iter() {
            let path = [section, field];
            let current = record.get(&path).cloned();
            // An explicit `null` in the previous reading is still its value
            let fallback = previous
                .and_then(|prev| prev.get_stored(&path))
                .cloned()
                .or_else(|| current.clone());

            let check = self.validate_field(section, field, current.as_ref(), fallback.as_ref());
            let Some(anomaly) = check.anomaly else {
                continue;
            };
            anomalies.push(anomaly);

            // Nothing to write when neither reading exists
            if let Some(value) = check.value {
                if record.get_stored(&path) != Some(&value) && record.set(&path, value) {
                    corrected_fields += 1;
                }
            }
        }

        ValidatedRecord {
            record,
            anomalies,
            corrected_fields,
        }
    }
}

impl Default for RangeValidator {
    fn default() -> Self {
        Self::new(RangeTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(voltage: Value, frequency: Value) -> Record {
        Record::from_value(json!({
            "properties": {
                "readingId": {"value": "R1"},
                "timestamp": {"value": "T1"},
                "electrical": {
                    "properties": {
                        "acVoltage": {"value": voltage},
                        "frequency": {"value": frequency}
                    }
                }
            }
        }))
    }

    #[test]
    fn test_in_range_value_passes() {
        let validator = RangeValidator::default();
        let check = validator.validate_field("electrical", "acVoltage", Some(&json!(230)), Some(&json!(225)));
        assert_eq!(check.value, Some(json!(230)));
        assert!(!check.is_anomalous());
    }

    #[test]
    fn test_out_of_range_uses_fallback() {
        let validator = RangeValidator::default();
        let check = validator.validate_field("electrical", "acVoltage", Some(&json!(300)), Some(&json!(230)));
        assert_eq!(check.value, Some(json!(230)));
        assert_eq!(
            check.anomaly.as_deref(),
            Some("electrical.acVoltage value 300 out of range [215, 245], replaced with previous 230")
        );
    }

    #[test]
    fn test_missing_value_is_anomalous() {
        let validator = RangeValidator::default();
        let check = validator.validate_field("electrical", "frequency", None, Some(&json!(50.0)));
        assert_eq!(check.value, Some(json!(50.0)));
        assert_eq!(
            check.anomaly.as_deref(),
            Some("electrical.frequency value None out of range [49.0, 51.0], replaced with previous 50.0")
        );
    }

    #[test]
    fn test_non_numeric_value_is_anomalous() {
        let validator = RangeValidator::default();
        let check = validator.validate_field("thermal", "ambientTemp", Some(&json!("hot")), Some(&json!(21)));
        assert_eq!(check.value, Some(json!(21)));
        assert!(check.anomaly.unwrap().contains("value hot out of range"));
    }

    #[test]
    fn test_unruled_field_passes_through() {
        let validator = RangeValidator::default();
        let check = validator.validate_field("electrical", "dcVoltage", Some(&json!(9999)), None);
        assert_eq!(check.value, Some(json!(9999)));
        assert!(check.anomaly.is_none());
    }

    #[test]
    fn test_validate_record_substitutes_previous() {
        let validator = RangeValidator::default();
        let previous = reading(json!(230), json!(50.0));
        let validated = validator.validate_record(reading(json!(300), json!(50.1)), Some(&previous));

        assert_eq!(validated.record.get(&["electrical", "acVoltage"]), Some(&json!(230)));
        assert_eq!(validated.record.get(&["electrical", "frequency"]), Some(&json!(50.1)));
        assert_eq!(validated.corrected_fields, 1);
        // acVoltage plus every ruled field the reading does not carry
        assert!(validated.anomalies.iter().any(|a| a.starts_with("electrical.acVoltage value 300")));
    }

    #[test]
    fn test_first_record_keeps_its_own_value() {
        let validator = RangeValidator::default();
        let validated = validator.validate_record(reading(json!(300), json!(50.0)), None);

        assert_eq!(validated.record.get(&["electrical", "acVoltage"]), Some(&json!(300)));
        assert_eq!(validated.corrected_fields, 0);
        assert!(validated
            .anomalies
            .contains(&"electrical.acVoltage value 300 out of range [215, 245], replaced with previous 300".to_string()));
    }

    #[test]
    fn test_absent_fields_are_not_created() {
        let validator = RangeValidator::default();
        let validated = validator.validate_record(reading(json!(230), json!(50.0)), None);
        let value = validated.record.into_value();
        assert!(value["properties"].get("power").is_none());
        assert!(value["properties"].get("safety").is_none());
    }

    #[test]
    fn test_revalidation_changes_nothing() {
        let validator = RangeValidator::default();
        let previous = reading(json!(230), json!(50.0));
        let once = validator.validate_record(reading(json!(300), json!(52.0)), Some(&previous));
        let twice = validator.validate_record(once.record.clone(), Some(&previous));
        assert_eq!(twice.record, once.record);
        assert_eq!(twice.corrected_fields, 0);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(None), "None");
        assert_eq!(display_value(Some(&json!(49.0))), "49.0");
        assert_eq!(display_value(Some(&json!("abc"))), "abc");
        assert_eq!(display_value(Some(&json!(true))), "True");
    }

    #[test]
    fn test_null_in_previous_is_substituted() {
        let validator = RangeValidator::default();
        let previous = reading(json!(null), json!(50.0));
        let validated = validator.validate_record(reading(json!(300), json!(50.0)), Some(&previous));

        assert_eq!(validated.record.get_stored(&["electrical", "acVoltage"]), Some(&json!(null)));
        assert_eq!(validated.corrected_fields, 1);
        assert!(validated.anomalies.contains(
            &"electrical.acVoltage value 300 out of range [215, 245], replaced with previous None".to_string()
        ));

        // Already null: logged again, nothing rewritten
        let again = validator.validate_record(validated.record.clone(), Some(&previous));
        assert_eq!(again.record, validated.record);
        assert_eq!(again.corrected_fields, 0);
    }

    #[test]
    fn test_boolean_value_is_anomalous() {
        let validator = RangeValidator::default();
        let check = validator.validate_field("power", "acActive", Some(&json!(true)), Some(&json!(1500)));
        assert_eq!(check.value, Some(json!(1500)));
        assert_eq!(
            check.anomaly.as_deref(),
            Some("power.acActive value True out of range [0, 10000], replaced with previous 1500")
        );
    }
}
