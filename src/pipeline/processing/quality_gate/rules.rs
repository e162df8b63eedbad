use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TelemetryError};

/// A range bound exactly as it was written. Integers and floats are kept apart
/// so the audit log shows `[215, 245]` and `[49.0, 51.0]` rather than a
/// normalized float rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Int(i64),
    Float(f64),
}

impl Bound {
    pub fn as_f64(self) -> f64 {
        match self {
            Bound::Int(v) => v as f64,
            Bound::Float(v) => v,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Bound::Int(v) => write!(f, "{}", v),
            Bound::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Bound::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Inclusive `[min, max]` range for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub min: Bound,
    pub max: Bound,
}

impl RangeRule {
    pub fn new(min: Bound, max: Bound) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.as_f64() <= value && value <= self.max.as_f64()
    }
}

impl fmt::Display for RangeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// One configured rule: `section.field` must lie in `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub section: String,
    pub field: String,
    pub min: Bound,
    pub max: Bound,
}

#[derive(Debug, Clone, PartialEq)]
struct SectionRules {
    name: String,
    fields: Vec<(String, RangeRule)>,
}

/// Section → field → range, iterated in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    sections: Vec<SectionRules>,
}

impl RangeTable {
    pub fn empty() -> Self {
        Self { sections: Vec::new() }
    }

    /// Build a table from configured rules. A repeated `section.field`
    /// replaces the earlier range but keeps its position.
    pub fn from_rules<I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = ValidationRule>,
    {
        let mut table = Self::empty();
        for rule in rules {
            if rule.section.is_empty() || rule.field.is_empty() {
                return Err(TelemetryError::Config(
                    "validation rule needs a section and a field".to_string(),
                ));
            }
            let range = RangeRule::new(rule.min, rule.max);
            if !(range.min.as_f64() <= range.max.as_f64()) {
                return Err(TelemetryError::Config(format!(
                    "validation rule {}.{} has an empty range {}",
                    rule.section, rule.field, range
                )));
            }
            table.insert(&rule.section, &rule.field, range);
        }
        Ok(table)
    }

    fn insert(&mut self, section: &str, field: &str, range: RangeRule) {
        let index = match self.sections.iter().position(|s| s.name == section) {
            Some(index) => index,
            None => {
                self.sections.push(SectionRules {
                    name: section.to_string(),
                    fields: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        let fields = &mut self.sections[index].fields;
        match fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = range,
            None => fields.push((field.to_string(), range)),
        }
    }

    pub fn rule(&self, section: &str, field: &str) -> Option<&RangeRule> {
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, range)| range)
    }

    /// `(section, field, range)` in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &RangeRule)> + '_ {
        self.sections.iter().flat_map(|section| {
            section
                .fields
                .iter()
                .map(move |(field, range)| (section.name.as_str(), field.as_str(), range))
        })
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operating envelope of a single-phase string inverter on a 230 V / 50 Hz grid.
    pub fn solar_inverter_defaults() -> Self {
        use Bound::{Float, Int};

        let mut table = Self::empty();
        table.insert("power", "acActive", RangeRule::new(Int(0), Int(10000)));
        table.insert("power", "acReactive", RangeRule::new(Int(-5000), Int(5000)));
        table.insert("power", "powerFactor", RangeRule::new(Float(0.9), Float(1.05)));
        table.insert("electrical", "acVoltage", RangeRule::new(Int(215), Int(245)));
        table.insert("electrical", "acCurrent", RangeRule::new(Int(0), Int(20)));
        table.insert("electrical", "frequency", RangeRule::new(Float(49.0), Float(51.0)));
        table.insert("energy", "today", RangeRule::new(Int(0), Int(200)));
        table.insert("energy", "lifetime", RangeRule::new(Int(0), Int(100000)));
        table.insert("thermal", "inverterTemp1", RangeRule::new(Int(-20), Int(80)));
        table.insert("thermal", "ambientTemp", RangeRule::new(Int(-10), Int(60)));
        table.insert("runtime", "todayHours", RangeRule::new(Int(0), Int(24)));
        table.insert("safety", "insulationResistance", RangeRule::new(Int(100), Int(100000)));
        table.insert("safety", "groundLeakageCurrent", RangeRule::new(Int(0), Int(100)));
        table
    }
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::solar_inverter_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_render_as_written() {
        let table = RangeTable::default();
        assert_eq!(table.rule("electrical", "acVoltage").unwrap().to_string(), "[215, 245]");
        assert_eq!(table.rule("electrical", "frequency").unwrap().to_string(), "[49.0, 51.0]");
        assert_eq!(table.rule("power", "powerFactor").unwrap().to_string(), "[0.9, 1.05]");
        assert_eq!(table.rule("power", "acReactive").unwrap().to_string(), "[-5000, 5000]");
    }

    #[test]
    fn test_default_table_order_is_stable() {
        let table = RangeTable::default();
        assert_eq!(table.len(), 13);

        let order: Vec<String> = table.iter().map(|(s, f, _)| format!("{}.{}", s, f)).collect();
        assert_eq!(order.first().map(String::as_str), Some("power.acActive"));
        assert_eq!(order.last().map(String::as_str), Some("safety.groundLeakageCurrent"));
        assert_eq!(order[3], "electrical.acVoltage");
    }

    #[test]
    fn test_range_is_inclusive() {
        let rule = RangeRule::new(Bound::Int(215), Bound::Int(245));
        assert!(rule.contains(215.0));
        assert!(rule.contains(245.0));
        assert!(!rule.contains(245.01));
        assert!(!rule.contains(f64::NAN));
    }

    #[test]
    fn test_from_rules_replaces_in_place() {
        let rules = vec![
            ValidationRule {
                section: "electrical".into(),
                field: "acVoltage".into(),
                min: Bound::Int(215),
                max: Bound::Int(245),
            },
            ValidationRule {
                section: "thermal".into(),
                field: "ambientTemp".into(),
                min: Bound::Int(-10),
                max: Bound::Int(60),
            },
            ValidationRule {
                section: "electrical".into(),
                field: "acVoltage".into(),
                min: Bound::Int(200),
                max: Bound::Int(250),
            },
        ];
        let table = RangeTable::from_rules(rules).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rule("electrical", "acVoltage").unwrap().to_string(), "[200, 250]");
        assert_eq!(table.iter().next().map(|(s, _, _)| s), Some("electrical"));
    }

    #[test]
    fn test_from_rules_rejects_inverted_range() {
        let rules = vec![ValidationRule {
            section: "energy".into(),
            field: "today".into(),
            min: Bound::Int(10),
            max: Bound::Int(1),
        }];
        assert!(matches!(RangeTable::from_rules(rules), Err(TelemetryError::Config(_))));
    }
}
