//! Canonical telemetry record as a typed tree.
//!
//! Every addressable field in a canonical record is a JSON object. Leaves carry
//! their reading under `value`; grouping nodes nest further fields under
//! `properties`. Any other key on a field (units, descriptions, source hints)
//! is metadata and survives a load/save cycle untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::constants::{ANOMALY_METADATA_KEYS, UNKNOWN_IDENTITY};

pub const VALUE_KEY: &str = "value";
pub const PROPERTIES_KEY: &str = "properties";

pub const READING_ID_PATH: [&str; 1] = ["readingId"];
pub const TIMESTAMP_PATH: [&str; 1] = ["timestamp"];
pub const INVERTER_ID_PATH: [&str; 2] = ["asset", "inverterId"];

/// One node of the record tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldNode {
    /// `{"value": .., ..metadata}`
    Leaf {
        value: Value,
        metadata: Map<String, Value>,
    },
    /// `{"properties": {..}, ..metadata}`, optionally with its own `value`
    Node {
        value: Option<Value>,
        properties: BTreeMap<String, FieldNode>,
        metadata: Map<String, Value>,
    },
    /// Anything else, carried through as-is.
    Raw(Value),
}

impl FieldNode {
    /// Child field `name`, only reachable through a `properties` container.
    pub fn child(&self, name: &str) -> Option<&FieldNode> {
        match self {
            FieldNode::Node { properties, .. } => properties.get(name),
            _ => None,
        }
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut FieldNode> {
        match self {
            FieldNode::Node { properties, .. } => properties.get_mut(name),
            _ => None,
        }
    }

    /// The node's own reading. JSON `null` reads as absent.
    pub fn value(&self) -> Option<&Value> {
        self.stored_value().filter(|v| !v.is_null())
    }

    /// The `value` key exactly as stored, so an explicit `null` is `Some`.
    pub fn stored_value(&self) -> Option<&Value> {
        match self {
            FieldNode::Leaf { value, .. } => Some(value),
            FieldNode::Node { value, .. } => value.as_ref(),
            FieldNode::Raw(_) => None,
        }
    }

    /// Overwrite the node's reading in place. Returns false when the node is
    /// not a JSON object and so cannot hold a `value`.
    fn assign(&mut self, new_value: Value) -> bool {
        match self {
            FieldNode::Leaf { value, .. } => {
                *value = new_value;
                true
            }
            FieldNode::Node { value, .. } => {
                *value = Some(new_value);
                true
            }
            FieldNode::Raw(Value::Object(map)) => {
                let metadata = std::mem::take(map);
                *self = FieldNode::Leaf {
                    value: new_value,
                    metadata,
                };
                true
            }
            FieldNode::Raw(_) => false,
        }
    }

    fn metadata_mut(&mut self) -> Option<&mut Map<String, Value>> {
        match self {
            FieldNode::Leaf { metadata, .. } | FieldNode::Node { metadata, .. } => Some(metadata),
            FieldNode::Raw(Value::Object(map)) => Some(map),
            FieldNode::Raw(_) => None,
        }
    }

    fn leaf_or_raw(mut map: Map<String, Value>) -> Self {
        match map.remove(VALUE_KEY) {
            Some(value) => FieldNode::Leaf {
                value,
                metadata: map,
            },
            None => FieldNode::Raw(Value::Object(map)),
        }
    }
}

impl From<Value> for FieldNode {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return FieldNode::Raw(value);
        };
        match map.remove(PROPERTIES_KEY) {
            Some(Value::Object(props)) => {
                let value = map.remove(VALUE_KEY);
                let properties = props
                    .into_iter()
                    .map(|(name, child)| (name, FieldNode::from(child)))
                    .collect();
                FieldNode::Node {
                    value,
                    properties,
                    metadata: map,
                }
            }
            Some(other) => {
                // `properties` that is not an object is just metadata
                map.insert(PROPERTIES_KEY.to_string(), other);
                FieldNode::leaf_or_raw(map)
            }
            None => FieldNode::leaf_or_raw(map),
        }
    }
}

impl From<FieldNode> for Value {
    fn from(node: FieldNode) -> Self {
        match node {
            FieldNode::Leaf {
                value,
                mut metadata,
            } => {
                metadata.insert(VALUE_KEY.to_string(), value);
                Value::Object(metadata)
            }
            FieldNode::Node {
                value,
                properties,
                mut metadata,
            } => {
                if let Some(value) = value {
                    metadata.insert(VALUE_KEY.to_string(), value);
                }
                let properties = properties
                    .into_iter()
                    .map(|(name, child)| (name, Value::from(child)))
                    .collect();
                metadata.insert(PROPERTIES_KEY.to_string(), Value::Object(properties));
                Value::Object(metadata)
            }
            FieldNode::Raw(value) => value,
        }
    }
}

fn node_at<'a>(root: &'a FieldNode, path: &[&str]) -> Option<&'a FieldNode> {
    path.iter().try_fold(root, |node, name| node.child(name))
}

/// Read the value at `path`. Missing intermediate segments resolve to nothing.
pub fn get<'a>(root: &'a FieldNode, path: &[&str]) -> Option<&'a Value> {
    node_at(root, path).and_then(FieldNode::value)
}

/// Like [`get`], but a field holding `"value": null` yields `Some(Null)`.
pub fn get_stored<'a>(root: &'a FieldNode, path: &[&str]) -> Option<&'a Value> {
    node_at(root, path).and_then(FieldNode::stored_value)
}

/// Write `value` at `path` if, and only if, the leaf already exists.
///
/// Never creates fields: an unresolved parent or an absent leaf is a no-op.
/// Returns whether the write happened.
pub fn set(root: &mut FieldNode, path: &[&str], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let mut node = root;
    for name in parents {
        node = match node.child_mut(name) {
            Some(next) => next,
            None => return false,
        };
    }
    match node.child_mut(last) {
        Some(leaf) => leaf.assign(value),
        None => false,
    }
}

/// Render an identity value as text. Empty strings, zero, booleans and null do
/// not identify anything.
pub fn identity_text(value: &Value) -> Option<String> {
    IdentityValue::from_json(value)?;
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// An identity value with its JSON type kept: `1` and `"1"` differ, `1` and
/// `1.0` do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityValue {
    Text(String),
    Integer(i128),
    /// Bit pattern of a non-integral float.
    Float(u64),
}

impl IdentityValue {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(IdentityValue::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return (i != 0).then_some(IdentityValue::Integer(i128::from(i)));
                }
                if let Some(u) = n.as_u64() {
                    return Some(IdentityValue::Integer(i128::from(u)));
                }
                let f = n.as_f64().filter(|f| f.is_finite() && *f != 0.0)?;
                if f.fract() == 0.0 && f.abs() < 1.0e38 {
                    Some(IdentityValue::Integer(f as i128))
                } else {
                    Some(IdentityValue::Float(f.to_bits()))
                }
            }
            _ => None,
        }
    }
}

/// `(readingId, timestamp)`: the uniqueness key of a reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadingKey {
    pub reading_id: IdentityValue,
    pub timestamp: IdentityValue,
}

/// Identity fields of a record, each one possibly missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingIdentity {
    pub reading_id: Option<String>,
    pub inverter_id: Option<String>,
    pub timestamp: Option<String>,
    reading_key: Option<ReadingKey>,
}

impl ReadingIdentity {
    pub fn is_complete(&self) -> bool {
        self.reading_id.is_some() && self.inverter_id.is_some() && self.timestamp.is_some()
    }

    /// Dedup key; only a complete identity has one.
    pub fn key(&self) -> Option<ReadingKey> {
        if !self.is_complete() {
            return None;
        }
        self.reading_key.clone()
    }

    /// readingId, else inverterId, else `UNKNOWN`.
    pub fn log_identity(&self) -> String {
        self.reading_id
            .clone()
            .or_else(|| self.inverter_id.clone())
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
    }
}

/// A canonical inverter reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    root: FieldNode,
}

impl Record {
    pub fn from_value(value: Value) -> Self {
        Self {
            root: FieldNode::from(value),
        }
    }

    pub fn into_value(self) -> Value {
        Value::from(self.root)
    }

    pub fn root(&self) -> &FieldNode {
        &self.root
    }

    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        get(&self.root, path)
    }

    pub fn get_stored(&self, path: &[&str]) -> Option<&Value> {
        get_stored(&self.root, path)
    }

    pub fn set(&mut self, path: &[&str], value: Value) -> bool {
        set(&mut self.root, path, value)
    }

    fn text_at(&self, path: &[&str]) -> Option<String> {
        self.get(path).and_then(identity_text)
    }

    pub fn identity(&self) -> ReadingIdentity {
        let typed = |path: &[&str]| self.get(path).and_then(IdentityValue::from_json);
        let reading_key = match (typed(&READING_ID_PATH), typed(&TIMESTAMP_PATH)) {
            (Some(reading_id), Some(timestamp)) => Some(ReadingKey {
                reading_id,
                timestamp,
            }),
            _ => None,
        };
        ReadingIdentity {
            reading_id: self.text_at(&READING_ID_PATH),
            inverter_id: self.text_at(&INVERTER_ID_PATH),
            timestamp: self.text_at(&TIMESTAMP_PATH),
            reading_key,
        }
    }

    pub fn log_identity(&self) -> String {
        self.identity().log_identity()
    }

    /// Drop legacy anomaly bookkeeping from the top level of the record.
    /// Returns whether anything was removed.
    pub fn strip_anomaly_metadata(&mut self) -> bool {
        let Some(metadata) = self.root.metadata_mut() else {
            return false;
        };
        let mut stripped = false;
        for key in ANOMALY_METADATA_KEYS {
            stripped |= metadata.remove(key).is_some();
        }
        stripped
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Record::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Record {
        Record::from_value(json!({
            "type": "object",
            "anomalyFlag": true,
            "properties": {
                "readingId": {"value": "R1"},
                "timestamp": {"value": "2024-05-01T10:00:00Z"},
                "asset": {
                    "properties": {
                        "inverterId": {"value": "INV-7", "source": "serial"}
                    }
                },
                "electrical": {
                    "properties": {
                        "acVoltage": {"value": 230, "unit": "V"},
                        "frequency": {"unit": "Hz"}
                    }
                }
            }
        }))
    }

    #[test]
    fn test_get_walks_nested_properties() {
        let record = sample();
        assert_eq!(record.get(&["electrical", "acVoltage"]), Some(&json!(230)));
        assert_eq!(record.get(&["asset", "inverterId"]), Some(&json!("INV-7")));
        assert_eq!(record.get(&["electrical", "missing"]), None);
        assert_eq!(record.get(&["nope", "acVoltage"]), None);
        // a leaf has no children
        assert_eq!(record.get(&["readingId", "deeper"]), None);
    }

    #[test]
    fn test_set_never_creates_fields() {
        let mut record = sample();
        assert!(!record.set(&["electrical", "acCurrent"], json!(5)));
        assert!(!record.set(&["thermal", "ambientTemp"], json!(20)));
        assert_eq!(record.get(&["electrical", "acCurrent"]), None);

        let value = record.clone().into_value();
        assert!(value["properties"].get("thermal").is_none());
        assert!(value["properties"]["electrical"]["properties"].get("acCurrent").is_none());
    }

    #[test]
    fn test_set_keeps_leaf_metadata() {
        let mut record = sample();
        assert!(record.set(&["electrical", "acVoltage"], json!(231)));

        let value = record.into_value();
        assert_eq!(
            value["properties"]["electrical"]["properties"]["acVoltage"],
            json!({"value": 231, "unit": "V"})
        );
    }

    #[test]
    fn test_set_on_existing_field_without_value() {
        let mut record = sample();
        assert_eq!(record.get(&["electrical", "frequency"]), None);
        assert!(record.set(&["electrical", "frequency"], json!(50.0)));
        assert_eq!(record.get(&["electrical", "frequency"]), Some(&json!(50.0)));
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let original = json!({
            "properties": {
                "readingId": {"value": "R1", "description": "id"},
                "notes": "free text",
                "power": {"value": null, "properties": {"acActive": {"value": 1200}}}
            },
            "$schema": "canonical"
        });
        let record = Record::from_value(original.clone());
        assert_eq!(record.into_value(), original);
    }

    #[test]
    fn test_null_value_reads_as_absent() {
        let record = Record::from_value(json!({
            "properties": {"power": {"properties": {"acActive": {"value": null}}}}
        }));
        assert_eq!(record.get(&["power", "acActive"]), None);
    }

    #[test]
    fn test_identity_extraction() {
        let identity = sample().identity();
        assert_eq!(identity.reading_id.as_deref(), Some("R1"));
        assert_eq!(identity.inverter_id.as_deref(), Some("INV-7"));
        assert!(identity.is_complete());
        assert_eq!(
            identity.key(),
            Some(ReadingKey {
                reading_id: IdentityValue::Text("R1".to_string()),
                timestamp: IdentityValue::Text("2024-05-01T10:00:00Z".to_string()),
            })
        );
    }

    #[test]
    fn test_log_identity_fallbacks() {
        let record = Record::from_value(json!({
            "properties": {"asset": {"properties": {"inverterId": {"value": "INV-2"}}}}
        }));
        assert_eq!(record.log_identity(), "INV-2");

        let record = Record::from_value(json!({"properties": {"readingId": {"value": ""}}}));
        assert_eq!(record.log_identity(), UNKNOWN_IDENTITY);
    }

    #[test]
    fn test_strip_anomaly_metadata() {
        let mut record = sample();
        assert!(record.strip_anomaly_metadata());
        assert!(!record.strip_anomaly_metadata());

        let value = record.into_value();
        assert!(value.get("anomalyFlag").is_none());
        assert_eq!(value["type"], json!("object"));
    }
}
