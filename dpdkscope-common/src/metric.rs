use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single metric record emitted by bridges.
///
/// Unlike a point-per-value model, a metric carries every field one
/// command/response exchange produced, so downstream consumers see the
/// response as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Measurement name (e.g. "dpdk").
    pub measurement: String,

    /// Unix epoch milliseconds when the poll was taken.
    pub timestamp: i64,

    /// Context tags (e.g. the issued command and its parameters).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,

    /// Field name to measured value.
    pub fields: HashMap<String, MetricValue>,
}

impl Metric {
    /// Create an empty metric with the current timestamp.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            timestamp: current_timestamp_millis(),
            tags: HashMap::new(),
            fields: HashMap::new(),
        }
    }

    /// Add a tag to this metric.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a single field to this metric.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Replace the field set of this metric.
    pub fn with_fields(mut self, fields: HashMap<String, MetricValue>) -> Self {
        self.fields = fields;
        self
    }

    /// A metric without fields carries no data and must not be emitted.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Typed scalar value of a metric field.
///
/// Consumers pattern-match on this instead of relying on runtime type
/// assertions against loosely decoded JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    /// Integer value (derived state fields).
    Integer(i64),

    /// Floating-point value. All numeric response fields land here,
    /// whether or not the source literal was integral.
    Float(f64),

    /// Text value.
    Text(String),

    /// Boolean value.
    Boolean(bool),
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Boolean(v)
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_creation() {
        let metric = Metric::new("dpdk")
            .with_tag("command", "ethdev_stats")
            .with_tag("params", "0")
            .with_field("rx_packets", 1024.0)
            .with_field("link_up", true);

        assert_eq!(metric.measurement, "dpdk");
        assert_eq!(metric.tags.get("command"), Some(&"ethdev_stats".to_string()));
        assert_eq!(metric.tags.get("params"), Some(&"0".to_string()));
        assert_eq!(
            metric.fields.get("rx_packets"),
            Some(&MetricValue::Float(1024.0))
        );
        assert_eq!(
            metric.fields.get("link_up"),
            Some(&MetricValue::Boolean(true))
        );
        assert!(!metric.is_empty());
    }

    #[test]
    fn test_empty_metric() {
        let metric = Metric::new("dpdk").with_tag("command", "ethdev_list");
        assert!(metric.is_empty());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(MetricValue::from(1i64), MetricValue::Integer(1));
        assert_eq!(MetricValue::from(2.5), MetricValue::Float(2.5));
        assert_eq!(
            MetricValue::from("UP"),
            MetricValue::Text("UP".to_string())
        );
        assert_eq!(MetricValue::from(false), MetricValue::Boolean(false));
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&MetricValue::Integer(1)).unwrap();
        assert_eq!(json, "1");

        let json = serde_json::to_string(&MetricValue::Text("DOWN".to_string())).unwrap();
        assert_eq!(json, "\"DOWN\"");

        let json = serde_json::to_string(&MetricValue::Float(3.5)).unwrap();
        assert_eq!(json, "3.5");
    }
}
