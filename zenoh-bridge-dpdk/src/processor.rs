//! Command/response processing: parse, flatten, derive, emit.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use dpdkscope_common::{Metric, MetricValue};

use crate::commands::{DPDK_MEASUREMENT, apply_derived_fields, split_instruction};
use crate::connector::Connector;
use crate::sink::MetricSink;

/// Errors for a single command/response exchange.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Socket-level failure or timeout; the connection is suspect.
    #[error("connector I/O failed: {0}")]
    Connector(#[from] std::io::Error),

    /// The response bytes are not valid JSON.
    #[error("response is not valid JSON: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The response carries no entry for the issued command.
    #[error("response has no entry for command '{0}'")]
    UnknownCommandKey(String),

    /// The entry for the issued command is not a JSON object.
    #[error("value under command '{0}' is not an object")]
    UnexpectedShape(String),
}

/// Decode one raw response and extract the object keyed by `command`.
///
/// The inner object may be empty. A non-object value under the command
/// key is rejected rather than reinterpreted.
pub fn parse_response(raw: &[u8], command: &str) -> Result<Map<String, Value>, ProcessError> {
    let payload: Value = serde_json::from_slice(raw)?;

    let Some(inner) = payload.get(command) else {
        return Err(ProcessError::UnknownCommandKey(command.to_string()));
    };

    match inner {
        Value::Object(object) => Ok(object.clone()),
        _ => Err(ProcessError::UnexpectedShape(command.to_string())),
    }
}

/// Flatten a one-level JSON object into typed field values.
///
/// Strings stay strings, numbers become `f64` regardless of whether the
/// source literal was integral, booleans stay booleans. The remote
/// interface produces only scalars at this level; anything else is
/// dropped with a warning.
pub fn flatten(inner: &Map<String, Value>) -> HashMap<String, MetricValue> {
    let mut fields = HashMap::with_capacity(inner.len());

    for (name, value) in inner {
        match value {
            Value::String(s) => {
                fields.insert(name.clone(), MetricValue::Text(s.clone()));
            }
            Value::Number(n) => match n.as_f64() {
                Some(f) => {
                    fields.insert(name.clone(), MetricValue::Float(f));
                }
                None => {
                    tracing::warn!(field = %name, "Numeric field does not fit in f64, dropping");
                }
            },
            Value::Bool(b) => {
                fields.insert(name.clone(), MetricValue::Boolean(*b));
            }
            Value::Null => {
                tracing::warn!(field = %name, "Null field in telemetry response, dropping");
            }
            Value::Array(_) | Value::Object(_) => {
                tracing::warn!(field = %name, "Non-scalar field in telemetry response, dropping");
            }
        }
    }

    fields
}

/// Issue one instruction and emit the resulting metric, if any.
///
/// The instruction is split into `(command, params)` on its first comma.
/// Connector failures propagate to the caller; parse failures are logged
/// and end the poll for this command only. A response whose field set is
/// empty after derivation emits nothing.
pub async fn process_command<C, S>(
    connector: &mut C,
    sink: &mut S,
    instruction: &str,
) -> Result<(), ProcessError>
where
    C: Connector,
    S: MetricSink,
{
    let (command, params) = split_instruction(instruction);

    let raw = connector.send(command, params).await?;

    let inner = match parse_response(&raw, command) {
        Ok(inner) => inner,
        Err(e) => {
            tracing::warn!(command = %command, error = %e, "Discarding telemetry response");
            return Ok(());
        }
    };

    let mut fields = flatten(&inner);
    apply_derived_fields(command, &mut fields);

    if fields.is_empty() {
        tracing::debug!(command = %command, "Response carried no fields, nothing to emit");
        return Ok(());
    }

    let metric = Metric::new(DPDK_MEASUREMENT)
        .with_tag("command", command)
        .with_tag("params", params)
        .with_fields(fields);

    sink.add_metric(metric).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ETHDEV_LINK_STATUS_COMMAND;
    use crate::sink::MemorySink;
    use std::io;

    /// Connector that replays a canned response for every command.
    struct StaticConnector {
        response: Vec<u8>,
    }

    impl StaticConnector {
        fn new(response: &str) -> Self {
            Self {
                response: response.as_bytes().to_vec(),
            }
        }
    }

    impl Connector for StaticConnector {
        async fn send(&mut self, _command: &str, _params: &str) -> io::Result<Vec<u8>> {
            Ok(self.response.clone())
        }
    }

    /// Connector whose socket is always broken.
    struct BrokenConnector;

    impl Connector for BrokenConnector {
        async fn send(&mut self, _command: &str, _params: &str) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
        }
    }

    async fn run(response: &str, instruction: &str) -> Vec<Metric> {
        let mut connector = StaticConnector::new(response);
        let mut sink = MemorySink::new();
        process_command(&mut connector, &mut sink, instruction)
            .await
            .expect("process_command failed");
        sink.take()
    }

    #[tokio::test]
    async fn test_link_status_down_derives_zero() {
        let metrics = run(
            r#"{"ethdev_link_status": {"status": "DOWN"}}"#,
            "ethdev_link_status,1",
        )
        .await;

        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];
        assert_eq!(metric.measurement, "dpdk");
        assert_eq!(
            metric.tags.get("command"),
            Some(&ETHDEV_LINK_STATUS_COMMAND.to_string())
        );
        assert_eq!(metric.tags.get("params"), Some(&"1".to_string()));
        assert_eq!(metric.fields.len(), 2);
        assert_eq!(
            metric.fields.get("status"),
            Some(&MetricValue::Text("DOWN".to_string()))
        );
        assert_eq!(metric.fields.get("status_i"), Some(&MetricValue::Integer(0)));
    }

    #[tokio::test]
    async fn test_link_status_up_derives_one() {
        let metrics = run(
            r#"{"ethdev_link_status": {"status": "UP"}}"#,
            "ethdev_link_status,1",
        )
        .await;

        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];
        assert_eq!(
            metric.fields.get("status"),
            Some(&MetricValue::Text("UP".to_string()))
        );
        assert_eq!(metric.fields.get("status_i"), Some(&MetricValue::Integer(1)));
    }

    #[tokio::test]
    async fn test_empty_response_emits_nothing() {
        let metrics = run(r#"{"ethdev_link_status": {}}"#, "ethdev_link_status,1").await;
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_fields_pass_through_without_derivation() {
        let metrics = run(
            r#"{"ethdev_link_status": {"tag1": 1}}"#,
            "ethdev_link_status,1",
        )
        .await;

        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];
        assert_eq!(metric.fields.len(), 1);
        assert_eq!(metric.fields.get("tag1"), Some(&MetricValue::Float(1.0)));
        assert!(metric.fields.get("status_i").is_none());
    }

    #[tokio::test]
    async fn test_unrecognized_status_value_keeps_source_field_only() {
        let metrics = run(
            r#"{"ethdev_link_status": {"status": "BOB"}}"#,
            "ethdev_link_status,1",
        )
        .await;

        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];
        assert_eq!(metric.fields.len(), 1);
        assert_eq!(
            metric.fields.get("status"),
            Some(&MetricValue::Text("BOB".to_string()))
        );
    }

    #[tokio::test]
    async fn test_instruction_without_params_tags_empty_string() {
        let metrics = run(r#"{"ethdev_list": {"count": 2}}"#, "ethdev_list").await;

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].tags.get("params"), Some(&"".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_swallowed_and_emits_nothing() {
        let metrics = run("this is not json", "ethdev_link_status,1").await;
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_missing_command_key_emits_nothing() {
        let metrics = run(r#"{"ethdev_stats": {"rx": 1}}"#, "ethdev_link_status,1").await;
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_value_is_rejected() {
        let metrics = run(r#"{"ethdev_link_status": "UP"}"#, "ethdev_link_status,1").await;
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_connector_error_propagates_and_emits_nothing() {
        let mut connector = BrokenConnector;
        let mut sink = MemorySink::new();

        let result = process_command(&mut connector, &mut sink, "ethdev_link_status,1").await;

        assert!(matches!(result, Err(ProcessError::Connector(_))));
        assert!(sink.metrics().is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = br#"{"ethdev_stats": {"rx_packets": 42, "status": "UP", "promiscuous": true}}"#;

        let first = flatten(&parse_response(raw, "ethdev_stats").unwrap());
        let second = flatten(&parse_response(raw, "ethdev_stats").unwrap());

        assert_eq!(first, second);
    }

    #[test]
    fn test_flatten_types_scalars() {
        let raw = br#"{"c": {"name": "eth0", "speed": 10000, "ratio": 0.5, "up": false}}"#;
        let fields = flatten(&parse_response(raw, "c").unwrap());

        assert_eq!(
            fields.get("name"),
            Some(&MetricValue::Text("eth0".to_string()))
        );
        // Integral literals still land as floats
        assert_eq!(fields.get("speed"), Some(&MetricValue::Float(10000.0)));
        assert_eq!(fields.get("ratio"), Some(&MetricValue::Float(0.5)));
        assert_eq!(fields.get("up"), Some(&MetricValue::Boolean(false)));
    }

    #[test]
    fn test_flatten_drops_non_scalars_and_nulls() {
        let raw = br#"{"c": {"nested": {"a": 1}, "list": [1, 2], "gone": null, "kept": 7}}"#;
        let fields = flatten(&parse_response(raw, "c").unwrap());

        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("kept"), Some(&MetricValue::Float(7.0)));
    }
}
