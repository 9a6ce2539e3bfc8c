//! Command instructions and command-specific derived fields.

use std::collections::HashMap;

use dpdkscope_common::MetricValue;

/// Measurement name for every metric this bridge produces.
pub const DPDK_MEASUREMENT: &str = "dpdk";

/// Command reporting the link state of an ethernet device.
pub const ETHDEV_LINK_STATUS_COMMAND: &str = "ethdev_link_status";

/// Textual link-state field as reported by the runtime.
pub const LINK_STATUS_STRING_FIELD: &str = "status";

/// Numeric link-state field derived by this bridge.
pub const LINK_STATUS_INTEGER_FIELD: &str = "status_i";

/// Split a raw instruction into `(command, params)` on the first comma.
///
/// The params remainder is opaque and may itself contain commas; it is
/// forwarded verbatim to the connector and the `params` tag.
pub fn split_instruction(raw: &str) -> (&str, &str) {
    match raw.split_once(',') {
        Some((command, params)) => (command, params),
        None => (raw, ""),
    }
}

/// A rule deriving an additional field from an existing string field.
///
/// Rules are keyed by command; adding a tuple to [`DERIVED_FIELD_RULES`]
/// extends the bridge without touching the processor.
#[derive(Debug)]
pub struct DerivedFieldRule {
    /// Command whose responses this rule applies to.
    pub command: &'static str,
    /// Field holding the string value to translate.
    pub source_field: &'static str,
    /// Name of the derived integer field.
    pub output_field: &'static str,
    /// Recognized string values and their translations.
    pub mapping: &'static [(&'static str, i64)],
}

impl DerivedFieldRule {
    /// Apply this rule to a flattened field set.
    ///
    /// The source field is never removed. A missing source field, a
    /// non-string value, or an unrecognized string all leave the field
    /// set untouched.
    fn apply(&self, fields: &mut HashMap<String, MetricValue>) {
        let Some(MetricValue::Text(value)) = fields.get(self.source_field) else {
            return;
        };
        let Some(&(_, derived)) = self
            .mapping
            .iter()
            .find(|(known, _)| *known == value.as_str())
        else {
            return;
        };
        fields.insert(self.output_field.to_string(), MetricValue::Integer(derived));
    }
}

/// Read-only rule table, safe for concurrent reads from all pollers.
static DERIVED_FIELD_RULES: &[DerivedFieldRule] = &[DerivedFieldRule {
    command: ETHDEV_LINK_STATUS_COMMAND,
    source_field: LINK_STATUS_STRING_FIELD,
    output_field: LINK_STATUS_INTEGER_FIELD,
    mapping: &[("UP", 1), ("DOWN", 0)],
}];

/// Apply every derived-field rule registered for `command`.
pub fn apply_derived_fields(command: &str, fields: &mut HashMap<String, MetricValue>) {
    for rule in DERIVED_FIELD_RULES
        .iter()
        .filter(|rule| rule.command == command)
    {
        rule.apply(fields);
    }
}
