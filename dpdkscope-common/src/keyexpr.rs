/// Default key expression prefix for all dpdkscope telemetry.
pub const KEY_PREFIX: &str = "dpdkscope";

/// Default prefix used by the DPDK bridge.
pub const DPDK_KEY_PREFIX: &str = "dpdkscope/dpdk";

/// Builder for constructing dpdkscope key expressions.
///
/// Key expressions follow the pattern:
/// `dpdkscope/dpdk/<source>/<metric_path>`
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    prefix: String,
}

impl KeyExprBuilder {
    /// Create a builder using the default DPDK prefix.
    pub fn new() -> Self {
        Self {
            prefix: DPDK_KEY_PREFIX.to_string(),
        }
    }

    /// Create a builder with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Build a key expression for a specific source and metric.
    ///
    /// # Example
    /// ```
    /// use dpdkscope_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::new();
    /// let key = builder.build("fwd0", "ethdev_link_status");
    /// assert_eq!(key, "dpdkscope/dpdk/fwd0/ethdev_link_status");
    /// ```
    pub fn build(&self, source: &str, metric: &str) -> String {
        format!("{}/{}/{}", self.prefix, source, metric)
    }

    /// Build a wildcard key expression for all metrics from a source.
    ///
    /// # Example
    /// ```
    /// use dpdkscope_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::new();
    /// assert_eq!(builder.source_wildcard("fwd0"), "dpdkscope/dpdk/fwd0/**");
    /// ```
    pub fn source_wildcard(&self, source: &str) -> String {
        format!("{}/{}/**", self.prefix, source)
    }

    /// Build a wildcard key expression for every metric under this prefix.
    pub fn prefix_wildcard(&self) -> String {
        format!("{}/**", self.prefix)
    }
}

impl Default for KeyExprBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a wildcard key expression for all dpdkscope telemetry.
///
/// # Example
/// ```
/// use dpdkscope_common::keyexpr::all_telemetry_wildcard;
///
/// assert_eq!(all_telemetry_wildcard(), "dpdkscope/**");
/// ```
pub fn all_telemetry_wildcard() -> String {
    format!("{}/**", KEY_PREFIX)
}
