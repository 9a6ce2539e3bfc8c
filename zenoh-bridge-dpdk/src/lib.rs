//! Zenoh bridge for DPDK telemetry.
//!
//! This bridge polls the telemetry socket exposed by a DPDK application,
//! issues named commands, and publishes the JSON responses to Zenoh as
//! structured metrics.
//!
//! # Key Expressions
//!
//! ```text
//! dpdkscope/dpdk/<device>/<command>
//! ```
//!
//! Where:
//! - `<device>` - Device name from configuration
//! - `<command>` - The issued telemetry command (e.g. `ethdev_link_status`)

pub mod commands;
pub mod config;
pub mod connector;
pub mod poller;
pub mod processor;
pub mod sink;

pub use config::DpdkBridgeConfig;
pub use connector::{Connector, DpdkConnector};
pub use poller::DpdkPoller;
pub use processor::{ProcessError, process_command};
pub use sink::{MemorySink, MetricSink, ZenohSink};
