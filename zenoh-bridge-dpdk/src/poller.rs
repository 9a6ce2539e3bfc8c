//! Per-device polling loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use dpdkscope_common::Format;

use crate::config::{CommandGroup, DeviceConfig};
use crate::connector::DpdkConnector;
use crate::processor::process_command;
use crate::sink::ZenohSink;

/// Poller for a single DPDK telemetry socket.
///
/// Instructions are issued strictly one at a time; the telemetry protocol
/// allows one outstanding command per connection.
pub struct DpdkPoller {
    device: DeviceConfig,
    instructions: Vec<String>,
    connector: DpdkConnector,
    sink: ZenohSink,
}

impl DpdkPoller {
    /// Create a new poller for a device.
    pub fn new(
        device: DeviceConfig,
        session: Arc<zenoh::Session>,
        key_prefix: &str,
        command_groups: &HashMap<String, CommandGroup>,
        format: Format,
    ) -> Self {
        let instructions = device.all_commands(command_groups);
        let connector = DpdkConnector::new(
            device.socket_path.clone(),
            Duration::from_millis(device.timeout_ms),
        );
        let sink = ZenohSink::new(session, key_prefix, device.name.clone(), format);

        Self {
            device,
            instructions,
            connector,
            sink,
        }
    }

    /// Run the polling loop.
    pub async fn run(mut self) {
        let mut ticker = interval(Duration::from_secs(self.device.poll_interval_secs));

        tracing::info!(
            device = %self.device.name,
            socket = %self.device.socket_path,
            interval_secs = self.device.poll_interval_secs,
            commands = self.instructions.len(),
            "Starting DPDK poller"
        );

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Perform a single poll cycle.
    async fn poll_once(&mut self) {
        for instruction in &self.instructions {
            if let Err(e) =
                process_command(&mut self.connector, &mut self.sink, instruction).await
            {
                // The connection is suspect; skip the rest of this cycle
                // and reconnect on the next one.
                tracing::warn!(
                    device = %self.device.name,
                    instruction = %instruction,
                    error = %e,
                    "Telemetry poll failed, abandoning cycle"
                );
                break;
            }
        }
    }
}
