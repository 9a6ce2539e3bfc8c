use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use dpdkscope_common::{Format, LoggingConfig, ZenohConfig};

use crate::commands::split_instruction;

/// Root configuration for the DPDK bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpdkBridgeConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Serialization format for published metrics.
    #[serde(default)]
    pub serialization: Format,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// DPDK-specific settings.
    pub dpdk: DpdkConfig,
}

/// DPDK-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpdkConfig {
    /// Key expression prefix (default: "dpdkscope/dpdk").
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Devices to poll.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    /// Predefined command groups (reusable across devices).
    #[serde(default)]
    pub command_groups: HashMap<String, CommandGroup>,
}

fn default_key_prefix() -> String {
    dpdkscope_common::DPDK_KEY_PREFIX.to_string()
}

/// Configuration for a single DPDK telemetry socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name (used in key expressions).
    pub name: String,

    /// Path to the telemetry unix socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Polling interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout for a single socket operation, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Command instructions to issue each cycle, "<command>[,<params>]".
    #[serde(default)]
    pub commands: Vec<String>,

    /// Reference to a predefined command group.
    #[serde(default)]
    pub command_group: Option<String>,
}

fn default_socket_path() -> String {
    "/var/run/dpdk/rte/dpdk_telemetry.v2".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_timeout_ms() -> u64 {
    500
}

/// A group of command instructions that can be referenced by devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandGroup {
    /// Command instructions, "<command>[,<params>]".
    #[serde(default)]
    pub commands: Vec<String>,
}

impl DpdkBridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load(path: impl AsRef<Path>) -> dpdkscope_common::Result<Self> {
        dpdkscope_common::load_config(path)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> dpdkscope_common::Result<Self> {
        dpdkscope_common::parse_config(content)
    }

    /// Validate the loaded configuration.
    pub fn validate(&self) -> dpdkscope_common::Result<()> {
        for device in &self.dpdk.devices {
            if device.name.is_empty() {
                return Err(dpdkscope_common::Error::Config(
                    "Device name cannot be empty".to_string(),
                ));
            }
            if device.socket_path.is_empty() {
                return Err(dpdkscope_common::Error::Config(format!(
                    "Device '{}' has no socket path",
                    device.name
                )));
            }
            if let Some(group) = &device.command_group
                && !self.dpdk.command_groups.contains_key(group)
            {
                return Err(dpdkscope_common::Error::Config(format!(
                    "Device '{}' references unknown command group '{}'",
                    device.name, group
                )));
            }

            let instructions = device.all_commands(&self.dpdk.command_groups);
            if instructions.is_empty() {
                return Err(dpdkscope_common::Error::Config(format!(
                    "Device '{}' has no commands to poll",
                    device.name
                )));
            }
            for instruction in &instructions {
                let (command, _) = split_instruction(instruction);
                if command.is_empty() {
                    return Err(dpdkscope_common::Error::Config(format!(
                        "Device '{}' has an instruction with an empty command: '{}'",
                        device.name, instruction
                    )));
                }
            }
        }
        Ok(())
    }
}

impl DeviceConfig {
    /// Get all command instructions to poll (including from the referenced group).
    pub fn all_commands(&self, groups: &HashMap<String, CommandGroup>) -> Vec<String> {
        let mut commands = self.commands.clone();

        if let Some(group_name) = &self.command_group
            && let Some(group) = groups.get(group_name)
        {
            commands.extend(group.commands.clone());
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json5 = r#"
        {
            zenoh: {
                mode: "peer",
            },
            serialization: "json",
            dpdk: {
                key_prefix: "dpdkscope/dpdk",
                devices: [
                    {
                        name: "fwd0",
                        socket_path: "/var/run/dpdk/fwd0/dpdk_telemetry.v2",
                        poll_interval_secs: 10,
                        commands: ["ethdev_link_status,0", "ethdev_stats,0"],
                    },
                ],
                command_groups: {
                    ethdev_basics: {
                        commands: ["ethdev_link_status,0", "ethdev_xstats,0"],
                    },
                },
            },
            logging: { level: "info" },
        }
        "#;

        let config = DpdkBridgeConfig::parse(json5).unwrap();

        assert_eq!(config.zenoh.mode, "peer");
        assert_eq!(config.serialization, Format::Json);
        assert_eq!(config.dpdk.devices.len(), 1);
        assert_eq!(config.dpdk.devices[0].name, "fwd0");
        assert_eq!(config.dpdk.devices[0].poll_interval_secs, 10);
        assert_eq!(config.dpdk.command_groups.len(), 1);
        assert!(config.dpdk.command_groups.contains_key("ethdev_basics"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_device_defaults() {
        let json5 = r#"
        {
            dpdk: {
                devices: [
                    { name: "fwd0", commands: ["ethdev_list"] },
                ],
            },
        }
        "#;

        let config = DpdkBridgeConfig::parse(json5).unwrap();
        let device = &config.dpdk.devices[0];

        assert_eq!(device.socket_path, "/var/run/dpdk/rte/dpdk_telemetry.v2");
        assert_eq!(device.poll_interval_secs, 30);
        assert_eq!(device.timeout_ms, 500);
        assert_eq!(config.dpdk.key_prefix, "dpdkscope/dpdk");
    }

    #[test]
    fn test_device_all_commands() {
        let mut groups = HashMap::new();
        groups.insert(
            "ethdev_basics".to_string(),
            CommandGroup {
                commands: vec!["ethdev_xstats,0".to_string()],
            },
        );

        let device = DeviceConfig {
            name: "fwd0".to_string(),
            socket_path: default_socket_path(),
            poll_interval_secs: 30,
            timeout_ms: 500,
            commands: vec!["ethdev_link_status,0".to_string()],
            command_group: Some("ethdev_basics".to_string()),
        };

        let all = device.all_commands(&groups);
        assert_eq!(
            all,
            vec![
                "ethdev_link_status,0".to_string(),
                "ethdev_xstats,0".to_string()
            ]
        );
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let json5 = r#"
        {
            dpdk: {
                devices: [
                    { name: "fwd0", commands: [",1"] },
                ],
            },
        }
        "#;

        let config = DpdkBridgeConfig::parse(json5).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_device_without_commands() {
        let json5 = r#"
        {
            dpdk: {
                devices: [
                    { name: "fwd0" },
                ],
            },
        }
        "#;

        let config = DpdkBridgeConfig::parse(json5).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_group() {
        let json5 = r#"
        {
            dpdk: {
                devices: [
                    { name: "fwd0", command_group: "nope" },
                ],
            },
        }
        "#;

        let config = DpdkBridgeConfig::parse(json5).unwrap();
        assert!(config.validate().is_err());
    }
}
