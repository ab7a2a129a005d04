use std::collections::HashSet;

use log::error;
use serde_derive::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub name: Option<String>,
    #[serde(rename = "ipAddress", alias = "ip_address")]
    pub ip_address: Option<String>,
    pub devices: Option<Vec<DeviceConfig>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub publisher_id: Option<String>,
    pub topic_path: Option<String>,
    pub keep_alive_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: Option<String>,
    #[serde(rename = "ipAddress", alias = "ip_address")]
    pub ip_address: Option<String>,
}

#[cfg(test)]
impl DeviceConfig {
    pub fn new(name: Option<&str>, ip_address: Option<&str>) -> Self {
        DeviceConfig {
            name: name.map(str::to_string),
            ip_address: ip_address.map(str::to_string),
        }
    }
}

/// Device records as they appear in the configuration file.
#[derive(Debug, Clone)]
pub enum RawDevices {
    /// A single device configured at the top level.
    Legacy(DeviceConfig),
    List(Vec<DeviceConfig>),
}

impl AppConfig {
    pub fn raw_devices(&self) -> RawDevices {
        match &self.devices {
            Some(devices) => RawDevices::List(devices.clone()),
            None => RawDevices::Legacy(DeviceConfig {
                name: self.name.clone(),
                ip_address: self.ip_address.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigDiagnostic {
    DuplicateName { device: usize },
    MissingAddress { device: Option<usize> },
}

impl std::fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigDiagnostic::DuplicateName { device } => {
                write!(f, "Duplicate name at device {device}.")
            }
            ConfigDiagnostic::MissingAddress { device: None } => write!(f, "IP address not set."),
            ConfigDiagnostic::MissingAddress {
                device: Some(device),
            } => write!(f, "IP address not set at device {device}."),
        }
    }
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub devices: Vec<DeviceConfig>,
    pub diagnostics: Vec<ConfigDiagnostic>,
}

/// Fills in default names and reports duplicate names and missing addresses.
///
/// Records keep their position; a record without an address is returned
/// as-is and is expected to be skipped by the caller.
pub fn normalize(raw: RawDevices) -> Normalized {
    let mut normalized = Normalized::default();
    let mut seen_names = HashSet::new();

    let records: Vec<(Option<usize>, DeviceConfig)> = match raw {
        RawDevices::Legacy(device) => vec![(None, device)],
        RawDevices::List(devices) => devices
            .into_iter()
            .enumerate()
            .map(|(index, device)| (Some(index), device))
            .collect(),
    };

    for (index, mut device) in records {
        // 1-based position used in diagnostics and default names
        let position = index.map(|i| i + 1);

        // An empty name counts as unset
        let name = device.name.take().filter(|name| !name.is_empty());
        let name = name.unwrap_or_else(|| match position {
            None => "TV".to_string(),
            Some(position) => format!("TV {position}"),
        });

        if !seen_names.insert(name.clone()) {
            let diagnostic = ConfigDiagnostic::DuplicateName {
                device: position.unwrap_or(1),
            };
            error!("{diagnostic}");
            normalized.diagnostics.push(diagnostic);
        }
        device.name = Some(name);

        if device.ip_address.as_deref().is_none_or(str::is_empty) {
            device.ip_address = None;
            let diagnostic = ConfigDiagnostic::MissingAddress { device: position };
            error!("{diagnostic}");
            normalized.diagnostics.push(diagnostic);
        }

        normalized.devices.push(device);
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config() {
        let config_str = r#"
            [mqtt]
            host = "localhost"
            port = 1883
            username = "user"
            password = "pass"

            [[devices]]
            name = "Lounge"
            ipAddress = "10.0.0.2"

            [[devices]]
            ip_address = "10.0.0.3"
        "#;
        let config: AppConfig = toml::de::from_str(config_str).unwrap();
        assert!(config.mqtt.host == "localhost");
        let devices = config.devices.clone().unwrap();
        assert_eq!(devices[0], DeviceConfig::new(Some("Lounge"), Some("10.0.0.2")));
        assert_eq!(devices[1], DeviceConfig::new(None, Some("10.0.0.3")));
        assert!(matches!(config.raw_devices(), RawDevices::List(list) if list.len() == 2));
    }

    #[test]
    fn test_legacy_config() {
        let config_str = r#"
            ipAddress = "192.168.1.20"

            [mqtt]
            host = "localhost"
        "#;
        let config: AppConfig = toml::de::from_str(config_str).unwrap();
        let normalized = normalize(config.raw_devices());
        assert_eq!(
            normalized.devices,
            vec![DeviceConfig::new(Some("TV"), Some("192.168.1.20"))]
        );
        assert!(normalized.diagnostics.is_empty());
    }

    #[test]
    fn test_default_names() {
        let normalized = normalize(RawDevices::List(vec![
            DeviceConfig::new(None, Some("10.0.0.1")),
            DeviceConfig::new(Some("Lounge"), Some("10.0.0.2")),
            DeviceConfig::new(None, Some("10.0.0.3")),
        ]));
        let names: Vec<_> = normalized
            .devices
            .iter()
            .map(|d| d.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["TV 1", "Lounge", "TV 3"]);
        assert!(normalized.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_name_gets_default() {
        let normalized = normalize(RawDevices::List(vec![
            DeviceConfig::new(Some(""), Some("10.0.0.1")),
            DeviceConfig::new(Some(""), Some("10.0.0.2")),
        ]));
        let names: Vec<_> = normalized
            .devices
            .iter()
            .map(|d| d.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["TV 1", "TV 2"]);
        assert!(normalized.diagnostics.is_empty());

        let legacy = normalize(RawDevices::Legacy(DeviceConfig::new(Some(""), Some("10.0.0.9"))));
        assert_eq!(legacy.devices[0].name.as_deref(), Some("TV"));
    }

    #[test]
    fn test_default_names_without_addresses() {
        let normalized = normalize(RawDevices::List(vec![
            DeviceConfig::default(),
            DeviceConfig::new(Some("Lounge"), Some("10.0.0.2")),
            DeviceConfig::default(),
        ]));
        assert_eq!(normalized.devices[0].name.as_deref(), Some("TV 1"));
        assert_eq!(normalized.devices[2].name.as_deref(), Some("TV 3"));
        assert!(
            !normalized
                .diagnostics
                .iter()
                .any(|d| matches!(d, ConfigDiagnostic::DuplicateName { .. }))
        );
    }

    #[test]
    fn test_duplicate_names() {
        let normalized = normalize(RawDevices::List(vec![
            DeviceConfig::new(Some("TV"), Some("10.0.0.1")),
            DeviceConfig::new(Some("TV"), Some("10.0.0.2")),
        ]));
        assert_eq!(
            normalized.diagnostics,
            vec![ConfigDiagnostic::DuplicateName { device: 2 }]
        );
        // Reported, not corrected
        assert_eq!(normalized.devices[1].name.as_deref(), Some("TV"));
        assert_eq!(normalized.diagnostics[0].to_string(), "Duplicate name at device 2.");
    }

    #[test]
    fn test_missing_address() {
        let normalized = normalize(RawDevices::List(vec![
            DeviceConfig::new(Some("Bedroom"), None),
            DeviceConfig::new(Some("Lounge"), Some("10.0.0.2")),
        ]));
        assert_eq!(
            normalized.diagnostics,
            vec![ConfigDiagnostic::MissingAddress { device: Some(1) }]
        );
        assert_eq!(normalized.devices.len(), 2);
        assert_eq!(normalized.devices[0].ip_address, None);

        let legacy = normalize(RawDevices::Legacy(DeviceConfig::default()));
        assert_eq!(legacy.diagnostics[0].to_string(), "IP address not set.");
    }
}
