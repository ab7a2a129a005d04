use async_trait::async_trait;
use serde_derive::Serialize;
use uuid::Uuid;

use crate::error::HostError;
use crate::probe::SystemInfo;

pub const PLUGIN_NAME: &str = "skyq-bridge";
pub const DEFAULT_MANUFACTURER: &str = "Sky";

/// Power state of a box as exposed on the Active characteristic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ActiveState {
    #[default]
    Inactive,
    Active,
}

impl ActiveState {
    pub fn from_hap(value: u8) -> Self {
        if value == 0 {
            ActiveState::Inactive
        } else {
            ActiveState::Active
        }
    }

    pub fn as_hap(self) -> u8 {
        match self {
            ActiveState::Inactive => 0,
            ActiveState::Active => 1,
        }
    }
}

impl From<bool> for ActiveState {
    fn from(on: bool) -> Self {
        if on {
            ActiveState::Active
        } else {
            ActiveState::Inactive
        }
    }
}

impl std::fmt::Display for ActiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveState::Inactive => write!(f, "INACTIVE"),
            ActiveState::Active => write!(f, "ACTIVE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSource {
    pub identifier: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessoryInfo {
    pub manufacturer: String,
    pub model: Option<String>,
    pub serial: Option<String>,
}

impl Default for AccessoryInfo {
    fn default() -> Self {
        AccessoryInfo {
            manufacturer: DEFAULT_MANUFACTURER.to_string(),
            model: None,
            serial: None,
        }
    }
}

impl From<SystemInfo> for AccessoryInfo {
    fn from(info: SystemInfo) -> Self {
        AccessoryInfo {
            manufacturer: info
                .manufacturer
                .unwrap_or_else(|| DEFAULT_MANUFACTURER.to_string()),
            model: info.model,
            serial: info.serial,
        }
    }
}

/// Description of a television accessory as published to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accessory {
    pub name: String,
    pub uuid: Uuid,
    pub category: &'static str,
    pub sleep_discovery: &'static str,
    pub speaker_active: ActiveState,
    pub speaker_volume_control: &'static str,
    pub info: AccessoryInfo,
}

impl Accessory {
    pub fn television(name: &str, address: &str) -> Self {
        Accessory {
            name: name.to_string(),
            uuid: accessory_uuid(address),
            category: "TV_SET_TOP_BOX",
            sleep_discovery: "ALWAYS_DISCOVERABLE",
            speaker_active: ActiveState::Active,
            speaker_volume_control: "RELATIVE",
            info: AccessoryInfo::default(),
        }
    }
}

/// Stable accessory id derived from the box address.
pub fn accessory_uuid(address: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("homebridge:{PLUGIN_NAME}:{address}").as_bytes(),
    )
}

/// The smart-home framework that hosts the accessories.
///
/// Accessories are addressed by their uuid; names are display labels and may repeat.
#[async_trait]
pub trait AccessoryHost: Send + Sync {
    async fn publish(&self, accessory: &Accessory) -> Result<(), HostError>;
    async fn update_active(&self, accessory: Uuid, state: ActiveState) -> Result<(), HostError>;
    async fn add_input_source(&self, accessory: Uuid, input: &InputSource) -> Result<(), HostError>;
    async fn update_info(&self, accessory: Uuid, info: &AccessoryInfo) -> Result<(), HostError>;
    async fn report_error(&self, accessory: Uuid, error: &str) -> Result<(), HostError>;
}
