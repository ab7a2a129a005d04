use uuid::Uuid;

use crate::accessory::ActiveState;

/// A set request received from the host for one characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessoryRequest {
    SetActive(ActiveState),
    RemoteKey(u8),
    VolumeSelector(u8),
    ActiveIdentifier(u32),
    PowerSwitch(bool),
}

impl AccessoryRequest {
    /// Parses the characteristic segment of a `.../<characteristic>/set` topic and its payload.
    pub fn parse(characteristic: &str, payload: &str) -> Option<Self> {
        let payload = payload.trim();
        let request = match characteristic {
            "active" => AccessoryRequest::SetActive(ActiveState::from_hap(payload.parse().ok()?)),
            "remote_key" => AccessoryRequest::RemoteKey(payload.parse().ok()?),
            "volume_selector" => AccessoryRequest::VolumeSelector(payload.parse().ok()?),
            "active_identifier" => AccessoryRequest::ActiveIdentifier(payload.parse().ok()?),
            "power_switch" => AccessoryRequest::PowerSwitch(match payload {
                "1" | "true" | "ON" | "on" => true,
                "0" | "false" | "OFF" | "off" => false,
                _ => return None,
            }),
            _ => return None,
        };
        Some(request)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Accessory uuid
    pub accessory: Uuid,
    pub request: AccessoryRequest,
}
