//! In-memory collaborators for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::accessory::{Accessory, AccessoryHost, AccessoryInfo, ActiveState, InputSource};
use crate::error::{HostError, ProbeError, RemoteError};
use crate::probe::{ServiceEntry, StateProbe, SystemInfo};
use crate::remote::RemoteClient;

#[derive(Default)]
pub struct FakeRemote {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
    /// Command that takes a while to reach the box.
    pub slow: Option<&'static str>,
}

impl FakeRemote {
    pub fn failing() -> Self {
        FakeRemote {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn send(&self, address: &str, command: &str) -> Result<(), RemoteError> {
        if self.slow == Some(command) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::HandshakeClosed {
                address: address.to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), command.to_string()));
        Ok(())
    }
}

/// Box status source answering from fixed values. `None` makes the query fail.
#[derive(Default)]
pub struct FakeProbe {
    pub power: Option<bool>,
    pub services: Option<Vec<ServiceEntry>>,
    pub info: Option<SystemInfo>,
    /// When set, the power query waits until notified.
    pub gate: Option<Notify>,
}

fn unavailable(address: &str) -> ProbeError {
    ProbeError::Status {
        url: format!("http://{address}:9006/"),
        status: 503,
    }
}

#[async_trait]
impl StateProbe for FakeProbe {
    async fn get_power_state(&self, address: &str) -> Result<bool, ProbeError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.power.ok_or_else(|| unavailable(address))
    }

    async fn get_services(&self, address: &str) -> Result<Vec<ServiceEntry>, ProbeError> {
        self.services.clone().ok_or_else(|| unavailable(address))
    }

    async fn get_system_info(&self, address: &str) -> Result<SystemInfo, ProbeError> {
        self.info.clone().ok_or_else(|| unavailable(address))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Published(String),
    Active(Uuid, ActiveState),
    Input(Uuid, InputSource),
    Info(Uuid, AccessoryInfo),
    Error(Uuid, String),
}

#[derive(Default)]
pub struct RecordingHost {
    pub events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn active_updates(&self) -> Vec<ActiveState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HostEvent::Active(_, state) => Some(state),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: HostEvent) -> Result<(), HostError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl AccessoryHost for RecordingHost {
    async fn publish(&self, accessory: &Accessory) -> Result<(), HostError> {
        self.record(HostEvent::Published(accessory.name.clone()))
    }

    async fn update_active(&self, accessory: Uuid, state: ActiveState) -> Result<(), HostError> {
        self.record(HostEvent::Active(accessory, state))
    }

    async fn add_input_source(&self, accessory: Uuid, input: &InputSource) -> Result<(), HostError> {
        self.record(HostEvent::Input(accessory, input.clone()))
    }

    async fn update_info(&self, accessory: Uuid, info: &AccessoryInfo) -> Result<(), HostError> {
        self.record(HostEvent::Info(accessory, info.clone()))
    }

    async fn report_error(&self, accessory: Uuid, error: &str) -> Result<(), HostError> {
        self.record(HostEvent::Error(accessory, error.to_string()))
    }
}
