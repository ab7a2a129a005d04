use std::fmt::Display;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::accessory::{self, AccessoryHost, AccessoryInfo, ActiveState, InputSource};
use crate::commands::{self, CommandEvent};
use crate::error::ControlError;
use crate::messages::AccessoryRequest;
use crate::probe::StateProbe;
use crate::remote::RemoteClient;

/// Controls one box and tracks its power state.
pub struct DeviceController {
    id: Uuid,
    name: String,
    address: String,
    state: Arc<watch::Sender<ActiveState>>,
    inputs: Arc<watch::Sender<Vec<InputSource>>>,
    // Held for the whole of a command so its key presses are not interleaved with another's
    command_lock: Mutex<()>,
    remote: Arc<dyn RemoteClient>,
    host: Arc<dyn AccessoryHost>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DeviceController {
    /// Creates the controller and starts its background reconciliation.
    ///
    /// Must be called within a tokio runtime. Returns immediately; the power
    /// query, service discovery and system info queries run as detached tasks.
    pub fn new(
        name: &str,
        address: &str,
        remote: Arc<dyn RemoteClient>,
        probe: Arc<dyn StateProbe>,
        host: Arc<dyn AccessoryHost>,
    ) -> Self {
        let (state, _) = watch::channel(ActiveState::Inactive);
        let (inputs, _) = watch::channel(Vec::new());

        let mut controller = DeviceController {
            id: accessory::accessory_uuid(address),
            name: name.to_string(),
            address: address.to_string(),
            state: Arc::new(state),
            inputs: Arc::new(inputs),
            command_lock: Mutex::new(()),
            remote,
            host,
            tasks: Mutex::new(Vec::new()),
        };

        let tasks = vec![
            controller.spawn_power_probe(probe.clone()),
            controller.spawn_input_discovery(probe.clone()),
            controller.spawn_system_info(probe),
        ];
        controller.tasks = Mutex::new(tasks);
        controller
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn get_active(&self) -> ActiveState {
        *self.state.borrow()
    }

    #[cfg(test)]
    pub fn input_sources(&self) -> Vec<InputSource> {
        self.inputs.borrow().clone()
    }

    /// Applies one host request.
    pub async fn apply(&self, request: AccessoryRequest) -> Result<(), ControlError> {
        match request {
            AccessoryRequest::SetActive(state) => self.set_active(state).await,
            AccessoryRequest::RemoteKey(value) => self.handle_remote_key(value).await,
            AccessoryRequest::VolumeSelector(value) => self.handle_volume_selector(value).await,
            AccessoryRequest::ActiveIdentifier(id) => self.set_active_identifier(id).await,
            AccessoryRequest::PowerSwitch(on) => {
                self.set_power_switch(on).await;
                Ok(())
            }
        }
    }

    pub async fn set_active(&self, requested: ActiveState) -> Result<(), ControlError> {
        let _guard = self.command_lock.lock().await;

        if requested == self.get_active() {
            info!("{}: skipping Active, new value is equal to current value", self.name);
            return Ok(());
        }

        self.dispatch("Active", commands::resolve(CommandEvent::Power), requested)
            .await?;

        self.state.send_replace(requested);
        self.notify_active(requested).await;
        Ok(())
    }

    pub async fn handle_remote_key(&self, value: u8) -> Result<(), ControlError> {
        let _guard = self.command_lock.lock().await;
        self.dispatch("Remote Key", commands::resolve_remote_key(value), value)
            .await
    }

    pub async fn handle_volume_selector(&self, value: u8) -> Result<(), ControlError> {
        let _guard = self.command_lock.lock().await;
        self.dispatch("Volume Selector", commands::resolve_volume(value), value)
            .await
    }

    /// Tunes to a discovered input source by keying in its channel number.
    pub async fn set_active_identifier(&self, identifier: u32) -> Result<(), ControlError> {
        let known = self
            .inputs
            .borrow()
            .iter()
            .any(|input| input.identifier == identifier);
        if !known {
            warn!("{}: skipping Active Identifier, unknown input {identifier}", self.name);
            return Ok(());
        }

        info!("{}: set Active Identifier {identifier}", self.name);
        let _guard = self.command_lock.lock().await;
        for digit in identifier.to_string().chars() {
            self.send(&digit.to_string()).await?;
        }
        Ok(())
    }

    /// Overrides the tracked state without sending anything to the box.
    pub async fn set_power_switch(&self, on: bool) {
        let state = ActiveState::from(on);
        info!("{}: power switch set to {state}", self.name);
        let _guard = self.command_lock.lock().await;
        self.state.send_replace(state);
        self.notify_active(state).await;
    }

    /// Waits for the background reconciliation tasks to finish.
    pub async fn reconciled(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for result in futures::future::join_all(tasks).await {
            if let Err(err) = result {
                error!("{}: reconciliation task failed: {:?}", self.name, err);
            }
        }
    }

    async fn dispatch(
        &self,
        label: &str,
        command: Option<&'static str>,
        value: impl Display,
    ) -> Result<(), ControlError> {
        let Some(command) = command else {
            warn!("{}: skipping {label}, unknown value {value}", self.name);
            return Ok(());
        };
        info!("{}: set {label} {command}", self.name);
        self.send(command).await
    }

    async fn send(&self, command: &str) -> Result<(), ControlError> {
        self.remote
            .send(&self.address, command)
            .await
            .map_err(|err| {
                error!("{}: failed to send {command}: {err}", self.name);
                ControlError::from(err)
            })
    }

    async fn notify_active(&self, state: ActiveState) {
        if let Err(err) = self.host.update_active(self.id, state).await {
            error!("{}: failed to update Active: {:?}", self.name, err);
        }
    }

    fn spawn_power_probe(&self, probe: Arc<dyn StateProbe>) -> JoinHandle<()> {
        let id = self.id;
        let name = self.name.clone();
        let address = self.address.clone();
        let state = self.state.clone();
        let host = self.host.clone();

        tokio::spawn(async move {
            match probe.get_power_state(&address).await {
                Ok(on) => {
                    if on {
                        info!("{name}: box is on");
                    } else {
                        info!("{name}: box is in standby");
                    }
                    let active = ActiveState::from(on);
                    state.send_replace(active);
                    if let Err(err) = host.update_active(id, active).await {
                        error!("{name}: failed to update Active: {:?}", err);
                    }
                }
                Err(err) => {
                    error!("{name}: could not read power state, assuming standby: {err}");
                }
            }
        })
    }

    fn spawn_input_discovery(&self, probe: Arc<dyn StateProbe>) -> JoinHandle<()> {
        let id = self.id;
        let name = self.name.clone();
        let address = self.address.clone();
        let inputs = self.inputs.clone();
        let host = self.host.clone();

        tokio::spawn(async move {
            let services = match probe.get_services(&address).await {
                Ok(services) => services,
                Err(err) => {
                    warn!("{name}: input discovery failed: {err}");
                    return;
                }
            };

            for service in services {
                let Some(identifier) = service.id.filter(|_| !service.label.is_empty()) else {
                    debug!("{name}: skipping service {:?}", service);
                    continue;
                };
                let input = InputSource {
                    identifier,
                    label: service.label,
                };
                if let Err(err) = host.add_input_source(id, &input).await {
                    error!("{name}: failed to add input {}: {:?}", input.label, err);
                    continue;
                }
                inputs.send_modify(|inputs| inputs.push(input));
            }
            info!("{name}: {} input sources", inputs.borrow().len());
        })
    }

    fn spawn_system_info(&self, probe: Arc<dyn StateProbe>) -> JoinHandle<()> {
        let id = self.id;
        let name = self.name.clone();
        let address = self.address.clone();
        let host = self.host.clone();

        tokio::spawn(async move {
            match probe.get_system_info(&address).await {
                Ok(info) => {
                    let info = AccessoryInfo::from(info);
                    if let Err(err) = host.update_info(id, &info).await {
                        error!("{name}: failed to update accessory info: {:?}", err);
                    }
                }
                Err(err) => warn!("{name}: could not read system info: {err}"),
            }
        })
    }
}
