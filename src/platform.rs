use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::accessory::{Accessory, AccessoryHost};
use crate::config::{self, RawDevices};
use crate::controller::DeviceController;
use crate::error::ControlError;
use crate::messages::{AccessoryRequest, DeviceRequest};
use crate::probe::StateProbe;
use crate::remote::RemoteClient;

/// Owns one controller per configured box and routes host requests to them.
pub struct Platform {
    host: Arc<dyn AccessoryHost>,
    controllers: Vec<Arc<DeviceController>>,
}

impl Platform {
    /// Normalizes the device records, publishes an accessory for every box
    /// with an address and starts its controller.
    pub async fn start(
        raw: RawDevices,
        remote: Arc<dyn RemoteClient>,
        probe: Arc<dyn StateProbe>,
        host: Arc<dyn AccessoryHost>,
    ) -> Self {
        let normalized = config::normalize(raw);
        if !normalized.diagnostics.is_empty() {
            warn!(
                "Found {} problem(s) in the device configuration",
                normalized.diagnostics.len()
            );
        }
        let mut controllers = Vec::new();
        let mut seen = HashSet::new();

        for (index, device) in normalized.devices.into_iter().enumerate() {
            let (Some(name), Some(address)) = (device.name, device.ip_address) else {
                warn!("Skipping device {} without an IP address", index + 1);
                continue;
            };

            let accessory = Accessory::television(&name, &address);
            // The accessory id is derived from the address
            if !seen.insert(accessory.uuid) {
                warn!("Skipping {name}, {address} is already configured");
                continue;
            }
            if let Err(err) = host.publish(&accessory).await {
                error!("Failed to publish accessory {name}: {:?}", err);
                continue;
            }

            debug!("Controlling {name} at {address}");
            let controller =
                DeviceController::new(&name, &address, remote.clone(), probe.clone(), host.clone());
            controllers.push(Arc::new(controller));
        }

        info!(
            "Sky TV platform finished initializing with {} device(s)",
            controllers.len()
        );
        Platform { host, controllers }
    }

    #[cfg(test)]
    pub fn controllers(&self) -> &[Arc<DeviceController>] {
        &self.controllers
    }

    #[cfg(test)]
    pub fn controller(&self, id: Uuid) -> Option<&Arc<DeviceController>> {
        self.controllers.iter().find(|c| c.id() == id)
    }

    /// Handles host requests until the sender side closes.
    ///
    /// Every box gets its own queue. Requests for one box run in arrival
    /// order; a hung box does not hold up the others.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<DeviceRequest>) {
        let mut queues = HashMap::new();
        let mut workers = Vec::new();
        for controller in &self.controllers {
            let (tx, queue) = mpsc::unbounded_channel();
            queues.insert(controller.id(), tx);
            workers.push(tokio::spawn(self.clone().work(controller.clone(), queue)));
        }

        while let Some(request) = rx.recv().await {
            let Some(queue) = queues.get(&request.accessory) else {
                let err = ControlError::UnknownAccessory(request.accessory);
                self.report(request.accessory, &err).await;
                continue;
            };
            if queue.send(request.request).is_err() {
                error!("{}: request queue closed", request.accessory);
            }
        }
        debug!("Request channel closed");

        drop(queues);
        for result in futures::future::join_all(workers).await {
            if let Err(err) = result {
                error!("Request worker failed: {:?}", err);
            }
        }
    }

    async fn work(
        self: Arc<Self>,
        controller: Arc<DeviceController>,
        mut queue: mpsc::UnboundedReceiver<AccessoryRequest>,
    ) {
        while let Some(request) = queue.recv().await {
            if let Err(err) = controller.apply(request).await {
                self.report(controller.id(), &err).await;
            }
        }
    }

    async fn report(&self, accessory: Uuid, err: &ControlError) {
        error!("{accessory}: request failed: {err}");
        if let Err(err) = self.host.report_error(accessory, &err.to_string()).await {
            error!("Failed to report error: {:?}", err);
        }
    }

    /// Waits for every controller's background reconciliation.
    pub async fn reconciled(&self) {
        futures::future::join_all(self.controllers.iter().map(|c| c.reconciled())).await;
    }
}
