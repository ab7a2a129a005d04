use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;

use crate::error::ProbeError;

pub const SKY_Q_API_PORT: u16 = 9006;

/// A service advertised by the box, exposed as an input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub id: Option<u32>,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
}

/// Queries a box for its current state.
#[async_trait]
pub trait StateProbe: Send + Sync {
    async fn get_power_state(&self, address: &str) -> Result<bool, ProbeError>;
    async fn get_services(&self, address: &str) -> Result<Vec<ServiceEntry>, ProbeError>;
    async fn get_system_info(&self, address: &str) -> Result<SystemInfo, ProbeError>;
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SystemInformation {
    #[serde(default)]
    active_standby: bool,
    manufacturer: Option<String>,
    hardware_model: Option<String>,
    model_number: Option<String>,
    serial_number: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ServiceList {
    #[serde(default)]
    services: Vec<Service>,
}

#[derive(Deserialize, Debug)]
struct Service {
    /// Channel number
    c: Option<String>,
    /// Title
    t: Option<String>,
}

impl From<Service> for ServiceEntry {
    fn from(service: Service) -> Self {
        ServiceEntry {
            id: service.c.and_then(|c| c.trim().parse().ok()),
            label: service.t.unwrap_or_default(),
        }
    }
}

impl From<SystemInformation> for SystemInfo {
    fn from(info: SystemInformation) -> Self {
        SystemInfo {
            manufacturer: info.manufacturer,
            model: info.hardware_model.or(info.model_number),
            serial: info.serial_number,
        }
    }
}

/// Talks to the box's local HTTP API.
#[derive(Debug, Clone)]
pub struct SkyQProbe {
    client: reqwest::Client,
    port: u16,
}

impl SkyQProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(SkyQProbe {
            client,
            port: SKY_Q_API_PORT,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, address: &str, path: &str) -> Result<T, ProbeError> {
        let url = format!("http://{address}:{}{path}", self.port);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ProbeError::Http {
                url: url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(ProbeError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|source| ProbeError::Decode { url, source })
    }
}

#[async_trait]
impl StateProbe for SkyQProbe {
    async fn get_power_state(&self, address: &str) -> Result<bool, ProbeError> {
        let info: SystemInformation = self.get_json(address, "/as/system/information").await?;
        Ok(!info.active_standby)
    }

    async fn get_services(&self, address: &str) -> Result<Vec<ServiceEntry>, ProbeError> {
        let list: ServiceList = self.get_json(address, "/as/services").await?;
        Ok(list.services.into_iter().map(ServiceEntry::from).collect())
    }

    async fn get_system_info(&self, address: &str) -> Result<SystemInfo, ProbeError> {
        let info: SystemInformation = self.get_json(address, "/as/system/information").await?;
        Ok(info.into())
    }
}
