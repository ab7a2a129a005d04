use thiserror::Error;

/// Errors returned when sending a key press to the box.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("unknown remote command `{0}`")]
    UnknownCommand(String),
    #[error("failed to connect to {address}")]
    Connect {
        address: String,
        source: std::io::Error,
    },
    #[error("remote connection to {address} failed")]
    Io {
        address: String,
        source: std::io::Error,
    },
    #[error("remote connection to {address} closed before the handshake completed")]
    HandshakeClosed { address: String },
    #[error("timed out talking to {address}")]
    Timeout { address: String },
}

/// Errors returned when querying the box's HTTP API.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to {url} failed")]
    Http { url: String, source: reqwest::Error },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}")]
    Decode { url: String, source: reqwest::Error },
}

/// Errors surfaced to the host for user-triggered actions.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("no accessory with id `{0}`")]
    UnknownAccessory(uuid::Uuid),
}

/// Errors returned by the accessory host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("MQTT client error")]
    Mqtt(#[from] rumqttc::ClientError),
    #[error("failed to encode payload")]
    Encode(#[from] serde_json::Error),
}
