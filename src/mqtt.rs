use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use rumqttc::{MqttOptions, QoS};
use serde_derive::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::accessory::{Accessory, AccessoryHost, AccessoryInfo, ActiveState, InputSource};
use crate::config;
use crate::error::HostError;
use crate::messages::{AccessoryRequest, DeviceRequest};

/// Accessory host backed by an MQTT broker.
#[derive(Debug, Clone)]
pub struct MqttClient {
    client: rumqttc::AsyncClient,
    publisher_id: String,
    topic_path: String,
}

#[derive(Debug, Serialize)]
struct ErrorMessage<'a> {
    accessory: Uuid,
    error: &'a str,
}

impl MqttClient {
    pub fn new(config: &config::MqttConfig) -> (Self, rumqttc::EventLoop) {
        let publisher_id = config
            .publisher_id
            .clone()
            .unwrap_or_else(|| "skyq-bridge".to_string());

        let mut mqttoptions = MqttOptions::new(
            publisher_id.clone(),
            config.host.clone(),
            config.port.unwrap_or(1883),
        );

        mqttoptions.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.unwrap_or(5)));

        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            mqttoptions.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = rumqttc::AsyncClient::new(mqttoptions, 10);

        (
            MqttClient {
                client,
                publisher_id,
                topic_path: config.topic_path.clone().unwrap_or("skyq".to_string()),
            },
            eventloop,
        )
    }

    /// Accessories are keyed by uuid so boxes sharing a display name get separate topics.
    fn topic(&self, accessory: Uuid, suffix: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.topic_path,
            self.publisher_id,
            accessory.simple(),
            suffix
        )
    }

    pub async fn subscribe(&self) -> Result<(), rumqttc::ClientError> {
        self.client
            .subscribe(
                format!("{}/{}/+/+/set", self.topic_path, self.publisher_id),
                QoS::AtLeastOnce,
            )
            .await
    }

    /// Splits a `.../<channel>/<characteristic>/set` topic.
    fn parse_topic<'a>(&self, topic: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = topic
            .strip_prefix(&self.topic_path)?
            .strip_prefix('/')?
            .strip_prefix(&self.publisher_id)?
            .strip_prefix('/')?
            .strip_suffix("/set")?;
        rest.split_once('/')
    }

    fn to_request(&self, topic: &str, payload: &[u8]) -> Option<DeviceRequest> {
        let (channel, characteristic) = self.parse_topic(topic)?;
        let accessory = Uuid::try_parse(channel).ok()?;
        let payload = std::str::from_utf8(payload).ok()?;
        let request = AccessoryRequest::parse(characteristic, payload)?;
        Some(DeviceRequest { accessory, request })
    }

    pub async fn event_loop(
        &self,
        eventloop: &mut rumqttc::EventLoop,
        tx: mpsc::Sender<DeviceRequest>,
    ) {
        loop {
            match eventloop.poll().await {
                Ok(notification) => match notification {
                    rumqttc::Event::Incoming(rumqttc::Packet::Publish(p)) => {
                        debug!("Received MQTT message on topic {}: {:?}", p.topic, p.payload);

                        let Some(request) = self.to_request(&p.topic, &p.payload) else {
                            warn!("Ignoring MQTT message on topic {}", p.topic);
                            continue;
                        };

                        if tx.send(request).await.is_err() {
                            debug!("Request receiver closed, stopping MQTT loop");
                            break;
                        }
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::SubAck(_)) => {
                        debug!("Subscription acknowledged");
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
                        debug!("Connection acknowledged");
                        if let Err(err) = self.subscribe().await {
                            error!("Error subscribing to MQTT topics: {:?}", err);
                        }
                    }
                    _ => {}
                },
                Err(e) => {
                    error!("Error polling MQTT event loop: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn publish_json<T: serde::Serialize + ?Sized>(
        &self,
        topic: String,
        retain: bool,
        payload: &T,
    ) -> Result<(), HostError> {
        let payload = serde_json::to_string(payload)?;
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await?;
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        debug!("Disconnecting MQTT client");
        self.client.disconnect().await
    }
}

#[async_trait]
impl AccessoryHost for MqttClient {
    async fn publish(&self, accessory: &Accessory) -> Result<(), HostError> {
        info!(
            "Publishing accessory {} ({}) on MQTT",
            accessory.name,
            accessory.uuid.simple()
        );
        self.publish_json(self.topic(accessory.uuid, "config"), true, accessory)
            .await
    }

    async fn update_active(&self, accessory: Uuid, state: ActiveState) -> Result<(), HostError> {
        self.client
            .publish(
                self.topic(accessory, "active"),
                QoS::AtLeastOnce,
                true,
                state.as_hap().to_string(),
            )
            .await?;
        Ok(())
    }

    async fn add_input_source(&self, accessory: Uuid, input: &InputSource) -> Result<(), HostError> {
        let topic = self.topic(accessory, &format!("inputs/{}", input.identifier));
        self.publish_json(topic, true, input).await
    }

    async fn update_info(&self, accessory: Uuid, info: &AccessoryInfo) -> Result<(), HostError> {
        self.publish_json(self.topic(accessory, "info"), true, info)
            .await
    }

    async fn report_error(&self, accessory: Uuid, error: &str) -> Result<(), HostError> {
        let message = ErrorMessage { accessory, error };
        self.publish_json(self.topic(accessory, "error"), false, &message)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::accessory_uuid;
    use pretty_assertions::assert_eq;

    fn client() -> MqttClient {
        let config = config::MqttConfig {
            host: "localhost".to_string(),
            port: None,
            username: None,
            password: None,
            publisher_id: None,
            topic_path: None,
            keep_alive_seconds: None,
        };
        MqttClient::new(&config).0
    }

    #[test]
    fn test_topics() {
        let client = client();
        let id = accessory_uuid("10.0.0.2");
        assert_eq!(
            client.topic(id, "active"),
            format!("skyq/skyq-bridge/{}/active", id.simple())
        );
        assert_eq!(
            client.parse_topic("skyq/skyq-bridge/abc/remote_key/set"),
            Some(("abc", "remote_key"))
        );
        assert_eq!(client.parse_topic("skyq/skyq-bridge/abc/active"), None);
        assert_eq!(client.parse_topic("other/skyq-bridge/abc/active/set"), None);
    }

    #[test]
    fn test_same_name_gets_separate_topics() {
        let client = client();
        let first = Accessory::television("TV", "10.0.0.1");
        let second = Accessory::television("TV", "10.0.0.2");
        assert_ne!(
            client.topic(first.uuid, "config"),
            client.topic(second.uuid, "config")
        );
    }

    #[test]
    fn test_request_for_accessory() {
        let client = client();
        let id = accessory_uuid("10.0.0.2");

        let topic = format!("skyq/skyq-bridge/{}/volume_selector/set", id.simple());
        assert_eq!(
            client.to_request(&topic, b"1"),
            Some(DeviceRequest {
                accessory: id,
                request: AccessoryRequest::VolumeSelector(1),
            })
        );
        assert_eq!(
            client.to_request("skyq/skyq-bridge/lounge/volume_selector/set", b"1"),
            None
        );
    }
}
