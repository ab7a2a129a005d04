use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::commands;
use crate::error::RemoteError;

pub const SKY_Q_PORT: u16 = 49160;

const BANNER_LEN: usize = 12;
const READY_LEN: usize = 24;

#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn send(&self, address: &str, command: &str) -> Result<(), RemoteError>;
}

/// Sends key presses using the box's remote control protocol.
#[derive(Debug, Clone)]
pub struct SkyRemote {
    port: u16,
    io_timeout: Duration,
}

impl Default for SkyRemote {
    fn default() -> Self {
        SkyRemote::new(SKY_Q_PORT)
    }
}

impl SkyRemote {
    pub fn new(port: u16) -> Self {
        SkyRemote {
            port,
            io_timeout: Duration::from_secs(5),
        }
    }

    async fn press(&self, address: &str, code: u8) -> Result<(), RemoteError> {
        let io_err = |source| RemoteError::Io {
            address: address.to_string(),
            source,
        };

        let mut stream = TcpStream::connect((address, self.port))
            .await
            .map_err(|source| RemoteError::Connect {
                address: address.to_string(),
                source,
            })?;

        let mut buf = [0u8; 64];
        let mut reply_len = BANNER_LEN;
        loop {
            let read = timeout(self.io_timeout, stream.read(&mut buf))
                .await
                .map_err(|_| RemoteError::Timeout {
                    address: address.to_string(),
                })?
                .map_err(io_err)?;
            if read == 0 {
                return Err(RemoteError::HandshakeClosed {
                    address: address.to_string(),
                });
            }
            if read >= READY_LEN {
                break;
            }
            // Echo the banner, then answer each handshake step with its first byte
            stream
                .write_all(&buf[..reply_len.min(read)])
                .await
                .map_err(io_err)?;
            reply_len = 1;
        }

        let mut frame = key_frame(code);
        stream.write_all(&frame).await.map_err(io_err)?;
        frame[1] = 0;
        stream.write_all(&frame).await.map_err(io_err)?;
        stream.shutdown().await.map_err(io_err)?;
        Ok(())
    }
}

/// Key-down frame for a key code; the key-up frame has byte 1 cleared.
fn key_frame(code: u8) -> [u8; 8] {
    [4, 1, 0, 0, 0, 0, 224 + code / 16, code % 16]
}

#[async_trait]
impl RemoteClient for SkyRemote {
    async fn send(&self, address: &str, command: &str) -> Result<(), RemoteError> {
        let code = commands::key_code(command)
            .ok_or_else(|| RemoteError::UnknownCommand(command.to_string()))?;
        debug!("Pressing {command} ({code}) on {address}:{}", self.port);
        self.press(address, code).await
    }
}
