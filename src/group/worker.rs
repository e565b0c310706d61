use crate::error::{ChorusError, Result};
use crate::protocol::ChorusMessage;
use crate::protocol::codec::{decode_message, encode_message};
use crate::protocol::header::HEADER_SIZE;
use crate::transport::tls::make_client_config;
use crate::types::{PROTOCOL_VERSION, Priority, Rank};
use std::net::SocketAddr;

/// Result of connecting to the seed node and completing the handshake.
pub struct WorkerNode {
    pub rank: Rank,
    pub size: u32,
    pub peers: Vec<(Rank, String)>,
    pub seed_conn: quinn::Connection,
}

impl WorkerNode {
    /// Connect to the seed node, complete the handshake, and receive the
    /// rank assignment plus the peer roster.
    pub async fn connect(seed_addr: SocketAddr) -> Result<Self> {
        let client_config = make_client_config()?;

        let bind_addr: SocketAddr = "0.0.0.0:0".parse().expect("hardcoded socket addr");
        let mut endpoint = quinn::Endpoint::client(bind_addr)
            .map_err(|e| ChorusError::transport_with_source("bind client", e))?;
        endpoint.set_default_client_config(client_config);

        let conn = endpoint
            .connect(seed_addr, "localhost")
            .map_err(|e| ChorusError::transport_with_source("connect to seed", e))?
            .await
            .map_err(|e| ChorusError::ConnectionFailed {
                rank: 0,
                reason: format!("QUIC handshake: {e}"),
            })?;

        // Open the first bidirectional stream and send Hello.
        let (mut send, mut recv) = conn
            .open_bi()
            .await
            .map_err(|e| ChorusError::transport_with_source("open bi to seed", e))?;

        let hello = ChorusMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            capabilities: 0,
        };
        let buf = encode_message(&hello, Priority::Critical)?;
        send.write_all(&buf)
            .await
            .map_err(|e| ChorusError::transport_with_source("send hello", e))?;

        // Read Welcome response.
        let mut header_buf = [0u8; HEADER_SIZE];
        recv.read_exact(&mut header_buf)
            .await
            .map_err(|e| ChorusError::transport_with_source("read welcome header", e))?;
        let payload_len =
            u32::from_le_bytes([header_buf[0], header_buf[1], header_buf[2], header_buf[3]])
                as usize;
        let mut payload = vec![0u8; payload_len];
        recv.read_exact(&mut payload)
            .await
            .map_err(|e| ChorusError::transport_with_source("read welcome payload", e))?;

        let mut full_buf = Vec::with_capacity(HEADER_SIZE + payload_len);
        full_buf.extend_from_slice(&header_buf);
        full_buf.extend_from_slice(&payload);
        let (_, msg) = decode_message(&full_buf)?;

        match msg {
            ChorusMessage::Welcome { rank, size, peers } => Ok(WorkerNode {
                rank,
                size,
                peers,
                seed_conn: conn,
            }),
            other => Err(ChorusError::DecodeFailed(format!(
                "expected Welcome, got {other:?}"
            ))),
        }
    }
}
