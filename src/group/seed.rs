use crate::error::{ChorusError, Result};
use crate::group::roster::GroupRoster;
use crate::protocol::ChorusMessage;
use crate::protocol::codec::{decode_message, encode_message};
use crate::protocol::header::HEADER_SIZE;
use crate::transport::TransportListener;
use crate::types::{PROTOCOL_VERSION, Priority, Rank};
use std::net::SocketAddr;
use std::time::Duration;

/// The seed node orchestrates group formation.
///
/// It listens for joining participants, assigns ranks in arrival order, and
/// distributes the peer roster once all expected participants have joined.
/// The seed itself holds no rank; its job ends when formation completes.
pub struct SeedNode {
    listener: TransportListener,
    expected_size: u32,
    formation_timeout: Duration,
}

impl SeedNode {
    /// Create a seed node bound to the given address.
    pub fn bind(addr: SocketAddr, expected_size: u32) -> Result<Self> {
        let listener = TransportListener::bind(addr)?;
        Ok(Self {
            listener,
            expected_size,
            formation_timeout: Duration::from_secs(60),
        })
    }

    /// Set the group formation timeout.
    pub fn with_formation_timeout(mut self, timeout: Duration) -> Self {
        self.formation_timeout = timeout;
        self
    }

    /// Get the local address the seed is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Wait for all expected participants to join and distribute the roster.
    ///
    /// Returns the roster and the QUIC connections in rank order.
    pub async fn form_group(&self) -> Result<(GroupRoster, Vec<quinn::Connection>)> {
        let mut roster = GroupRoster::new();
        let mut connections: Vec<(
            Rank,
            quinn::Connection,
            quinn::SendStream,
            quinn::RecvStream,
        )> = Vec::new();
        let mut next_rank: Rank = 0;

        let deadline = tokio::time::Instant::now() + self.formation_timeout;

        while next_rank < self.expected_size {
            let conn = tokio::select! {
                result = self.listener.accept() => result?,
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(ChorusError::GroupFormationTimeout {
                        joined: next_rank,
                        expected: self.expected_size,
                    });
                }
            };

            // Accept the first bidirectional stream (control channel).
            let (send, mut recv) = conn.accept_bi().await.map_err(|e| {
                ChorusError::transport(format!("accept bi from new participant: {e}"))
            })?;

            // Read Hello message.
            let mut header_buf = [0u8; HEADER_SIZE];
            recv.read_exact(&mut header_buf)
                .await
                .map_err(|e| ChorusError::transport(format!("read hello header: {e}")))?;
            let payload_len =
                u32::from_le_bytes([header_buf[0], header_buf[1], header_buf[2], header_buf[3]])
                    as usize;
            let mut payload = vec![0u8; payload_len];
            recv.read_exact(&mut payload)
                .await
                .map_err(|e| ChorusError::transport(format!("read hello payload: {e}")))?;

            let mut full_buf = Vec::with_capacity(HEADER_SIZE + payload_len);
            full_buf.extend_from_slice(&header_buf);
            full_buf.extend_from_slice(&payload);
            let (_, msg) = decode_message(&full_buf)?;

            match msg {
                ChorusMessage::Hello {
                    protocol_version, ..
                } => {
                    if protocol_version != PROTOCOL_VERSION {
                        return Err(ChorusError::ProtocolMismatch {
                            local: PROTOCOL_VERSION,
                            remote: protocol_version,
                        });
                    }
                }
                other => {
                    return Err(ChorusError::DecodeFailed(format!(
                        "expected Hello, got {other:?}"
                    )));
                }
            }

            let rank = next_rank;
            let addr = conn.remote_address().to_string();
            roster.add_peer(rank, addr);
            connections.push((rank, conn, send, recv));
            next_rank += 1;

            tracing::info!(
                "participant joined: rank={rank}, total={next_rank}/{}",
                self.expected_size
            );
        }

        let peers = roster.peers();

        // Send Welcome to each participant with its assigned rank.
        let mut conns = Vec::with_capacity(connections.len());
        for (rank, conn, mut send, _recv) in connections {
            let welcome = ChorusMessage::Welcome {
                rank,
                size: self.expected_size,
                peers: peers.clone(),
            };
            let buf = encode_message(&welcome, Priority::Critical)?;
            send.write_all(&buf).await.map_err(|e| {
                ChorusError::transport(format!("send welcome to rank {rank}: {e}"))
            })?;
            conns.push(conn);
        }

        Ok((roster, conns))
    }
}
