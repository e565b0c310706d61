use crate::error::{ChorusError, Result};
use crate::transport::tls::{generate_self_signed_cert, make_server_config};
use std::net::SocketAddr;

/// Listens for incoming QUIC connections on a bound address.
pub struct TransportListener {
    endpoint: quinn::Endpoint,
    local_addr: SocketAddr,
}

impl TransportListener {
    /// Bind a QUIC listener on the given address with a self-signed certificate.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let (cert, key) = generate_self_signed_cert()?;
        let server_config = make_server_config(cert, key)?;

        let endpoint = quinn::Endpoint::server(server_config, addr)
            .map_err(|e| ChorusError::transport(format!("bind {addr}: {e}")))?;

        let local_addr = endpoint
            .local_addr()
            .map_err(|e| ChorusError::transport(format!("local_addr: {e}")))?;

        Ok(Self {
            endpoint,
            local_addr,
        })
    }

    /// Accept the next incoming QUIC connection.
    pub async fn accept(&self) -> Result<quinn::Connection> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| ChorusError::transport("endpoint closed"))?;

        incoming
            .await
            .map_err(|e| ChorusError::transport(format!("accept: {e}")))
    }

    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The underlying quinn endpoint (also usable for outgoing connections).
    pub fn endpoint(&self) -> &quinn::Endpoint {
        &self.endpoint
    }
}
