//! QUIC transport for the relay.
//!
//! Quinn endpoint with TLS 1.3 and ALPN `hearsay`. Production
//! deployments supply PEM certificate/key paths; without them a
//! self-signed certificate is generated for development. Transport
//! security protects routing metadata only — message content is
//! end-to-end encrypted before it ever reaches this layer, and the
//! relay stays untrusted either way.

use std::{net::SocketAddr, sync::Arc};

use hearsay_proto::ALPN_PROTOCOL;
use quinn::{Endpoint, RecvStream, SendStream};

use crate::error::ServerError;

/// TLS material for the endpoint.
#[derive(Debug, Clone)]
pub enum TlsSetup {
    /// PEM certificate chain and private key files.
    Pem {
        /// Path to the certificate chain.
        cert_path: String,
        /// Path to the private key.
        key_path: String,
    },
    /// Self-signed certificate, generated at bind time. Development
    /// only.
    SelfSigned,
}

/// QUIC listener for the relay.
pub struct ServerTransport {
    endpoint: Endpoint,
}

impl ServerTransport {
    /// Bind a QUIC endpoint on `address`.
    pub fn bind(address: &str, tls: &TlsSetup) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let (cert_chain, key) = tls_material(tls)?;
        let mut tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)
            .map_err(|e| ServerError::Config(format!("invalid TLS material: {e}")))?;
        tls_config.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

        let quic_config = quinn::ServerConfig::with_crypto(Arc::new(
            quinn::crypto::rustls::QuicServerConfig::try_from(tls_config)
                .map_err(|e| ServerError::Config(format!("QUIC TLS config: {e}")))?,
        ));

        let endpoint = Endpoint::server(quic_config, addr)
            .map_err(|e| ServerError::Transport(format!("failed to bind endpoint: {e}")))?;

        if matches!(tls, TlsSetup::SelfSigned) {
            tracing::warn!("using a self-signed certificate - not for production");
        }
        tracing::info!("QUIC transport bound to {}", addr);

        Ok(Self { endpoint })
    }

    /// Accept the next incoming connection.
    pub async fn accept(&self) -> Result<RelayConnection, ServerError> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| ServerError::Transport("endpoint closed".to_string()))?;

        let connection = incoming
            .await
            .map_err(|e| ServerError::Transport(format!("handshake failed: {e}")))?;

        Ok(RelayConnection { connection })
    }

    /// Local address the endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.endpoint
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("local address: {e}")))
    }
}

/// One accepted QUIC connection.
///
/// Clones are cheap and share the underlying connection, so the accept
/// loop, stream handlers, and the action executor can all hold one.
#[derive(Clone)]
pub struct RelayConnection {
    connection: quinn::Connection,
}

impl RelayConnection {
    /// Accept a client-initiated bidirectional stream (one inbound
    /// frame each).
    pub async fn accept_bi(&self) -> Result<(SendStream, RecvStream), ServerError> {
        self.connection
            .accept_bi()
            .await
            .map_err(|e| ServerError::Transport(format!("accept_bi: {e}")))
    }

    /// Open the relay's outbound stream for ordered server→client
    /// delivery.
    pub async fn open_uni(&self) -> Result<SendStream, ServerError> {
        self.connection
            .open_uni()
            .await
            .map_err(|e| ServerError::Transport(format!("open_uni: {e}")))
    }

    /// Remote peer address.
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Close the connection with a reason.
    pub fn close(&self, reason: &str) {
        self.connection.close(0u32.into(), reason.as_bytes());
    }
}

/// Resolve certificate chain and private key for the endpoint.
fn tls_material(
    tls: &TlsSetup,
) -> Result<
    (Vec<rustls::pki_types::CertificateDer<'static>>, rustls::pki_types::PrivateKeyDer<'static>),
    ServerError,
> {
    match tls {
        TlsSetup::Pem { cert_path, key_path } => {
            let cert_pem = std::fs::read(cert_path)
                .map_err(|e| ServerError::Config(format!("read cert '{cert_path}': {e}")))?;
            let chain = rustls_pemfile::certs(&mut &cert_pem[..])
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ServerError::Config(format!("parse certificates: {e}")))?;

            let key_pem = std::fs::read(key_path)
                .map_err(|e| ServerError::Config(format!("read key '{key_path}': {e}")))?;
            let key = rustls_pemfile::private_key(&mut &key_pem[..])
                .map_err(|e| ServerError::Config(format!("parse private key: {e}")))?
                .ok_or_else(|| ServerError::Config("no private key found".to_string()))?;

            Ok((chain, key))
        },
        TlsSetup::SelfSigned => {
            let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
                .map_err(|e| ServerError::Config(format!("self-signed cert generation: {e}")))?;

            let cert_der = cert.cert.der().clone();
            let key = rustls::pki_types::PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

            Ok((vec![cert_der], key.into()))
        },
    }
}
