//! QUIC transport for the client.
//!
//! A thin layer that moves frames between channels and the wire;
//! protocol logic stays in the Sans-IO [`crate::Client`]. The relay
//! sends its frames on unidirectional streams (ordered delivery); the
//! client sends each frame on a fresh bidirectional stream.

use std::{net::SocketAddr, sync::Arc};

use bytes::BytesMut;
use hearsay_proto::{ALPN_PROTOCOL, Frame, FrameHeader};
use quinn::{ClientConfig, Endpoint};
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Handle to a connected client with QUIC transport.
///
/// Frames move through the channels; an internal task handles the
/// QUIC I/O.
pub struct ConnectedClient {
    /// Send frames to the relay.
    pub to_server: mpsc::Sender<Frame>,
    /// Receive frames from the relay.
    pub from_server: mpsc::Receiver<Frame>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to a Hearsay relay via QUIC.
///
/// Certificate verification is skipped — development relays run on
/// self-signed certificates. The end-to-end security of message content
/// never depends on the transport: payloads are encrypted client-side
/// and the relay is untrusted by design.
pub async fn connect(server_addr: &str) -> Result<ConnectedClient, TransportError> {
    let addr: SocketAddr = server_addr
        .parse()
        .map_err(|e| TransportError::Connection(format!("invalid address: {e}")))?;

    let bind_addr: SocketAddr = "0.0.0.0:0"
        .parse()
        .map_err(|e| TransportError::Connection(format!("bind address: {e}")))?;
    let mut endpoint = Endpoint::client(bind_addr)
        .map_err(|e| TransportError::Connection(format!("endpoint creation failed: {e}")))?;
    endpoint.set_default_client_config(insecure_client_config()?);

    let connection = endpoint
        .connect(addr, "localhost")
        .map_err(|e| TransportError::Connection(format!("connect failed: {e}")))?
        .await
        .map_err(|e| TransportError::Connection(format!("connection failed: {e}")))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<Frame>(32);

    let handle = tokio::spawn(run_connection(connection, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Bridge between the channels and QUIC streams.
async fn run_connection(
    connection: quinn::Connection,
    mut to_server: mpsc::Receiver<Frame>,
    from_server: mpsc::Sender<Frame>,
) {
    let conn_recv = connection.clone();
    let recv_handle = tokio::spawn(async move {
        loop {
            match conn_recv.accept_uni().await {
                Ok(recv) => {
                    let tx = from_server.clone();
                    tokio::spawn(async move {
                        if let Err(e) = read_frames(recv, tx).await {
                            tracing::debug!("incoming stream ended: {e}");
                        }
                    });
                },
                Err(e) => {
                    tracing::debug!("accept_uni ended: {e}");
                    break;
                },
            }
        }
    });

    while let Some(frame) = to_server.recv().await {
        match connection.open_bi().await {
            Ok((send, _recv)) => {
                if let Err(e) = write_frame(send, &frame).await {
                    tracing::warn!("send failed: {e}");
                }
            },
            Err(e) => {
                tracing::debug!("open_bi failed: {e}");
                break;
            },
        }
    }

    recv_handle.abort();
}

/// Read back-to-back frames from a relay stream until it closes.
async fn read_frames(
    mut recv: quinn::RecvStream,
    tx: mpsc::Sender<Frame>,
) -> Result<(), TransportError> {
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        buf.clear();
        buf.resize(FrameHeader::SIZE, 0);
        if recv.read_exact(&mut buf[..FrameHeader::SIZE]).await.is_err() {
            // Stream closed between frames
            return Ok(());
        }

        let payload_size = FrameHeader::from_bytes(&buf[..FrameHeader::SIZE])
            .map_err(|e| TransportError::Protocol(e.to_string()))?
            .payload_size() as usize;

        if payload_size > 0 {
            buf.resize(FrameHeader::SIZE + payload_size, 0);
            recv.read_exact(&mut buf[FrameHeader::SIZE..])
                .await
                .map_err(|e| TransportError::Stream(format!("payload read: {e}")))?;
        }

        let frame = Frame::decode(&buf).map_err(|e| TransportError::Protocol(e.to_string()))?;
        if tx.send(frame).await.is_err() {
            // Receiver side dropped; nothing left to deliver to
            return Ok(());
        }
    }
}

/// Write one frame to a fresh stream and finish it.
async fn write_frame(mut send: quinn::SendStream, frame: &Frame) -> Result<(), TransportError> {
    let bytes = frame.to_vec().map_err(|e| TransportError::Protocol(e.to_string()))?;
    send.write_all(&bytes).await.map_err(|e| TransportError::Stream(e.to_string()))?;
    send.finish().map_err(|e| TransportError::Stream(e.to_string()))?;
    Ok(())
}

/// Client TLS config that accepts any server certificate.
fn insecure_client_config() -> Result<ClientConfig, TransportError> {
    let mut tls = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    tls.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let quic = quinn::crypto::rustls::QuicClientConfig::try_from(tls)
        .map_err(|e| TransportError::Connection(format!("TLS config: {e}")))?;

    Ok(ClientConfig::new(Arc::new(quic)))
}

/// Certificate verifier that accepts anything (self-signed dev relays).
#[derive(Debug)]
struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider().signature_verification_algorithms.supported_schemes()
    }
}
