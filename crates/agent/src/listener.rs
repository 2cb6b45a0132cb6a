// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager-push listener.
//!
//! A mutual-TLS server on all interfaces: the manager authenticates
//! with a client certificate signed by the pinned CA, pushes a framed
//! JSON message, and gets `ACK` back. Accepts time out after 60 seconds
//! so the stop token is observed even on an idle socket.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use silo_core::error::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{self, RECOGNIZED_FILES};
use crate::wire;

const ACCEPT_TIMEOUT: Duration = Duration::from_secs(60);

/// How many ports to probe upward from the configured starting port.
pub const PORT_SCAN_LIMIT: u16 = 1000;

/// Claim the first unbound port at or above `start`. The std listener
/// leaves `SO_REUSEADDR` unset, so a live listener is always detected.
pub fn select_listener_port(start: u16) -> Result<u16> {
    for offset in 0..PORT_SCAN_LIMIT {
        let Some(port) = start.checked_add(offset) else { break };
        if std::net::TcpListener::bind(("0.0.0.0", port)).is_ok() {
            return Ok(port);
        }
    }
    Err(Error::InvalidArgs(format!(
        "no free listener port within {PORT_SCAN_LIMIT} of {start}"
    )))
}

/// Connection-level protocol handling, independent of the transport so
/// it is testable over an in-memory stream.
pub struct PushHandler {
    pub data_dir: PathBuf,
    /// Last counter acknowledged to the manager.
    pub ack: Arc<AtomicU64>,
    /// Woken after every successful push: the reporter and both
    /// gatherers.
    pub wakeups: Vec<Arc<Notify>>,
}

impl PushHandler {
    /// One framed request per connection. A bad length prefix is
    /// answered with the error text and the connection is closed; the
    /// stream cannot be resynchronized after it.
    pub async fn serve_connection<S>(&self, mut stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut header = [0u8; wire::LENGTH_PREFIX_BYTES];
        stream.read_exact(&mut header).await?;
        let length = match wire::parse_length(&header) {
            Ok(length) => length,
            Err(e) => {
                let _ = stream.write_all(e.to_string().as_bytes()).await;
                let _ = stream.shutdown().await;
                return Err(e);
            }
        };
        let mut payload = vec![0u8; length];
        stream.read_exact(&mut payload).await?;

        match self.handle_message(&payload) {
            Ok(()) => {
                stream.write_all(wire::ACK).await?;
            }
            Err(e) => {
                let _ = stream.write_all(e.to_string().as_bytes()).await;
            }
        }
        stream.shutdown().await?;
        Ok(())
    }

    fn handle_message(&self, payload: &[u8]) -> Result<()> {
        let message = wire::parse_message(payload)?;
        self.ack.store(message.counter, Ordering::SeqCst);
        if let Some(files) = &message.config {
            for (name, content) in files {
                if !RECOGNIZED_FILES.contains(&name.as_str()) {
                    debug!(name, "ignoring unrecognized pushed file");
                    continue;
                }
                silo_host::layout::write_file(
                    &self.data_dir.join(name),
                    content.as_bytes(),
                    0o600,
                    None,
                )?;
                info!(name, "config file updated by manager push");
            }
        }
        for wakeup in &self.wakeups {
            wakeup.notify_one();
        }
        Ok(())
    }
}

pub struct MgrListener {
    port: u16,
    acceptor: TlsAcceptor,
    pub handler: Arc<PushHandler>,
    stop: CancellationToken,
}

impl MgrListener {
    /// Build the TLS acceptor from the agent's data dir: server cert and
    /// key from the manager, plus the pinned client CA.
    pub fn new(
        data_dir: PathBuf,
        port: u16,
        wakeups: Vec<Arc<Notify>>,
        stop: CancellationToken,
    ) -> Result<Self> {
        let certs = load_certs(&data_dir.join(config::LISTENER_CERT_FILE))?;
        let key = load_key(&data_dir.join(config::LISTENER_KEY_FILE))?;
        let mut roots = RootCertStore::empty();
        for cert in load_certs(&data_dir.join(config::ROOT_CERT_FILE))? {
            roots
                .add(cert)
                .map_err(|e| Error::InvalidConfig { which: format!("root cert: {e}") })?;
        }
        let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
            .build()
            .map_err(|e| Error::InvalidConfig { which: format!("client verifier: {e}") })?;
        let tls = rustls::ServerConfig::builder()
            .with_client_cert_verifier(verifier)
            .with_single_cert(certs, key)
            .map_err(|e| Error::InvalidConfig { which: format!("listener TLS: {e}") })?;
        Ok(Self {
            port,
            acceptor: TlsAcceptor::from(Arc::new(tls)),
            handler: Arc::new(PushHandler {
                data_dir,
                ack: Arc::new(AtomicU64::new(0)),
                wakeups,
            }),
            stop,
        })
    }

    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;
        info!(port = self.port, "manager-push listener ready");
        loop {
            if self.stop.is_cancelled() {
                break;
            }
            let accepted =
                match tokio::time::timeout(ACCEPT_TIMEOUT, listener.accept()).await {
                    Ok(Ok(accepted)) => accepted,
                    Ok(Err(e)) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                    // Idle window elapsed; loop to observe the stop flag.
                    Err(_) => continue,
                };
            let (socket, peer) = accepted;
            debug!(%peer, "manager connection");
            let stream = match self.acceptor.accept(socket).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(%peer, error = %e, "TLS handshake failed");
                    continue;
                }
            };
            if let Err(e) = self.handler.serve_connection(stream).await {
                warn!(%peer, error = %e, "push connection failed");
            }
        }
        info!("manager-push listener stopped");
        Ok(())
    }
}

fn load_certs(path: &std::path::Path) -> Result<Vec<CertificateDer<'static>>> {
    let data = std::fs::read(path)
        .map_err(|e| Error::InvalidConfig { which: format!("{}: {e}", path.display()) })?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut data.as_slice())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::InvalidConfig { which: format!("{}: {e}", path.display()) })?;
    if certs.is_empty() {
        return Err(Error::InvalidConfig {
            which: format!("{}: no certificates found", path.display()),
        });
    }
    Ok(certs)
}

fn load_key(path: &std::path::Path) -> Result<PrivateKeyDer<'static>> {
    let data = std::fs::read(path)
        .map_err(|e| Error::InvalidConfig { which: format!("{}: {e}", path.display()) })?;
    rustls_pemfile::private_key(&mut data.as_slice())
        .map_err(|e| Error::InvalidConfig { which: format!("{}: {e}", path.display()) })?
        .ok_or_else(|| Error::InvalidConfig {
            which: format!("{}: no private key found", path.display()),
        })
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
