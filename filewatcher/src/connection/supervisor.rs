//! Connection supervisor.
//!
//! Connects to the inventory server, identifies itself, reads the manifest
//! and hands it to the [`DownloadScheduler`]. Connection-level failures are
//! retried on a fixed interval until cancellation; a response that is not a
//! manifest abandons the attempt, but the supervisor keeps retrying.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::download::{join_all, DownloadScheduler, SyncReport};
use crate::protocol::{fetch_manifest, Manifest, ProtocolError, DEFAULT_CLIENT_ID};

/// Default delay between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1000);

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Inventory server host.
    pub server: String,
    /// Inventory server port.
    pub port: u16,
    /// Identity sent as the handshake.
    pub client_id: String,
    /// Delay between attempts.
    pub retry_interval: Duration,
}

impl SupervisorConfig {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

/// How a supervisor run ended.
#[derive(Debug)]
pub enum SupervisorOutcome {
    /// A manifest was fetched and every entry attempted.
    Synced { report: SyncReport, attempts: u32 },
    /// Cancellation was observed before a sync finished fetching.
    Cancelled { attempts: u32 },
}

impl SupervisorOutcome {
    /// Number of connection attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Synced { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Why one connection attempt failed.
#[derive(Debug)]
enum AttemptError {
    Connect(ConnectError),
    Protocol(ProtocolError),
    Cancelled,
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "{}", e),
            Self::Protocol(e) => write!(f, "{}", e),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A failed connect, with the resolved address that was last tried.
#[derive(Debug)]
struct ConnectError {
    address: Option<SocketAddr>,
    source: io::Error,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(address) => write!(f, "connect to {} failed: {}", address, self.source),
            None => write!(f, "address resolution failed: {}", self.source),
        }
    }
}

/// Resolve `host:port` and connect to the first address that accepts.
async fn connect(host: &str, port: u16) -> Result<(TcpStream, SocketAddr), ConnectError> {
    let addresses = lookup_host((host, port))
        .await
        .map_err(|source| ConnectError {
            address: None,
            source,
        })?;

    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect(address).await {
            Ok(stream) => return Ok((stream, address)),
            Err(source) => {
                debug!(%address, error = %source, "Connect attempt failed");
                last_error = Some(ConnectError {
                    address: Some(address),
                    source,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ConnectError {
        address: None,
        source: io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses"),
    }))
}

/// Owns the session with the inventory server.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    config: SupervisorConfig,
    scheduler: DownloadScheduler,
}

impl ConnectionSupervisor {
    pub fn new(config: SupervisorConfig, scheduler: DownloadScheduler) -> Self {
        Self { config, scheduler }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &DownloadScheduler {
        &self.scheduler
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.config.server, self.config.port)
    }

    /// Fetch the manifest, retrying until it arrives or `cancel` fires, then
    /// download every entry.
    ///
    /// Performs one fetch-and-download cycle.
    pub async fn run(&self, cancel: CancellationToken) -> SupervisorOutcome {
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                info!(attempts, "Cancelled before connecting");
                return SupervisorOutcome::Cancelled { attempts };
            }

            attempts += 1;
            match self.fetch(&cancel).await {
                Ok(manifest) => {
                    let report = self.sync(manifest, &cancel).await;
                    return SupervisorOutcome::Synced { report, attempts };
                }
                Err(AttemptError::Cancelled) => {
                    info!(attempts, "Cancelled while talking to the server");
                    return SupervisorOutcome::Cancelled { attempts };
                }
                Err(e) => self.log_failure(&e),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(attempts, "Cancelled while waiting to reconnect");
                    return SupervisorOutcome::Cancelled { attempts };
                }
                _ = tokio::time::sleep(self.config.retry_interval) => {}
            }
        }
    }

    /// One attempt: connect, identify, read the manifest, close.
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Manifest, AttemptError> {
        let endpoint = self.endpoint();

        let (mut stream, address) = tokio::select! {
            _ = cancel.cancelled() => return Err(AttemptError::Cancelled),
            connected = connect(&self.config.server, self.config.port) => {
                connected.map_err(AttemptError::Connect)?
            }
        };
        info!(server = %endpoint, %address, "Connected to server");

        let manifest = tokio::select! {
            _ = cancel.cancelled() => return Err(AttemptError::Cancelled),
            manifest = fetch_manifest(&mut stream, &self.config.client_id) => {
                manifest.map_err(AttemptError::Protocol)?
            }
        };

        if let Err(e) = stream.shutdown().await {
            debug!(server = %endpoint, error = %e, "Error closing server connection");
        }

        info!(
            server = %endpoint,
            server_path = %manifest.server_path.display(),
            files = manifest.len(),
            "Received manifest"
        );
        Ok(manifest)
    }

    fn log_failure(&self, e: &AttemptError) {
        let endpoint = self.endpoint();
        match e {
            AttemptError::Connect(c) if c.source.kind() == io::ErrorKind::ConnectionRefused => {
                warn!(
                    server = %endpoint,
                    address = ?c.address,
                    "The filewatched server cannot be reached"
                );
            }
            AttemptError::Connect(c) => {
                error!(
                    server = %endpoint,
                    address = ?c.address,
                    error = %c.source,
                    "Error connecting to server"
                );
            }
            AttemptError::Protocol(p) if p.is_transient() => {
                warn!(server = %endpoint, error = %p, "Connection lost while fetching manifest");
            }
            AttemptError::Protocol(p) => {
                error!(server = %endpoint, error = %p, "Server response is not a manifest");
            }
            AttemptError::Cancelled => {}
        }
    }

    async fn sync(&self, manifest: Manifest, cancel: &CancellationToken) -> SyncReport {
        let pending = self.scheduler.schedule(manifest.entries, cancel).await;
        let report = SyncReport::new(join_all(pending).await);
        info!(%report, "Sync finished");
        report
    }
}
