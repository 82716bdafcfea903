//! Tor control channel
//!
//! Thin layer over `stem-rs`: open a controller on the control port,
//! authenticate with whatever method the daemon advertises (null, password
//! or cookie), and send `SIGNAL NEWNYM`. Every exchange is bounded by a
//! timeout.

use std::net::SocketAddr;
use std::time::Duration;
use stem_rs::controller::Controller;
use stem_rs::Signal;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Errors from the control channel
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Invalid control address: {0}")]
    Address(String),

    #[error("Control port timed out after {0:?}")]
    Timeout(Duration),

    #[error("Control protocol error: {0}")]
    Tor(#[from] stem_rs::Error),
}

async fn resolve(addr: &str) -> Result<SocketAddr, ControlError> {
    tokio::net::lookup_host(addr)
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ControlError::Address(addr.to_string()))
}

/// Open an authenticated controller session
///
/// An empty password counts as none, letting the daemon pick null or
/// cookie authentication.
pub async fn connect_controller(
    addr: &str,
    password: Option<&str>,
    limit: Duration,
) -> Result<Controller, ControlError> {
    let socket = resolve(addr).await?;
    let password = password.filter(|pw| !pw.is_empty());

    let session = async {
        let mut controller = Controller::from_port(socket).await?;
        controller.authenticate(password).await?;
        Ok::<_, stem_rs::Error>(controller)
    };

    let controller = timeout(limit, session)
        .await
        .map_err(|_| ControlError::Timeout(limit))??;
    debug!("Authenticated to control port {}", addr);
    Ok(controller)
}

/// Connect and authenticate; success means circuit control works
pub async fn probe_control(
    addr: &str,
    password: Option<&str>,
    limit: Duration,
) -> Result<(), ControlError> {
    connect_controller(addr, password, limit).await.map(|_| ())
}

/// Authenticate and signal a new identity
pub async fn request_new_identity(
    addr: &str,
    password: Option<&str>,
    limit: Duration,
) -> Result<(), ControlError> {
    let mut controller = connect_controller(addr, password, limit).await?;
    timeout(limit, controller.signal(Signal::Newnym))
        .await
        .map_err(|_| ControlError::Timeout(limit))??;
    debug!("NEWNYM accepted by {}", addr);
    Ok(())
}

/// Whether something accepts TCP connections at `host:port`
pub async fn probe_port(host_port: &str, limit: Duration) -> bool {
    matches!(timeout(limit, TcpStream::connect(host_port)).await, Ok(Ok(_)))
}
