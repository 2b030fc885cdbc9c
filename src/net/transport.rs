//! Best-effort datagram delivery between match participants

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Called with every received datagram that is not a reachability probe
pub type ReceiveCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Result of a host reachability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Transport: Send + Sync {
    /// Broadcast to every participant; never blocks, failures are dropped
    fn send_bytes(&self, bytes: Bytes);

    /// Probe whether a host answers at `addr` within `timeout`
    fn ping_host(&self, addr: SocketAddr, timeout: Duration) -> BoxFuture<'static, HostStatus>;

    fn set_receiver(&self, callback: ReceiveCallback);
}

/// Single-byte reachability probe; never a valid game message
const PROBE: u8 = 0xA5;
const PROBE_ACK: u8 = 0x5A;
const MAX_DATAGRAM: usize = 2048;

/// UDP transport sending every datagram to a fixed peer list
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peers: RwLock<Vec<SocketAddr>>,
    receiver: Arc<RwLock<Option<ReceiveCallback>>>,
    recv_task: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    /// Bind `addr` and start the receive task on `runtime`
    pub async fn bind(addr: SocketAddr, runtime: &Handle) -> Result<Arc<Self>, TransportError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!(addr = %socket.local_addr()?, "Transport bound");

        let transport = Arc::new(Self {
            socket: socket.clone(),
            peers: RwLock::new(Vec::new()),
            receiver: Arc::new(RwLock::new(None)),
            recv_task: Mutex::new(None),
        });

        let receiver = transport.receiver.clone();
        let task = runtime.spawn(receive_loop(socket, receiver));
        *transport.recv_task.lock() = Some(task);
        Ok(transport)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn set_peers(&self, peers: Vec<SocketAddr>) {
        debug!(count = peers.len(), "Transport peers updated");
        *self.peers.write() = peers;
    }

    pub fn add_peer(&self, peer: SocketAddr) {
        let mut peers = self.peers.write();
        if !peers.contains(&peer) {
            peers.push(peer);
        }
    }
}

impl Transport for UdpTransport {
    fn send_bytes(&self, bytes: Bytes) {
        for peer in self.peers.read().iter() {
            if let Err(e) = self.socket.try_send_to(&bytes, *peer) {
                debug!(peer = %peer, error = %e, "Datagram dropped");
            }
        }
    }

    fn ping_host(&self, addr: SocketAddr, timeout: Duration) -> BoxFuture<'static, HostStatus> {
        async move {
            let bind: SocketAddr = if addr.is_ipv4() {
                ([0, 0, 0, 0], 0).into()
            } else {
                ([0u16; 8], 0).into()
            };
            let socket = match UdpSocket::bind(bind).await {
                Ok(socket) => socket,
                Err(e) => {
                    warn!(error = %e, "Could not bind probe socket");
                    return HostStatus::Unknown;
                }
            };
            if let Err(e) = socket.send_to(&[PROBE], addr).await {
                debug!(addr = %addr, error = %e, "Probe send failed");
                return HostStatus::Offline;
            }

            let mut buf = [0u8; 1];
            match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
                Ok(Ok((1, from))) if buf[0] == PROBE_ACK && from == addr => HostStatus::Online,
                Ok(_) => HostStatus::Offline,
                Err(_) => HostStatus::Offline,
            }
        }
        .boxed()
    }

    fn set_receiver(&self, callback: ReceiveCallback) {
        *self.receiver.write() = Some(callback);
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.recv_task.lock().take() {
            task.abort();
        }
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, receiver: Arc<RwLock<Option<ReceiveCallback>>>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                // ICMP unreachable from a departed peer surfaces here on some platforms
                debug!(error = %e, "Receive error");
                continue;
            }
        };
        let datagram = &buf[..len];

        if datagram == [PROBE] {
            if let Err(e) = socket.send_to(&[PROBE_ACK], from).await {
                debug!(peer = %from, error = %e, "Probe reply failed");
            }
            continue;
        }

        trace!(peer = %from, len, "Datagram received");
        let callback = receiver.read().clone();
        if let Some(callback) = callback {
            callback(datagram);
        }
    }
}
