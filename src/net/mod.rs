//! Networking: wire codec, transport, replication and the join flow

pub mod join;
pub mod protocol;
pub mod sync;
pub mod transport;

pub use join::{JoinConfig, JoinTask};
pub use protocol::{NetMessage, ProtocolError};
pub use sync::{Dispatch, NetworkSync};
pub use transport::{HostStatus, ReceiveCallback, Transport, TransportError, UdpTransport};
