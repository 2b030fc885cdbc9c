//! Session context shared by every host callback

pub mod session;

pub use session::{Collaborators, HostSystems, Session};
