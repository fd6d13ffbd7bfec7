// Real-time delivery of uploads to desktop clients: the wire events and
// the per-session subscription groups that fan them out.

pub mod notifier;
pub mod protocol;

pub use notifier::{Connection, ConnectionId, Notifier};
pub use protocol::{ClientEvent, ServerEvent};
