//! # Scan Relay - phone camera input for a desktop session
//!
//! The desktop shows a QR code for a session, a phone scans it and uploads
//! photos, and every desktop connected to that session receives them over a
//! WebSocket as soon as they are stored.
//!
//! ## Pieces
//!
//! - **Session registry**: in-memory, ordered image lists per session
//! - **Realtime notifier**: per-session subscription groups with an atomic
//!   catch-up snapshot on join and live `new_image` pushes
//! - **Upload store**: per-session directories on disk
//! - **HTTP server**: QR code, upload and listing endpoints plus `/ws`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan_relay::{server, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     server::serve(config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod net;
pub mod qr;
pub mod realtime;
pub mod server;
pub mod session;
pub mod storage;

// Re-export main types for library consumers
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use realtime::{ClientEvent, Connection, Notifier, ServerEvent};
pub use server::AppState;
pub use session::{ImageRecord, SessionRegistry};
pub use storage::UploadStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
