//! Client for the SAM v3 bridge protocol of an I2P router.
//!
//! This crate provides:
//! - The SAM request/reply codec (line-oriented `KEY=VALUE` grammar)
//! - A blocking control socket with HELLO version negotiation
//! - Stream sessions: SESSION CREATE, STREAM ACCEPT/CONNECT/FORWARD,
//!   NAMING LOOKUP, DEST GENERATE
//! - A self-healing session wrapper that rebuilds a failed session and
//!   re-establishes its forwards
//!
//! # Quick Start
//!
//! ```no_run
//! use sam_bridge::{ReconnectableSession, SessionConfig};
//!
//! let mut session = ReconnectableSession::open(SessionConfig::new("testapp"));
//! assert_eq!(session.destination().public.len(), 516);
//!
//! // Resolve a name, then open a stream to it.
//! let key = session.naming_lookup("example.i2p")?;
//! let stream = session.connect(&key, false)?;
//! # drop(stream);
//! # Ok::<(), sam_bridge::Error>(())
//! ```
//!
//! # Concurrency
//!
//! All I/O is synchronous and blocking; a session and its wrapper are not
//! safe to share across threads. Callers that need concurrency serialize
//! calls or keep one session per thread.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod socket;
pub mod supervisor;

pub use config::{DestinationSpec, SessionConfig};
pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};
pub use protocol::{ReplyStatus, SessionStyle};
pub use session::{Destination, SessionId, StreamSession};
pub use socket::SamSocket;
pub use supervisor::ReconnectableSession;
