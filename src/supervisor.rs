//! Self-healing wrapper around a stream session.
//!
//! `ReconnectableSession` owns exactly one [`StreamSession`]. Before every
//! operation it checks the sick flag and, when set, rebuilds the session:
//! same destination, nickname, options, and version range, with every
//! registered forward re-established. A failed rebuild keeps the sick
//! session so the next operation tries again. Verb failures are reported
//! to the caller either way; healing only guarantees a refreshed session
//! for the next call.

use std::net::TcpStream;

use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{Destination, SessionId, StreamSession};

/// Public façade over one SAM stream session that transparently rebuilds
/// it when it falls sick.
#[derive(Debug)]
pub struct ReconnectableSession {
    session: StreamSession,
}

impl ReconnectableSession {
    /// Open a session and wrap it.
    pub fn open(config: SessionConfig) -> ReconnectableSession {
        ReconnectableSession {
            session: StreamSession::open(config),
        }
    }

    fn heal(&mut self) {
        if !self.session.is_sick() {
            return;
        }
        info!(id = %self.session.id(), "rebuilding sick session");
        let replacement = StreamSession::rebuild(&mut self.session);
        if replacement.is_sick() {
            warn!("session rebuild failed, keeping sick session");
        } else {
            self.session = replacement;
        }
    }

    /// Wait for one inbound stream; see [`StreamSession::accept`].
    pub fn accept(&mut self, silent: bool) -> Result<TcpStream> {
        self.heal();
        self.session.accept(silent)
    }

    /// Open an outbound stream; see [`StreamSession::connect`].
    pub fn connect(&mut self, destination: &str, silent: bool) -> Result<TcpStream> {
        self.heal();
        self.session.connect(destination, silent)
    }

    /// Register a forward; see [`StreamSession::forward`].
    pub fn forward(&mut self, host: &str, port: u16, silent: bool) -> Result<()> {
        self.heal();
        self.session.forward(host, port, silent)
    }

    /// Cancel every forward matching `host:port`.
    pub fn stop_forwarding(&mut self, host: &str, port: u16) {
        self.heal();
        self.session.stop_forwarding(host, port);
    }

    /// Cancel every forward.
    pub fn stop_forwarding_all(&mut self) {
        self.heal();
        self.session.stop_forwarding_all();
    }

    /// Resolve a name to a destination key.
    pub fn naming_lookup(&mut self, name: &str) -> Result<String> {
        self.heal();
        self.session.naming_lookup(name)
    }

    /// Mint a fresh destination key pair.
    pub fn dest_generate(&mut self) -> Result<Destination> {
        self.heal();
        self.session.dest_generate()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current session id on the bridge.
    pub fn id(&self) -> &SessionId {
        self.session.id()
    }

    /// This session's destination key pair.
    pub fn destination(&self) -> &Destination {
        self.session.destination()
    }

    /// Tunnel nickname.
    pub fn nickname(&self) -> &str {
        self.session.nickname()
    }

    /// I2CP options string.
    pub fn options(&self) -> &str {
        self.session.options()
    }

    /// SAM bridge host.
    pub fn sam_host(&self) -> &str {
        self.session.sam_host()
    }

    /// SAM bridge port.
    pub fn sam_port(&self) -> u16 {
        self.session.sam_port()
    }

    /// SAM bridge address as `host:port`.
    pub fn sam_address(&self) -> String {
        self.session.sam_address()
    }

    /// Negotiated protocol version.
    pub fn sam_version(&self) -> &str {
        self.session.sam_version()
    }

    /// Lowest version offered during HELLO.
    pub fn sam_min_version(&self) -> &str {
        self.session.sam_min_version()
    }

    /// Highest version offered during HELLO.
    pub fn sam_max_version(&self) -> &str {
        self.session.sam_max_version()
    }

    /// Whether the held session currently needs a rebuild.
    pub fn is_sick(&self) -> bool {
        self.session.is_sick()
    }

    /// Registered forward triples `(host, port, silent)` in registration
    /// order.
    pub fn forwards(&self) -> Vec<(String, u16, bool)> {
        self.session.forwards()
    }
}
