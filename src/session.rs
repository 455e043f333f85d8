//! SAM stream session state machine.
//!
//! A session owns one primary control socket and a list of forward
//! sockets. SESSION CREATE is issued exactly once, on the primary socket;
//! every other verb runs on its own fresh control socket re-bound to the
//! session id. A session-fatal failure flips the monotonic `sick` flag;
//! sick sessions are rebuilt by the supervisor, never repaired in place.

use std::fmt;
use std::net::TcpStream;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::constants::{
    PUBLIC_KEY_LEN, SESSION_ID_ALPHABET, SESSION_ID_MAX_LEN, SESSION_ID_MIN_LEN,
};
use crate::error::{Error, Result};
use crate::protocol::{self, ReplyStatus, SessionStyle};
use crate::socket::SamSocket;

/// Client-chosen identifier of a session on the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random id: 5 to 8 uppercase ASCII letters.
    ///
    /// Uniqueness is not checked client-side; a collision surfaces as
    /// DUPLICATED_ID from the bridge.
    pub fn generate() -> SessionId {
        let mut rng = rand::rng();
        let length = rng.random_range(SESSION_ID_MIN_LEN..=SESSION_ID_MAX_LEN);
        let id = (0..length)
            .map(|_| SESSION_ID_ALPHABET[rng.random_range(0..SESSION_ID_ALPHABET.len())] as char)
            .collect();
        SessionId(id)
    }

    /// The id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A destination key pair identifying an endpoint inside I2P.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Destination {
    /// Public key remote peers address; 516 characters.
    pub public: String,
    /// Private key blob; the public key is its 516-character prefix.
    pub private: String,
    /// True when the bridge minted this destination (`TRANSIENT` request).
    pub generated: bool,
}

impl Destination {
    /// Build a destination from the private key blob of a bridge reply.
    pub fn from_private(private: &str, generated: bool) -> Destination {
        let public = private.get(..PUBLIC_KEY_LEN).unwrap_or(private);
        Destination {
            public: public.to_string(),
            private: private.to_string(),
            generated,
        }
    }
}

/// An active STREAM FORWARD registration.
///
/// The socket is the subordinate control channel the forward was issued
/// on; the bridge streams inbound connections through it to `host:port`.
/// Dropping the socket cancels the forward.
#[derive(Debug)]
struct Forward {
    host: String,
    port: u16,
    silent: bool,
    _socket: SamSocket,
}

/// A STREAM-style SAM session.
///
/// Constructed via [`StreamSession::open`] or rebuilt from a sick session
/// via [`StreamSession::rebuild`]. Most callers want the self-healing
/// wrapper in [`crate::supervisor`] instead of using this directly.
#[derive(Debug)]
pub struct StreamSession {
    config: SessionConfig,
    id: SessionId,
    destination: Destination,
    control: Option<SamSocket>,
    forwards: Vec<Forward>,
    sick: bool,
}

impl StreamSession {
    /// Open a new session on the bridge.
    ///
    /// Never fails to return a session: when the control socket cannot be
    /// established or SESSION CREATE is rejected, the session is born sick
    /// and carries no destination.
    pub fn open(config: SessionConfig) -> StreamSession {
        let id = SessionId::generate();
        let generated = config.destination.is_transient();
        match Self::establish(&config, &id, config.destination.as_param(), generated) {
            Ok((control, destination)) => {
                debug!(id = %id, "session established");
                StreamSession {
                    config,
                    id,
                    destination,
                    control: Some(control),
                    forwards: Vec::new(),
                    sick: false,
                }
            }
            Err(error) => {
                warn!(id = %id, %error, "session creation failed");
                StreamSession {
                    config,
                    id,
                    destination: Destination::default(),
                    control: None,
                    forwards: Vec::new(),
                    sick: true,
                }
            }
        }
    }

    /// Rebuild a sick session from `donor`, reclaiming its destination.
    ///
    /// The donor is marked sick and loses its primary socket. The
    /// replacement gets a fresh id, issues SESSION CREATE with the donor's
    /// private key, and re-registers every donor forward on a fresh
    /// subordinate socket, in registration order. Any failure leaves the
    /// replacement sick; the donor stays sick regardless.
    pub fn rebuild(donor: &mut StreamSession) -> StreamSession {
        donor.fall_sick();
        donor.control = None;

        let id = SessionId::generate();
        // A donor that never obtained a key falls back to its configured
        // destination specifier.
        let (destination_param, generated) = if donor.destination.private.is_empty() {
            (
                donor.config.destination.as_param().to_string(),
                donor.config.destination.is_transient(),
            )
        } else {
            (donor.destination.private.clone(), donor.destination.generated)
        };

        let mut session =
            match Self::establish(&donor.config, &id, &destination_param, generated) {
                Ok((control, created)) => {
                    // The donor's key pair stays authoritative so a
                    // TRANSIENT-born destination keeps its generated flag.
                    let destination = if donor.destination.private.is_empty() {
                        created
                    } else {
                        donor.destination.clone()
                    };
                    debug!(id = %id, donor = %donor.id, "session rebuilt");
                    StreamSession {
                        config: donor.config.clone(),
                        id,
                        destination,
                        control: Some(control),
                        forwards: Vec::new(),
                        sick: false,
                    }
                }
                Err(error) => {
                    warn!(id = %id, donor = %donor.id, %error, "session rebuild failed");
                    return StreamSession {
                        config: donor.config.clone(),
                        id,
                        destination: donor.destination.clone(),
                        control: None,
                        forwards: Vec::new(),
                        sick: true,
                    };
                }
            };

        // Every donor forward is attempted, even after a failure, so one
        // bad registration cannot drop the ones behind it.
        let specs: Vec<(String, u16, bool)> = donor
            .forwards
            .iter()
            .map(|f| (f.host.clone(), f.port, f.silent))
            .collect();
        let mut reforward_failed = false;
        for (host, port, silent) in specs {
            if let Err(error) = session.forward(&host, port, silent) {
                warn!(%host, port, %error, "failed to re-establish forward");
                reforward_failed = true;
            }
        }
        if reforward_failed {
            session.fall_sick();
        }
        session
    }

    fn establish(
        config: &SessionConfig,
        id: &SessionId,
        destination: &str,
        generated: bool,
    ) -> Result<(SamSocket, Destination)> {
        let mut control = SamSocket::connect(
            &config.sam_host,
            config.sam_port,
            &config.min_version,
            &config.max_version,
        )?;
        let reply = control.request(&protocol::session_create(
            SessionStyle::Stream,
            id.as_str(),
            &config.nickname,
            destination,
            &config.options,
        ))?;
        expect_ok(&reply)?;
        let private = protocol::get_value(&reply, "DESTINATION");
        Ok((control, Destination::from_private(private, generated)))
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// Wait for one inbound stream and return its socket.
    ///
    /// Unless `silent` was requested, the bridge precedes peer data on the
    /// returned stream with a line naming the remote destination.
    pub fn accept(&mut self, silent: bool) -> Result<TcpStream> {
        let result = self.try_accept(silent);
        self.observe(result)
    }

    fn try_accept(&mut self, silent: bool) -> Result<TcpStream> {
        let mut socket = self.subordinate()?;
        let reply = socket.request(&protocol::stream_accept(self.id.as_str(), silent))?;
        expect_ok(&reply)?;
        Ok(socket.into_stream())
    }

    /// Open an outbound stream to `destination` (a public key) and return
    /// its socket.
    pub fn connect(&mut self, destination: &str, silent: bool) -> Result<TcpStream> {
        let result = self.try_connect(destination, silent);
        self.observe(result)
    }

    fn try_connect(&mut self, destination: &str, silent: bool) -> Result<TcpStream> {
        let mut socket = self.subordinate()?;
        let reply =
            socket.request(&protocol::stream_connect(self.id.as_str(), destination, silent))?;
        expect_ok(&reply)?;
        Ok(socket.into_stream())
    }

    /// Ask the bridge to route inbound streams to a local `host:port`.
    ///
    /// On success the subordinate socket is retained for the lifetime of
    /// the forward.
    pub fn forward(&mut self, host: &str, port: u16, silent: bool) -> Result<()> {
        let result = self.try_forward(host, port, silent);
        self.observe(result)
    }

    fn try_forward(&mut self, host: &str, port: u16, silent: bool) -> Result<()> {
        let mut socket = self.subordinate()?;
        let reply =
            socket.request(&protocol::stream_forward(self.id.as_str(), host, port, silent))?;
        expect_ok(&reply)?;
        debug!(id = %self.id, %host, port, silent, "forward registered");
        self.forwards.push(Forward {
            host: host.to_string(),
            port,
            silent,
            _socket: socket,
        });
        Ok(())
    }

    /// Resolve `name` to a destination key.
    pub fn naming_lookup(&mut self, name: &str) -> Result<String> {
        let result = self.try_naming_lookup(name);
        self.observe(result)
    }

    fn try_naming_lookup(&mut self, name: &str) -> Result<String> {
        let mut socket = self.subordinate()?;
        let reply = socket.request(&protocol::naming_lookup(name))?;
        expect_ok(&reply)?;
        Ok(protocol::get_value(&reply, "VALUE").to_string())
    }

    /// Mint a destination key pair unrelated to this session.
    pub fn dest_generate(&mut self) -> Result<Destination> {
        let result = self.try_dest_generate();
        self.observe(result)
    }

    fn try_dest_generate(&mut self) -> Result<Destination> {
        let mut socket = self.subordinate()?;
        // DEST REPLY carries no RESULT field; parse the key pair directly.
        let reply = socket.request(&protocol::dest_generate())?;
        let public = protocol::get_value(&reply, "PUB");
        let private = protocol::get_value(&reply, "PRIV");
        if public.is_empty() || private.is_empty() {
            return Err(Error::EmptyReply);
        }
        Ok(Destination {
            public: public.to_string(),
            private: private.to_string(),
            generated: true,
        })
    }

    // Every verb except SESSION CREATE runs on its own control socket; the
    // new socket performs its own HELLO.
    fn subordinate(&self) -> Result<SamSocket> {
        match &self.control {
            Some(control) => control.reopen(),
            None => SamSocket::connect(
                &self.config.sam_host,
                self.config.sam_port,
                &self.config.min_version,
                &self.config.max_version,
            ),
        }
    }

    fn observe<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if error.is_session_fatal() {
                self.fall_sick();
            }
        }
        result
    }

    fn fall_sick(&mut self) {
        if !self.sick {
            warn!(id = %self.id, "session fell sick");
            self.sick = true;
        }
    }

    // =========================================================================
    // Forward bookkeeping
    // =========================================================================

    /// Cancel every forward matching `host:port`.
    ///
    /// Duplicate registrations are all removed; other records are
    /// untouched. Dropping a forward's socket cancels it on the bridge.
    pub fn stop_forwarding(&mut self, host: &str, port: u16) {
        self.forwards
            .retain(|f| !(f.host == host && f.port == port));
    }

    /// Cancel every forward.
    pub fn stop_forwarding_all(&mut self) {
        self.forwards.clear();
    }

    /// Registered forward triples `(host, port, silent)` in registration
    /// order.
    pub fn forwards(&self) -> Vec<(String, u16, bool)> {
        self.forwards
            .iter()
            .map(|f| (f.host.clone(), f.port, f.silent))
            .collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Session id on the bridge.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Tunnel nickname.
    pub fn nickname(&self) -> &str {
        &self.config.nickname
    }

    /// I2CP options string.
    pub fn options(&self) -> &str {
        &self.config.options
    }

    /// This session's destination key pair.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Whether the session must be rebuilt before further use.
    pub fn is_sick(&self) -> bool {
        self.sick
    }

    /// SAM bridge host.
    pub fn sam_host(&self) -> &str {
        &self.config.sam_host
    }

    /// SAM bridge port.
    pub fn sam_port(&self) -> u16 {
        self.config.sam_port
    }

    /// SAM bridge address as `host:port`.
    pub fn sam_address(&self) -> String {
        format!("{}:{}", self.config.sam_host, self.config.sam_port)
    }

    /// Protocol version negotiated on the primary socket, empty when the
    /// session never came up.
    pub fn sam_version(&self) -> &str {
        self.control.as_ref().map(SamSocket::version).unwrap_or("")
    }

    /// Lowest version offered during HELLO.
    pub fn sam_min_version(&self) -> &str {
        &self.config.min_version
    }

    /// Highest version offered during HELLO.
    pub fn sam_max_version(&self) -> &str {
        &self.config.max_version
    }

    /// The configuration this session was built from.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        // Field drop order stops every forward before the primary socket
        // closes.
        debug!(id = %self.id, "closing SAM session");
    }
}

fn expect_ok(reply: &str) -> Result<()> {
    match ReplyStatus::classify(reply) {
        ReplyStatus::Ok => Ok(()),
        status => Err(Error::Bridge {
            status,
            message: protocol::get_value(reply, "MESSAGE").to_string(),
        }),
    }
}
