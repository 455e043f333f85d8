//! Blocking control socket to the SAM bridge.
//!
//! One `SamSocket` is one TCP connection that has completed HELLO version
//! negotiation. Every socket performs exactly one HELLO, on connect,
//! before any other traffic.

use std::io::{Read, Write};
use std::net::TcpStream;

use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::{self, ReplyStatus};

/// A control connection to the SAM bridge, ready for requests.
#[derive(Debug)]
pub struct SamSocket {
    stream: TcpStream,
    host: String,
    port: u16,
    min_version: String,
    max_version: String,
    version: String,
}

impl SamSocket {
    /// Connect to the bridge and perform the HELLO handshake.
    pub fn connect(
        host: &str,
        port: u16,
        min_version: &str,
        max_version: &str,
    ) -> Result<SamSocket> {
        let stream = TcpStream::connect((host, port))?;
        let mut socket = SamSocket {
            stream,
            host: host.to_string(),
            port,
            min_version: min_version.to_string(),
            max_version: max_version.to_string(),
            version: String::new(),
        };
        socket.handshake()?;
        Ok(socket)
    }

    /// Open a fresh connection with this socket's parameters.
    ///
    /// The new socket performs its own connect and HELLO.
    pub fn reopen(&self) -> Result<SamSocket> {
        SamSocket::connect(&self.host, self.port, &self.min_version, &self.max_version)
    }

    fn handshake(&mut self) -> Result<()> {
        let reply = self.request(&protocol::hello(&self.min_version, &self.max_version))?;
        match ReplyStatus::classify(&reply) {
            ReplyStatus::Ok => {
                self.version = protocol::get_value(&reply, "VERSION").to_string();
                Ok(())
            }
            status => Err(Error::Handshake { status }),
        }
    }

    /// Send one request line and read the reply line.
    pub fn request(&mut self, line: &str) -> Result<String> {
        trace!(request = line.trim_end(), "sam request");
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;
        let reply = self.read_line()?;
        trace!(reply = reply.trim_end(), "sam reply");
        Ok(reply)
    }

    // Reads one byte at a time so a socket detached after the reply keeps
    // every byte that follows the newline (ACCEPT/CONNECT hand the stream
    // to the caller).
    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if self.stream.read(&mut byte)? == 0 {
                if line.is_empty() {
                    return Err(Error::EmptyReply);
                }
                break;
            }
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Detach the underlying TCP stream, handing it to the caller.
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }

    /// Bridge host this socket is connected to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Bridge port this socket is connected to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Protocol version negotiated during HELLO.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Lowest version offered during HELLO.
    pub fn min_version(&self) -> &str {
        &self.min_version
    }

    /// Highest version offered during HELLO.
    pub fn max_version(&self) -> &str {
        &self.max_version
    }
}
