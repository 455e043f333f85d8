//! In-process mock SAM bridge for integration tests.
//!
//! Listens on an ephemeral local port and answers the SAM control grammar
//! from shared scripted state: sessions are tracked by id, forward
//! registrations are recorded, and failure modes (rejected creates,
//! invalidated sessions, refused connections) can be injected per test.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use sam_bridge::SessionConfig;
use sam_bridge::protocol::get_value;

/// Length of a private key blob minted by the mock (public prefix is 516).
const PRIVATE_KEY_LEN: usize = 628;

/// One recorded STREAM FORWARD registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRecord {
    pub session: String,
    pub host: String,
    pub port: u16,
    pub silent: bool,
}

#[derive(Default)]
struct BridgeState {
    /// Ids the bridge currently considers live.
    live: Vec<String>,
    /// Every id ever created, in order.
    created: Vec<String>,
    forwards: Vec<ForwardRecord>,
    names: HashMap<String, String>,
    /// `RESULT=` token for the next SESSION CREATE, consumed once.
    reject_next_create: Option<String>,
    /// `RESULT=` token for the next STREAM CONNECT, consumed once.
    reject_next_connect: Option<String>,
    /// Drop every new connection before reading anything.
    refuse_connections: bool,
    hello_count: usize,
    connection_count: usize,
    minted: usize,
}

/// A scripted SAM bridge on an ephemeral local port.
pub struct MockBridge {
    port: u16,
    state: Arc<Mutex<BridgeState>>,
}

impl MockBridge {
    pub fn start() -> MockBridge {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock bridge");
        let port = listener.local_addr().expect("local addr").port();
        let state = Arc::new(Mutex::new(BridgeState::default()));

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let refuse = {
                    let mut st = accept_state.lock().unwrap();
                    st.connection_count += 1;
                    st.refuse_connections
                };
                if refuse {
                    continue;
                }
                let conn_state = Arc::clone(&accept_state);
                thread::spawn(move || serve_connection(stream, conn_state));
            }
        });

        MockBridge { port, state }
    }

    /// A session config pointing at this bridge.
    pub fn config(&self, nickname: &str) -> SessionConfig {
        SessionConfig::new(nickname)
            .with_sam_host("127.0.0.1")
            .with_sam_port(self.port)
    }

    pub fn add_name(&self, name: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .names
            .insert(name.to_string(), value.to_string());
    }

    /// Answer the next SESSION CREATE with the given `RESULT=` token.
    pub fn reject_next_create(&self, status: &str) {
        self.state.lock().unwrap().reject_next_create = Some(status.to_string());
    }

    /// Answer the next STREAM CONNECT with the given `RESULT=` token.
    pub fn reject_next_connect(&self, status: &str) {
        self.state.lock().unwrap().reject_next_connect = Some(status.to_string());
    }

    /// Forget every live session, as a restarted router would.
    pub fn invalidate_sessions(&self) {
        self.state.lock().unwrap().live.clear();
    }

    pub fn set_refuse_connections(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_connections = refuse;
    }

    /// Every session id ever created, in creation order.
    pub fn created_sessions(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    /// Every recorded forward registration, in order.
    pub fn forwards(&self) -> Vec<ForwardRecord> {
        self.state.lock().unwrap().forwards.clone()
    }

    pub fn hello_count(&self) -> usize {
        self.state.lock().unwrap().hello_count
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().unwrap().connection_count
    }
}

/// Deterministic base64-alphabet private key blob for serial `n`.
pub fn mint_private_key(serial: usize) -> String {
    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-~";
    (0..PRIVATE_KEY_LEN)
        .map(|i| ALPHABET[(i * 31 + serial * 7 + 11) % ALPHABET.len()] as char)
        .collect()
}

fn serve_connection(stream: TcpStream, state: Arc<Mutex<BridgeState>>) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut writer = stream;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let reply = {
            let mut st = state.lock().unwrap();
            respond(&line, &mut st)
        };
        if writer.write_all(reply.as_bytes()).is_err() {
            return;
        }
    }
}

fn respond(line: &str, st: &mut BridgeState) -> String {
    if line.starts_with("HELLO VERSION") {
        st.hello_count += 1;
        "HELLO REPLY RESULT=OK VERSION=3.1\n".to_string()
    } else if line.starts_with("SESSION CREATE") {
        if let Some(status) = st.reject_next_create.take() {
            return format!("SESSION STATUS RESULT={status}\n");
        }
        let id = get_value(line, "ID").to_string();
        if st.live.contains(&id) {
            return "SESSION STATUS RESULT=DUPLICATED_ID\n".to_string();
        }
        let destination = get_value(line, "DESTINATION").to_string();
        let private = if destination == "TRANSIENT" {
            st.minted += 1;
            mint_private_key(st.minted)
        } else {
            destination
        };
        st.live.push(id.clone());
        st.created.push(id);
        format!("SESSION STATUS RESULT=OK DESTINATION={private}\n")
    } else if line.starts_with("STREAM ACCEPT") {
        stream_status(st, get_value(line, "ID"), None)
    } else if line.starts_with("STREAM CONNECT") {
        let rejection = st.reject_next_connect.take();
        stream_status(st, get_value(line, "ID"), rejection)
    } else if line.starts_with("STREAM FORWARD") {
        let id = get_value(line, "ID").to_string();
        if !st.live.contains(&id) {
            return "STREAM STATUS RESULT=INVALID_ID\n".to_string();
        }
        st.forwards.push(ForwardRecord {
            session: id,
            host: get_value(line, "HOST").to_string(),
            port: get_value(line, "PORT").parse().unwrap_or(0),
            silent: get_value(line, "SILENT") == "true",
        });
        "STREAM STATUS RESULT=OK\n".to_string()
    } else if line.starts_with("NAMING LOOKUP") {
        let name = get_value(line, "NAME");
        match st.names.get(name) {
            Some(value) => format!("NAMING REPLY RESULT=OK NAME={name} VALUE={value}\n"),
            None => format!("NAMING REPLY RESULT=KEY_NOT_FOUND NAME={name}\n"),
        }
    } else if line.starts_with("DEST GENERATE") {
        st.minted += 1;
        let private = mint_private_key(st.minted);
        format!("DEST REPLY PUB={} PRIV={private}\n", &private[..516])
    } else {
        "SESSION STATUS RESULT=I2P_ERROR MESSAGE=unrecognized\n".to_string()
    }
}

fn stream_status(st: &BridgeState, id: &str, rejection: Option<String>) -> String {
    if !st.live.iter().any(|s| s == id) {
        return "STREAM STATUS RESULT=INVALID_ID\n".to_string();
    }
    match rejection {
        Some(status) => format!("STREAM STATUS RESULT={status}\n"),
        None => "STREAM STATUS RESULT=OK\n".to_string(),
    }
}
