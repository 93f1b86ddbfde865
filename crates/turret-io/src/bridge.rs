use crate::metrics::{BRIDGE_CLIENTS, FRAMES_RECEIVED};
use crate::protocol::{decode_frame, StateMsg};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{atomic::AtomicBool, Arc};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use turret_core::{CommandExchange, TimeBase};

/// Longest line, terminator included, that is staged as a frame.
const MAX_FRAME_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_addr: String,
    /// `None` disables telemetry pushes.
    pub publish_interval: Option<Duration>,
    pub max_clients: usize,
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            publish_interval: Some(Duration::from_millis(100)),
            max_clients: 4,
            poll_interval: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to configure listener: {0}")]
    Listener(#[source] std::io::Error),
}

struct BridgeClient {
    stream: TcpStream,
    addr: SocketAddr,
    recv_buf: Vec<u8>,
    /// Set while skipping the rest of an oversized line.
    discarding: bool,
    send_buf: Vec<u8>,
    send_offset: usize,
}

impl BridgeClient {
    fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            stream,
            addr,
            recv_buf: Vec::with_capacity(256),
            discarding: false,
            send_buf: Vec::new(),
            send_offset: 0,
        }
    }

    /// Reads what is available and stages every complete frame. Returns false
    /// once the client should be dropped.
    fn receive(&mut self, exchange: &CommandExchange, timebase: &TimeBase) -> bool {
        let mut temp = [0u8; 512];
        loop {
            match self.stream.read(&mut temp) {
                Ok(0) => {
                    info!(client_addr = %self.addr, "Bridge client disconnected");
                    return false;
                }
                Ok(n) => self.frame(&temp[..n], exchange, timebase),
                Err(err) if err.kind() == ErrorKind::WouldBlock => return true,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(client_addr = %self.addr, error = %err, "Bridge read error");
                    return false;
                }
            }
        }
    }

    /// Splits received bytes into frames and stages each one. A line that
    /// grows past `MAX_FRAME_BYTES` is dropped in full, up to and including
    /// its terminator.
    fn frame(&mut self, mut bytes: &[u8], exchange: &CommandExchange, timebase: &TimeBase) {
        while !bytes.is_empty() {
            let newline = bytes.iter().position(|b| *b == b'\n');

            if self.discarding {
                match newline {
                    Some(pos) => {
                        self.discarding = false;
                        bytes = &bytes[pos + 1..];
                    }
                    None => return,
                }
                continue;
            }

            let end = newline.map_or(bytes.len(), |pos| pos + 1);
            self.recv_buf.extend_from_slice(&bytes[..end]);
            bytes = &bytes[end..];

            if newline.is_some() {
                FRAMES_RECEIVED.inc();
                if self.recv_buf.len() > MAX_FRAME_BYTES {
                    warn!(client_addr = %self.addr, "Oversized frame discarded");
                } else if let Some(token) = decode_frame(&self.recv_buf) {
                    debug!(client_addr = %self.addr, token = %token, "Frame received");
                    exchange.submit_token(&token, timebase.now_us());
                }
                self.recv_buf.clear();
            } else if self.recv_buf.len() > MAX_FRAME_BYTES {
                warn!(client_addr = %self.addr, "Oversized frame discarded");
                self.recv_buf.clear();
                self.discarding = true;
            }
        }
    }

    fn queue(&mut self, line: &[u8]) {
        // A slow reader skips telemetry instead of buffering without bound.
        if self.send_buf.is_empty() {
            self.send_buf.extend_from_slice(line);
            self.send_offset = 0;
        }
    }

    fn flush(&mut self) -> bool {
        while self.send_offset < self.send_buf.len() {
            match self.stream.write(&self.send_buf[self.send_offset..]) {
                Ok(0) => {
                    info!(client_addr = %self.addr, "Bridge client disconnected");
                    return false;
                }
                Ok(n) => self.send_offset += n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return true,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(client_addr = %self.addr, error = %err, "Bridge write error");
                    return false;
                }
            }
        }
        self.send_buf.clear();
        self.send_offset = 0;
        true
    }
}

/// Newline-delimited TCP transport for control tokens.
///
/// Any number of clients up to `max_clients` may send; they all feed the same
/// exchange and the last command wins. The bridge never touches actuator
/// state itself.
pub struct Bridge {
    listener: TcpListener,
    config: BridgeConfig,
    clients: Vec<BridgeClient>,
    last_publish: Instant,
    state_sequence: u64,
}

impl Bridge {
    pub fn bind(config: BridgeConfig) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(&config.bind_addr).map_err(|source| BridgeError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(BridgeError::Listener)?;

        Ok(Self {
            listener,
            config,
            clients: Vec::new(),
            last_publish: Instant::now(),
            state_sequence: 0,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// One non-blocking pass: accept, receive, publish, flush.
    pub fn poll_once(&mut self, exchange: &CommandExchange, timebase: &TimeBase) {
        self.accept_pending();

        self.clients
            .retain_mut(|client| client.receive(exchange, timebase));

        if let Some(interval) = self.config.publish_interval {
            if self.last_publish.elapsed() >= interval {
                self.state_sequence = self.state_sequence.wrapping_add(1);
                let snapshot = exchange.read_snapshot();
                let msg =
                    StateMsg::from_snapshot(&snapshot, self.state_sequence, timebase.unix_us());
                match msg.to_line() {
                    Ok(line) => {
                        for client in &mut self.clients {
                            client.queue(&line);
                        }
                    }
                    Err(err) => warn!(error = %err, "Failed to encode state message"),
                }
                self.last_publish = Instant::now();
            }
        }

        self.clients.retain_mut(BridgeClient::flush);
        BRIDGE_CLIENTS.set(self.clients.len() as f64);
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.clients.len() >= self.config.max_clients {
                        warn!(
                            client_addr = %addr,
                            max = self.config.max_clients,
                            "Bridge full, refusing client"
                        );
                        continue;
                    }
                    if let Err(err) = stream.set_nonblocking(true) {
                        warn!(
                            client_addr = %addr,
                            error = %err,
                            "Failed to set client nonblocking"
                        );
                        continue;
                    }
                    if let Err(err) = stream.set_nodelay(true) {
                        debug!(client_addr = %addr, error = %err, "Failed to set TCP_NODELAY");
                    }
                    info!(client_addr = %addr, "Bridge client connected");
                    self.clients.push(BridgeClient::new(stream, addr));
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return,
                Err(err) => {
                    warn!(error = %err, "Bridge accept error");
                    return;
                }
            }
        }
    }
}

pub fn run_bridge(
    exchange: Arc<CommandExchange>,
    timebase: TimeBase,
    config: BridgeConfig,
    stop: Arc<AtomicBool>,
) -> Result<(), BridgeError> {
    let poll_interval = config.poll_interval;
    let mut bridge = Bridge::bind(config)?;

    info!(
        addr = %bridge.config.bind_addr,
        max_clients = bridge.config.max_clients,
        telemetry = bridge.config.publish_interval.is_some(),
        "Bridge listening"
    );

    while !stop.load(std::sync::atomic::Ordering::Relaxed) {
        bridge.poll_once(&exchange, &timebase);
        std::thread::sleep(poll_interval);
    }

    BRIDGE_CLIENTS.set(0.0);
    Ok(())
}
