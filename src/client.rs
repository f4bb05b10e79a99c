//! The connection state machine and public client object (§4.5, §4.7).
//!
//! The driving loop owns a `Client<T>` and calls [`Client::on_readable`],
//! [`Client::on_writable`] and [`Client::on_timer`] as the reactor reports
//! those conditions; the client never blocks and never spawns anything of
//! its own. Lifecycle notifications come back out through [`Client::events`]
//! rather than through stored callbacks, so the engine never re-enters
//! itself from inside a callback — the same shape as the reference
//! networking layer's `sync()` + `changes()` split.

use crate::buffer::Buffer;
use crate::error::{Flow, WsError};
use crate::frame::{self, OpCode};
use crate::handshake;
use crate::keepalive::{Keepalive, Tick};
use crate::transport::{HandshakeStatus, Transport};
use crate::url::WsUrl;
use std::time::{Duration, Instant};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
const PING_PAYLOAD: &[u8] = b"tinywsc";

/// The connection's current phase. Carries the per-state data it needs so
/// invalid combinations (e.g. a payload length without a known opcode) are
/// unrepresentable, per the tagged-variant redesign over an integer + flags.
enum ConnState {
    Connecting,
    TlsHandshake,
    HttpHandshake,
    /// Covers both "waiting for a 2-byte head" and "waiting for the rest of
    /// an extended length" — `frame::decode_header` already reports which of
    /// those it is by returning `Ok(None)` until enough bytes are present,
    /// so a further substate split would only duplicate that bookkeeping.
    ParseHead,
    ParsePayload { opcode: OpCode, total_len: usize },
    Closed,
}

/// A lifecycle or data notification produced by the engine. The embedder
/// drains these after each `on_readable`/`on_writable`/`on_timer` call.
#[derive(Debug)]
pub enum Event {
    Open,
    Message { data: Vec<u8>, binary: bool },
    /// Terminal: the client has already torn itself down by the time this is
    /// produced, and no further events will follow.
    Error(WsError),
    /// Terminal on a peer-initiated or orderly close. `code` is 1006 (RFC
    /// 6455's "abnormal closure" placeholder) when the peer dropped the
    /// connection without sending a CLOSE frame.
    Close { code: u16, reason: String },
}

pub struct ClientBuilder {
    url: WsUrl,
    ping_interval: Duration,
    connect_timeout: Duration,
    extra_header: String,
    max_message_size: usize,
    log: slog::Logger,
    #[cfg(feature = "rustls-tls")]
    tls_config: Option<std::sync::Arc<rustls::ClientConfig>>,
}

impl ClientBuilder {
    pub fn new(url: &str) -> Result<ClientBuilder, WsError> {
        Ok(ClientBuilder {
            url: WsUrl::parse(url)?,
            ping_interval: Duration::from_secs(0),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            extra_header: String::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            log: crate::logging::discard(),
            #[cfg(feature = "rustls-tls")]
            tls_config: None,
        })
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Must already end in CRLF if non-empty; inserted verbatim before the
    /// blank line terminating the handshake request.
    pub fn extra_header(mut self, header: impl Into<String>) -> Self {
        self.extra_header = header.into();
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn logger(mut self, log: slog::Logger) -> Self {
        self.log = log;
        self
    }

    /// Supply a custom trust store/config for `wss://` connections built via
    /// [`ClientBuilder::build_tls`]. Without this, `build_tls` falls back to
    /// the bundled `webpki-roots` trust store.
    #[cfg(feature = "rustls-tls")]
    pub fn tls_config(mut self, config: std::sync::Arc<rustls::ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    pub fn url(&self) -> &WsUrl {
        &self.url
    }

    /// Finish construction once the embedder has connected `transport` (a
    /// non-blocking socket, already `connect()`-started) and registered it
    /// with their reactor. The handshake request is composed into the egress
    /// buffer immediately but is not sent until the first writable event.
    pub fn build<T: Transport>(self, transport: T, now: Instant) -> Client<T> {
        let client_key = handshake::generate_key();
        let mut write_buf = Buffer::new();
        write_buf.put_data(&handshake::build_request(&self.url, &client_key, &self.extra_header));

        Client {
            transport,
            state: ConnState::Connecting,
            read_buf: Buffer::new(),
            write_buf,
            client_key,
            url: self.url,
            connect_started: now,
            connect_timeout: self.connect_timeout,
            keepalive: Keepalive::new(self.ping_interval, now),
            max_message_size: self.max_message_size,
            log: self.log,
            events: Vec::new(),
        }
    }

    /// Same as [`ClientBuilder::build`], but layers a TLS session over
    /// `sock` first (using [`ClientBuilder::tls_config`] if set, or the
    /// bundled trust store otherwise) and drives the handshake with the
    /// connection's SNI name set from the URL's host.
    #[cfg(feature = "rustls-tls")]
    pub fn build_tls(
        self,
        sock: std::net::TcpStream,
        now: Instant,
    ) -> Result<Client<crate::transport::rustls_session::RustlsTransport>, WsError> {
        let config = self
            .tls_config
            .clone()
            .unwrap_or_else(crate::transport::rustls_session::default_config);
        let server_name = <rustls::ServerName as std::convert::TryFrom<&str>>::try_from(self.url.host.as_str())
            .map_err(|e| WsError::SslHandshake(e.to_string()))?;
        let conn = rustls::ClientConnection::new(config, server_name).map_err(|e| WsError::SslHandshake(e.to_string()))?;
        let transport = crate::transport::rustls_session::RustlsTransport::new(conn, sock);
        Ok(self.build(transport, now))
    }
}

pub struct Client<T: Transport> {
    transport: T,
    state: ConnState,
    read_buf: Buffer,
    write_buf: Buffer,
    client_key: String,
    url: WsUrl,
    connect_started: Instant,
    connect_timeout: Duration,
    keepalive: Keepalive,
    max_message_size: usize,
    log: slog::Logger,
    events: Vec<Event>,
}

impl<T: Transport> Client<T> {
    pub fn url(&self) -> &WsUrl {
        &self.url
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ConnState::Closed)
    }

    /// Whether the egress buffer currently has bytes the reactor should be
    /// watching writability for.
    pub fn wants_write(&self) -> bool {
        !matches!(self.state, ConnState::Closed) && (!self.write_buf.is_empty() || matches!(self.state, ConnState::Connecting))
    }

    /// Whether there is egress data waiting to be flushed. Unlike
    /// [`Client::wants_write`] this does *not* include the `Connecting`
    /// state: connect completion may only be discovered through an actual
    /// writable readiness notification from the reactor (checking
    /// `SO_ERROR` before that fires would read "no error yet" as success).
    /// Safe to poll opportunistically between readiness edges.
    pub fn has_pending_egress(&self) -> bool {
        !matches!(self.state, ConnState::Closed | ConnState::Connecting) && !self.write_buf.is_empty()
    }

    /// Drain pending lifecycle/data events produced by the last I/O or timer
    /// callback. Once an `Event::Error` or `Event::Close` is drained, no
    /// further calls into this client are meaningful.
    pub fn events(&mut self) -> std::vec::Drain<'_, Event> {
        self.events.drain(..)
    }

    /// Enqueue a single masked data or control frame (§4.7's short-path
    /// variant). Rejects payloads of 2^32 bytes or more with `NotSupported`;
    /// use [`Client::send_long`] to bypass that ceiling for payloads up to
    /// the platform word size.
    pub fn send(&mut self, opcode: OpCode, payload: &[u8]) -> Result<(), WsError> {
        if payload.len() as u64 >= 1u64 << 32 {
            return Err(WsError::NotSupported("too-large".into()));
        }
        self.send_long(opcode, payload)
    }

    /// Enqueue a single masked data or control frame (§4.7's long-path
    /// variant), accepting payloads up to `usize::MAX` — the frame encoder's
    /// 64-bit extended-length header can address more than a single
    /// contiguous `&[u8]` can ever hold anyway. Most callers want
    /// [`Client::send`] instead.
    pub fn send_long(&mut self, opcode: OpCode, payload: &[u8]) -> Result<(), WsError> {
        if self.is_closed() {
            return Err(WsError::NotSupported("send on closed client".into()));
        }
        self.write_buf.put_data(&frame::encode(opcode, payload));
        Ok(())
    }

    pub fn send_close(&mut self, code: u16, reason: &[u8]) -> Result<(), WsError> {
        if self.is_closed() {
            return Ok(());
        }
        self.write_buf.put_data(&frame::encode_close(code, reason));
        Ok(())
    }

    pub fn ping(&mut self) -> Result<(), WsError> {
        self.send(OpCode::Ping, PING_PAYLOAD)
    }

    /// Tear down resources and mark the client terminal. Idempotent.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        slog::debug!(self.log, "closing client"; "host" => &self.url.host);
        self.state = ConnState::Closed;
    }

    fn fail(&mut self, err: WsError) {
        slog::debug!(self.log, "client failed"; "kind" => err.kind(), "message" => %err);
        self.close();
        self.events.push(Event::Error(err));
    }

    /// 1 Hz timer tick: connect-deadline and ping/pong supervision (§4.6).
    pub fn on_timer(&mut self, now: Instant) {
        if self.is_closed() {
            return;
        }

        if matches!(self.state, ConnState::Connecting) && now.duration_since(self.connect_started) > self.connect_timeout {
            self.fail(WsError::Connect("timed out waiting for connection".into()));
            return;
        }

        if !matches!(self.state, ConnState::ParseHead | ConnState::ParsePayload { .. }) {
            return;
        }

        match self.keepalive.tick(now) {
            Tick::Noop => {}
            Tick::SendPing => {
                slog::trace!(self.log, "sending keepalive ping");
                if let Err(e) = self.send(OpCode::Ping, PING_PAYLOAD) {
                    self.fail(e);
                }
            }
            Tick::TimedOut => {
                self.fail(WsError::PingTimeout(self.keepalive.consecutive_timeouts()));
            }
        }
    }

    pub fn on_writable(&mut self, now: Instant) {
        if self.is_closed() {
            return;
        }

        if matches!(self.state, ConnState::Connecting) {
            match self.transport.take_error() {
                Ok(None) => {
                    self.state = ConnState::TlsHandshake;
                    self.advance_tls(now);
                }
                Ok(Some(e)) => self.fail(WsError::Connect(e.to_string())),
                Err(e) => self.fail(WsError::Connect(e.to_string())),
            }
            return;
        }

        if matches!(self.state, ConnState::TlsHandshake) {
            self.advance_tls(now);
            return;
        }

        self.flush_egress();
    }

    fn advance_tls(&mut self, _now: Instant) {
        match self.transport.tls_handshake() {
            Ok(HandshakeStatus::Complete) => {
                slog::debug!(self.log, "handshake transport ready"; "tls" => self.url.tls);
                self.state = ConnState::HttpHandshake;
                self.flush_egress();
            }
            Ok(HandshakeStatus::Pending) => {}
            Err(e) => self.fail(e),
        }
    }

    fn flush_egress(&mut self) {
        loop {
            if self.write_buf.is_empty() {
                return;
            }
            match Flow::from(self.write_buf.egress(&mut self.transport)) {
                Flow::Progress(0) => return,
                Flow::Progress(_) => continue,
                Flow::Suspend => return,
                Flow::Fatal(e) => {
                    self.fail(e);
                    return;
                }
            }
        }
    }

    pub fn on_readable(&mut self, now: Instant) {
        if self.is_closed() {
            return;
        }

        if matches!(self.state, ConnState::Connecting | ConnState::TlsHandshake) {
            self.advance_tls(now);
            if self.is_closed() {
                return;
            }
        }

        loop {
            match Flow::from(self.read_buf.ingress(&mut self.transport)) {
                Flow::Progress(0) => {
                    self.handle_eof();
                    return;
                }
                Flow::Progress(_) => {}
                Flow::Suspend => break,
                Flow::Fatal(e) => {
                    self.fail(e);
                    return;
                }
            }

            if !self.process_buffered(now) {
                return;
            }
        }

        self.process_buffered(now);
    }

    fn handle_eof(&mut self) {
        if self.is_closed() {
            return;
        }
        self.close();
        self.events.push(Event::Close {
            code: 1006,
            reason: "unexpected EOF".to_string(),
        });
    }

    /// Drains as much of `read_buf` as the current state allows. Returns
    /// `false` if the client closed itself while processing (caller should
    /// stop reading more).
    fn process_buffered(&mut self, now: Instant) -> bool {
        loop {
            match self.state {
                ConnState::HttpHandshake => {
                    if !self.try_parse_handshake() {
                        return !self.is_closed();
                    }
                }
                ConnState::ParseHead => {
                    if !self.try_parse_head() {
                        return !self.is_closed();
                    }
                }
                ConnState::ParsePayload { .. } => {
                    if !self.try_parse_payload(now) {
                        return !self.is_closed();
                    }
                }
                ConnState::Connecting | ConnState::TlsHandshake | ConnState::Closed => return !self.is_closed(),
            }

            if self.is_closed() {
                return false;
            }
        }
    }

    fn try_parse_handshake(&mut self) -> bool {
        let end = match handshake::find_header_end(self.read_buf.readable()) {
            Some(e) => e,
            None => return false,
        };

        let headers = self.read_buf.readable()[..end - 4].to_vec();
        match handshake::validate_response(&headers, &self.client_key) {
            Ok(()) => {
                self.read_buf.skip(end);
                slog::debug!(self.log, "handshake accepted"; "host" => &self.url.host);
                self.state = ConnState::ParseHead;
                self.events.push(Event::Open);
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    fn try_parse_head(&mut self) -> bool {
        let parsed = match frame::decode_header(&self.read_buf) {
            Ok(p) => p,
            Err(WsError::UnknownOpcode(op)) => {
                self.send_close(1002, b"unknown opcode").ok();
                self.flush_egress();
                self.fail(WsError::UnknownOpcode(op));
                return false;
            }
            Err(WsError::PayloadTooLarge) => {
                self.send_close(1009, b"message too large").ok();
                self.flush_egress();
                self.fail(WsError::PayloadTooLarge);
                return false;
            }
            Err(e) => {
                self.fail(e);
                return false;
            }
        };

        let (header, header_len) = match parsed {
            Some(v) => v,
            None => return false,
        };

        if !header.fin || header.opcode == OpCode::Continuation {
            self.fail(WsError::NotSupported("fragmented frames are not supported".into()));
            return false;
        }

        if header.masked {
            self.fail(WsError::ServerMasked);
            return false;
        }

        let total_len = header.payload_len as usize;
        if total_len > self.max_message_size {
            self.send_close(1009, b"message too large").ok();
            self.flush_egress();
            self.fail(WsError::NotSupported(format!(
                "payload of {} bytes exceeds the {}-byte limit",
                total_len, self.max_message_size
            )));
            return false;
        }

        self.read_buf.skip(header_len);
        self.state = ConnState::ParsePayload {
            opcode: header.opcode,
            total_len,
        };
        true
    }

    fn try_parse_payload(&mut self, _now: Instant) -> bool {
        let (opcode, total_len) = match self.state {
            ConnState::ParsePayload { opcode, total_len } => (opcode, total_len),
            _ => unreachable!(),
        };

        if self.read_buf.len() < total_len {
            return false;
        }

        let mut payload = vec![0u8; total_len];
        self.read_buf.pull(total_len, Some(&mut payload));
        self.state = ConnState::ParseHead;

        self.dispatch_frame(opcode, payload);
        !self.is_closed()
    }

    fn dispatch_frame(&mut self, opcode: OpCode, payload: Vec<u8>) {
        match opcode {
            OpCode::Text => {
                slog::trace!(self.log, "received text frame"; "len" => payload.len());
                self.events.push(Event::Message { data: payload, binary: false });
            }
            OpCode::Binary => {
                slog::trace!(self.log, "received binary frame"; "len" => payload.len());
                self.events.push(Event::Message { data: payload, binary: true });
            }
            OpCode::Ping => {
                slog::trace!(self.log, "received ping, replying with pong");
                if let Err(e) = self.send(OpCode::Pong, &payload) {
                    self.fail(e);
                }
            }
            OpCode::Pong => {
                self.keepalive.on_pong();
            }
            OpCode::Close => {
                let (code, reason) = parse_close_payload(&payload);
                slog::debug!(self.log, "received close frame"; "code" => code);
                self.close();
                self.events.push(Event::Close { code, reason });
            }
            OpCode::Continuation => unreachable!("rejected in try_parse_head"),
        }
    }
}

/// Destruction is idempotent whether the embedder calls [`Client::close`]
/// explicitly or simply drops the value (§3): both paths go through the same
/// state transition and logging.
impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_close_payload(payload: &[u8]) -> (u16, String) {
    if payload.len() < 2 {
        return (1005, String::new());
    }
    let code = u16::from_be_bytes([payload[0], payload[1]]);
    let reason = String::from_utf8_lossy(&payload[2..]).into_owned();
    (code, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockPipe;
    use std::convert::TryInto;

    fn handshake_response(key: &str) -> Vec<u8> {
        let accept = handshake::accept_value(key);
        format!(
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
            accept
        )
        .into_bytes()
    }

    fn connected_client(now: Instant) -> Client<MockPipe> {
        let builder = ClientBuilder::new("ws://example.invalid/chat").unwrap();
        let pipe = MockPipe::new();
        let mut client = builder.build(pipe, now);
        client.on_writable(now); // connect completes
        client.on_writable(now); // flush handshake request
        let response = handshake_response(&client.client_key);
        client.transport.feed(&response);
        client.on_readable(now);
        client
    }

    #[test]
    fn test_happy_path_fires_open_then_delivers_message() {
        let now = Instant::now();
        let mut client = connected_client(now);
        let events: Vec<_> = client.events().collect();
        assert!(matches!(events[..], [Event::Open]));

        client.send(OpCode::Text, b"hi").unwrap();
        assert!(!client.transport.outbound.is_empty());

        let server_frame = frame_from_server(OpCode::Text, b"hello back");
        client.transport.feed(&server_frame);
        client.on_readable(now);

        let events: Vec<_> = client.events().collect();
        match &events[..] {
            [Event::Message { data, binary }] => {
                assert_eq!(data, b"hello back");
                assert!(!binary);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    fn frame_from_server(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
        // Server frames are never masked.
        let mut out = vec![0x80 | opcode.to_byte()];
        assert!(payload.len() < 126);
        out.push(payload.len() as u8);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_accept_mismatch_fails_before_open() {
        let now = Instant::now();
        let builder = ClientBuilder::new("ws://example.invalid/chat").unwrap();
        let pipe = MockPipe::new();
        let mut client = builder.build(pipe, now);
        client.on_writable(now);
        client.on_writable(now);

        let bad = "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: AAAAAAAAAAAAAAAAAAAAAAAAAAAA\r\n\r\n";
        client.transport.feed(bad.as_bytes());
        client.on_readable(now);

        let events: Vec<_> = client.events().collect();
        match &events[..] {
            [Event::Error(e)] => assert_eq!(e.kind(), "INVALID_HEADER"),
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(client.is_closed());
    }

    #[test]
    fn test_unknown_opcode_sends_protocol_error_close_before_failing() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.events(); // drain Open
        let prefix_len = client.transport.outbound.len();

        // Opcode 0x3 is reserved, non-control, and unknown to this engine.
        client.transport.feed(&[0x83, 0x00]);
        client.on_readable(now);

        let events: Vec<_> = client.events().collect();
        match &events[..] {
            [Event::Error(e)] => assert_eq!(e.kind(), "NOT_SUPPORT"),
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(client.is_closed());

        let mut outbound_buf = Buffer::new();
        outbound_buf.put_data(&client.transport.outbound[prefix_len..]);
        let (header, _) = frame::decode_header(&outbound_buf).unwrap().unwrap();
        assert_eq!(header.opcode, OpCode::Close);
    }

    #[test]
    fn test_masked_server_frame_is_rejected() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.events(); // drain Open

        client.transport.feed(&[0x81, 0x80, 0, 0, 0, 0]);
        client.on_readable(now);

        let events: Vec<_> = client.events().collect();
        match &events[..] {
            [Event::Error(e)] => assert_eq!(e.kind(), "SERVER_MASKED"),
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_large_frame_delivered_intact() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.events();

        let payload = vec![0x42u8; 70000];
        let mut wire = vec![0x81, 0x7F];
        wire.extend_from_slice(&70000u64.to_be_bytes());
        wire.extend_from_slice(&payload);
        client.transport.feed(&wire);
        client.on_readable(now);

        let events: Vec<_> = client.events().collect();
        match &events[..] {
            [Event::Message { data, binary }] => {
                assert_eq!(data.len(), 70000);
                assert_eq!(data, &payload);
                assert!(!binary);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_ping_from_server_triggers_pong() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.events();
        let prefix_len = client.transport.outbound.len();

        client.transport.feed(&frame_from_server(OpCode::Ping, b"abc"));
        client.on_readable(now);

        client.on_writable(now);
        let mut outbound_buf = Buffer::new();
        outbound_buf.put_data(&client.transport.outbound[prefix_len..]);
        let (header, header_len) = frame::decode_header(&outbound_buf).unwrap().unwrap();
        assert_eq!(header.opcode, OpCode::Pong);

        let mask_start = prefix_len + header_len;
        let key: crate::mask::MaskKey = client.transport.outbound[mask_start..mask_start + 4].try_into().unwrap();
        let mut body = client.transport.outbound[mask_start + 4..].to_vec();
        crate::mask::apply(&key, &mut body);
        assert_eq!(body, b"abc");
    }

    #[test]
    fn test_orderly_close_from_server() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.events();

        client.transport.feed(&frame_from_server(OpCode::Close, &[0x03, 0xE8]));
        client.on_readable(now);

        let events: Vec<_> = client.events().collect();
        match &events[..] {
            [Event::Close { code, reason }] => {
                assert_eq!(*code, 1000);
                assert_eq!(reason, "");
            }
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(client.is_closed());
    }

    #[test]
    fn test_eof_without_close_frame_reports_abnormal_closure() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.events();

        // MockPipe reports WouldBlock, not EOF, when empty; simulate EOF by
        // swapping in an always-EOF reader via a fresh client state change.
        client.handle_eof();

        let events: Vec<_> = client.events().collect();
        match &events[..] {
            [Event::Close { code, reason }] => {
                assert_eq!(*code, 1006);
                assert_eq!(reason, "unexpected EOF");
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_ping_timeout_closes_connection() {
        let now = Instant::now();
        let builder = ClientBuilder::new("ws://example.invalid/chat")
            .unwrap()
            .ping_interval(Duration::from_secs(1));
        let pipe = MockPipe::new();
        let mut client = builder.build(pipe, now);
        client.on_writable(now);
        client.on_writable(now);
        let response = handshake_response(&client.client_key);
        client.transport.feed(&response);
        client.on_readable(now);
        client.events();

        let mut t = now;
        let mut timed_out = false;
        for _ in 0..40 {
            t += Duration::from_secs(1);
            client.on_timer(t);
            if client.events.iter().any(|e| matches!(e, Event::Error(WsError::PingTimeout(_)))) {
                timed_out = true;
                break;
            }
        }
        assert!(timed_out, "expected a ping timeout within 40 ticks");
    }

    #[test]
    fn test_drop_tears_down_without_explicit_close() {
        let now = Instant::now();
        let client = connected_client(now);
        // No explicit `close()` call: dropping here must still mark the
        // client terminal exactly once (via `impl Drop`), not leak/panic.
        drop(client);
    }

    #[test]
    fn test_close_then_drop_is_idempotent() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.close();
        assert!(client.is_closed());
        drop(client); // must not re-log or panic on a second teardown
    }

    #[test]
    fn test_send_after_close_is_rejected() {
        let now = Instant::now();
        let mut client = connected_client(now);
        client.close();
        assert!(client.send(OpCode::Text, b"x").is_err());
    }
}
