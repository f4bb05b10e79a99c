//! Default `mio`-backed event loop (§10.3). This is ordinary glue code, not
//! part of the protocol engine: [`crate::client::Client`] never imports this
//! module or `mio` itself, it only exposes `on_readable`/`on_writable`/
//! `on_timer` entry points that any loop — this one or an embedder's own —
//! can call. Modeled on the reference networking layer's non-blocking
//! socket + edge-triggered readiness poll idiom, updated from the
//! `mio::Ready`/`PollOpt`-era API to `mio` 0.8's `Interest`/`Registry`.

use crate::client::{Client, ClientBuilder, Event};
use crate::error::WsError;
use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};
use std::net::ToSocketAddrs;
use std::time::{Duration, Instant};

const SOCKET_TOKEN: Token = Token(0);
const POLL_TICK: Duration = Duration::from_secs(1);

/// Resolve `host:port`, trying every address family the resolver returns
/// (§9.1: no hard IPv4-only restriction) and connecting to the first address
/// that accepts a non-blocking `connect()`.
fn connect_nonblocking(host: &str, port: u16) -> Result<TcpStream, WsError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| WsError::Connect(format!("resolving {}:{}: {}", host, port, e)))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    Err(WsError::Connect(
        last_err.map(|e| e.to_string()).unwrap_or_else(|| format!("no addresses for {}", host)),
    ))
}

/// Connects, performs the handshake, and drives `client` to completion
/// (an `Event::Error` or `Event::Close`), calling `on_event` for every
/// lifecycle/data event in between. This is the crate's default, ready-to-use
/// runner; embedders with their own event loop call
/// [`Client::on_readable`]/[`Client::on_writable`]/[`Client::on_timer`]
/// directly instead.
pub fn run(builder: ClientBuilder, mut on_event: impl FnMut(&mut Client<TcpStream>, Event)) -> Result<(), WsError> {
    let url = builder.url().clone();
    let stream = connect_nonblocking(&url.host, url.port)?;

    let mut poll = Poll::new().map_err(|e| WsError::Connect(e.to_string()))?;
    let mut events = Events::with_capacity(128);

    let now = Instant::now();
    let mut client = builder.build(stream, now);

    poll.registry()
        .register(client_socket(&mut client), SOCKET_TOKEN, Interest::READABLE | Interest::WRITABLE)
        .map_err(|e| WsError::Connect(e.to_string()))?;

    let mut last_tick = now;

    loop {
        poll.poll(&mut events, Some(POLL_TICK)).map_err(WsError::Io)?;

        let now = Instant::now();

        for event in events.iter() {
            if event.token() != SOCKET_TOKEN {
                continue;
            }
            if event.is_readable() {
                client.on_readable(now);
            }
            if event.is_writable() {
                client.on_writable(now);
            }
            if drain_and_check_done(&mut client, &mut on_event) {
                return Ok(());
            }
        }

        if now.duration_since(last_tick) >= POLL_TICK {
            last_tick = now;
            client.on_timer(now);
            if drain_and_check_done(&mut client, &mut on_event) {
                return Ok(());
            }
        }

        // Edge-triggered polling only reports writability again after a
        // WouldBlock; bytes enqueued by `send`/keepalive/pong replies in
        // between readiness edges still need to go out promptly rather than
        // waiting for the next incidental edge, so flush opportunistically
        // every loop iteration, mirroring the reference networking layer's
        // per-tick "force-send" pass over its live connections.
        if client.has_pending_egress() {
            client.on_writable(now);
            if drain_and_check_done(&mut client, &mut on_event) {
                return Ok(());
            }
        }
    }
}

fn client_socket(client: &mut Client<TcpStream>) -> &mut TcpStream {
    client.transport_mut()
}

fn drain_and_check_done(client: &mut Client<TcpStream>, on_event: &mut impl FnMut(&mut Client<TcpStream>, Event)) -> bool {
    let drained: Vec<Event> = client.events().collect();
    let mut done = false;
    for event in drained {
        done |= matches!(event, Event::Error(_) | Event::Close { .. });
        on_event(client, event);
    }
    done || client.is_closed()
}
