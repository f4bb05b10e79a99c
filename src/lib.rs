//! Embeddable, non-blocking WebSocket client engine (RFC 6455).
//!
//! The engine never blocks and drives no event loop of its own: an embedder
//! (or the bundled [`reactor`] helper, when the `mio-reactor` feature is on)
//! calls [`client::Client::on_readable`], [`client::Client::on_writable`],
//! and [`client::Client::on_timer`] as those conditions occur, and drains
//! [`client::Client::events`] afterwards for `Open`/`Message`/`Error`/`Close`
//! notifications.
//!
//! ```no_run
//! use tinywsc::{ClientBuilder, Event, OpCode};
//! use std::time::Duration;
//!
//! # #[cfg(feature = "mio-reactor")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let builder = ClientBuilder::new("ws://echo.example.invalid/")?
//!     .ping_interval(Duration::from_secs(30));
//!
//! tinywsc::reactor::run(builder, |client, event| match event {
//!     Event::Open => client.send(OpCode::Text, b"hello").unwrap(),
//!     Event::Message { data, .. } => println!("got {} bytes", data.len()),
//!     Event::Error(e) => eprintln!("error: {}", e),
//!     Event::Close { code, reason } => println!("closed: {} {}", code, reason),
//! })?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "mio-reactor"))]
//! # fn main() {}
//! ```

pub mod buffer;
pub mod client;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod keepalive;
pub mod logging;
pub mod mask;
pub mod transport;
pub mod url;

#[cfg(feature = "mio-reactor")]
pub mod reactor;

pub use client::{Client, ClientBuilder, Event};
pub use error::WsError;
pub use frame::OpCode;
pub use url::WsUrl;
