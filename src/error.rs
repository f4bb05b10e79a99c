use std::io;

/// The fatal error taxonomy surfaced to `on_error`. Every variant here ends the
/// connection; there is no retry path inside the engine itself.
#[derive(thiserror::Error, Debug)]
pub enum WsError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid handshake header: {0}")]
    InvalidHeader(String),

    #[error("server sent a masked frame")]
    ServerMasked,

    #[error("unsupported frame: {0}")]
    NotSupported(String),

    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),

    #[error("payload exceeds platform word size")]
    PayloadTooLarge,

    #[error("ping timeout: no pong after {0} consecutive pings")]
    PingTimeout(u32),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("tls handshake failed: {0}")]
    SslHandshake(String),

    #[error("malformed url: {0}")]
    UrlParse(String),
}

impl WsError {
    /// Stable short name, independent of the `Display` message, used wherever
    /// callers key off the error kind rather than its text (tests, logging).
    pub fn kind(&self) -> &'static str {
        match self {
            WsError::Io(_) => "IO",
            WsError::InvalidHeader(_) => "INVALID_HEADER",
            WsError::ServerMasked => "SERVER_MASKED",
            WsError::NotSupported(_) => "NOT_SUPPORT",
            WsError::UnknownOpcode(_) => "NOT_SUPPORT",
            WsError::PayloadTooLarge => "NOT_SUPPORT",
            WsError::PingTimeout(_) => "PING_TIMEOUT",
            WsError::Connect(_) => "CONNECT",
            WsError::SslHandshake(_) => "SSL_HANDSHAKE",
            WsError::UrlParse(_) => "URL_PARSE",
        }
    }
}

/// Outcome of a fallible engine step that can legitimately suspend without
/// being an error. Mirrors the `Wait`/`Fatal` split of the networking layer
/// this engine is descended from: a `Suspend` is backpressure, not a failure,
/// and must never be logged or counted as one.
pub enum Flow<T> {
    Progress(T),
    Suspend,
    Fatal(WsError),
}

impl<T> From<io::Error> for Flow<T> {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::WouldBlock {
            Flow::Suspend
        } else {
            Flow::Fatal(WsError::Io(err))
        }
    }
}

/// Lifts the outcome of a fallible I/O step (as returned by
/// [`crate::buffer::Buffer::ingress`]/`egress`) into the suspend/fatal split,
/// so callers match on `Flow` once instead of re-deriving "was this just
/// `WouldBlock`?" at every call site.
impl<T> From<io::Result<T>> for Flow<T> {
    fn from(result: io::Result<T>) -> Self {
        match result {
            Ok(v) => Flow::Progress(v),
            Err(e) => Flow::from(e),
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;
