//! HTTP/1.1 upgrade handshake: request construction, response validation, and
//! the `Sec-WebSocket-Accept` derivation/verification (RFC 6455 §1.3).

use crate::error::WsError;
use crate::url::WsUrl;
use base64::Engine as _;
use rand::RngCore;
use sha1::{Digest, Sha1};

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Draw a 16-byte nonce and Base64-encode it for use as `Sec-WebSocket-Key`.
pub fn generate_key() -> String {
    let mut nonce = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    base64::engine::general_purpose::STANDARD.encode(nonce)
}

pub fn accept_value(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(GUID.as_bytes());
    let digest = hasher.finalize();
    base64::engine::general_purpose::STANDARD.encode(digest)
}

/// Build the HTTP/1.1 upgrade request for `url`, keyed with `client_key`.
/// `extra_header`, if non-empty, is inserted verbatim before the terminating
/// blank line and must already end in CRLF.
pub fn build_request(url: &WsUrl, client_key: &str, extra_header: &str) -> Vec<u8> {
    let mut req = String::new();
    req.push_str(&format!("GET {} HTTP/1.1\r\n", url.path));
    req.push_str("Upgrade: websocket\r\n");
    req.push_str("Connection: Upgrade\r\n");
    req.push_str(&format!("Sec-WebSocket-Key: {}\r\n", client_key));
    req.push_str("Sec-WebSocket-Version: 13\r\n");

    if url.is_default_port() {
        req.push_str(&format!("Host: {}\r\n", url.host));
    } else {
        req.push_str(&format!("Host: {}:{}\r\n", url.host, url.port));
    }

    if !extra_header.is_empty() {
        req.push_str(extra_header);
    }

    req.push_str("\r\n");
    req.into_bytes()
}

/// Find the end of the HTTP header block (`\r\n\r\n`) in `buf`, returning the
/// index just past it, or `None` if it hasn't arrived yet.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Validate the response headers (up to but excluding the trailing blank
/// line) against `client_key`, per RFC 6455 §1.3.
pub fn validate_response(headers: &[u8], client_key: &str) -> Result<(), WsError> {
    let text = std::str::from_utf8(headers)
        .map_err(|_| WsError::InvalidHeader("response is not valid UTF-8".into()))?;

    let mut lines = text.split("\r\n");

    let status_line = lines
        .next()
        .ok_or_else(|| WsError::InvalidHeader("missing status line".into()))?;

    let mut parts = status_line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| WsError::InvalidHeader("missing HTTP version".into()))?;
    let code = parts
        .next()
        .ok_or_else(|| WsError::InvalidHeader("missing status code".into()))?;
    let reason = parts.next();

    if version != "HTTP/1.1" {
        return Err(WsError::InvalidHeader(format!("unexpected HTTP version {}", version)));
    }

    let code: u16 = code
        .parse()
        .map_err(|_| WsError::InvalidHeader(format!("non-numeric status code {}", code)))?;
    if code != 101 {
        return Err(WsError::InvalidHeader(format!("unexpected status code {}", code)));
    }
    if reason.is_none() {
        return Err(WsError::InvalidHeader("missing reason phrase".into()));
    }

    let mut has_upgrade = false;
    let mut has_connection = false;
    let mut accept_ok = false;
    let expected_accept = accept_value(client_key);

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| WsError::InvalidHeader(format!("malformed header line: {}", line)))?;
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("upgrade") {
            has_upgrade = value.eq_ignore_ascii_case("websocket");
        } else if name.eq_ignore_ascii_case("connection") {
            has_connection = value.eq_ignore_ascii_case("upgrade");
        } else if name.eq_ignore_ascii_case("sec-websocket-accept") {
            accept_ok = value == expected_accept;
        }
    }

    if !has_upgrade {
        return Err(WsError::InvalidHeader("missing or incorrect Upgrade header".into()));
    }
    if !has_connection {
        return Err(WsError::InvalidHeader("missing or incorrect Connection header".into()));
    }
    if !accept_ok {
        return Err(WsError::InvalidHeader("Sec-WebSocket-Accept mismatch".into()));
    }

    Ok(())
}
