//! Minimal `ws://`/`wss://` URL parsing (§6). Only what the handshake and
//! transport layers need: scheme, host, port, path.

use crate::error::WsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub tls: bool,
}

impl WsUrl {
    pub fn parse(url: &str) -> Result<WsUrl, WsError> {
        let (rest, tls, default_port) = if let Some(rest) = url.strip_prefix("ws://") {
            (rest, false, 80)
        } else if let Some(rest) = url.strip_prefix("wss://") {
            (rest, true, 443)
        } else {
            return Err(WsError::UrlParse(format!("unsupported scheme in {:?}", url)));
        };

        if rest.is_empty() {
            return Err(WsError::UrlParse("missing host".into()));
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], rest[idx..].to_string()),
            None => (rest, "/".to_string()),
        };

        if authority.is_empty() {
            return Err(WsError::UrlParse("missing host".into()));
        }

        let (host, port) = match authority.rfind(':') {
            Some(idx) => {
                let host = &authority[..idx];
                let port_str = &authority[idx + 1..];
                let port: u16 = port_str
                    .parse()
                    .map_err(|_| WsError::UrlParse(format!("invalid port {:?}", port_str)))?;
                (host, port)
            }
            None => (authority, default_port),
        };

        if host.is_empty() {
            return Err(WsError::UrlParse("missing host".into()));
        }

        Ok(WsUrl {
            host: host.to_string(),
            port,
            path,
            tls,
        })
    }

    pub fn is_default_port(&self) -> bool {
        match self.tls {
            true => self.port == 443,
            false => self.port == 80,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ws_defaults() {
        let url = WsUrl::parse("ws://example.invalid").unwrap();
        assert_eq!(url.host, "example.invalid");
        assert_eq!(url.port, 80);
        assert_eq!(url.path, "/");
        assert!(!url.tls);
    }

    #[test]
    fn test_parse_wss_defaults() {
        let url = WsUrl::parse("wss://example.invalid/a/b").unwrap();
        assert_eq!(url.port, 443);
        assert_eq!(url.path, "/a/b");
        assert!(url.tls);
    }

    #[test]
    fn test_parse_explicit_port_and_path() {
        let url = WsUrl::parse("ws://example.invalid:9000/x?y=1").unwrap();
        assert_eq!(url.host, "example.invalid");
        assert_eq!(url.port, 9000);
        assert_eq!(url.path, "/x?y=1");
    }

    #[test]
    fn test_parse_rejects_bad_scheme() {
        assert!(WsUrl::parse("http://example.invalid").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_host() {
        assert!(WsUrl::parse("ws://").is_err());
        assert!(WsUrl::parse("ws:///path").is_err());
    }

    #[test]
    fn test_is_default_port() {
        assert!(WsUrl::parse("ws://h").unwrap().is_default_port());
        assert!(!WsUrl::parse("ws://h:8080").unwrap().is_default_port());
        assert!(WsUrl::parse("wss://h").unwrap().is_default_port());
    }
}
