//! The immutable configuration handed to the listener

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the server needs, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub tls: Option<TlsSettings>,
    /// Passed verbatim to the ODBC driver manager.
    pub connection_string: String,
    pub max_request_bytes: usize,
    pub tls_handshake_timeout: Duration,
}

impl ServerConfig {
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn bind_target(&self) -> (&str, u16) {
        (self.bind_address.as_str(), self.port)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field(
                "connection_string",
                &redact_connection_string(&self.connection_string),
            )
            .field("max_request_bytes", &self.max_request_bytes)
            .field("tls_handshake_timeout", &self.tls_handshake_timeout)
            .finish()
    }
}

/// PEM certificate chain and private key for the TLS listener.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
    /// May be empty; only consulted for encrypted keys.
    pub key_password: String,
}

impl fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("certificate", &self.certificate)
            .field("private_key", &self.private_key)
            .field("key_password", &"<redacted>")
            .finish()
    }
}

/// Mask password attributes (`PWD`, `Password`) in an ODBC connection string.
///
/// A `{...}` value is one token even if it holds `;`, with `}}` standing for
/// a literal `}`.
pub fn redact_connection_string(connection_string: &str) -> String {
    let mut redacted = String::with_capacity(connection_string.len());
    let mut rest = connection_string;

    loop {
        let (attribute, tail) = split_attribute(rest);
        match attribute.split_once('=') {
            Some((key, _)) if is_secret_key(key) => {
                redacted.push_str(key);
                redacted.push_str("=***");
            }
            _ => redacted.push_str(attribute),
        }

        match tail {
            Some(tail) => {
                redacted.push(';');
                rest = tail;
            }
            None => break,
        }
    }

    redacted
}

/// Split off the first `;`-terminated attribute.
fn split_attribute(input: &str) -> (&str, Option<&str>) {
    let bytes = input.as_bytes();
    let mut in_braces = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if !in_braces => in_braces = true,
            b'}' if in_braces => {
                if bytes.get(i + 1) == Some(&b'}') {
                    i += 1;
                } else {
                    in_braces = false;
                }
            }
            b';' if !in_braces => return (&input[..i], Some(&input[i + 1..])),
            _ => {}
        }
        i += 1;
    }

    (input, None)
}

fn is_secret_key(key: &str) -> bool {
    let key = key.trim();
    key.eq_ignore_ascii_case("pwd") || key.eq_ignore_ascii_case("password")
}
