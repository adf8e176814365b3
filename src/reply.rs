// Replies are written with RESP framing so both telnet users and redis-cli can read them.
// https://redis.io/docs/reference/protocol-spec

use std::fmt;

static CRLF: &[u8; 2] = b"\r\n";

/// Stable, machine readable error token sent in front of every error reply. Clients match on
/// this rather than on the human readable message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientErrorCode(&'static str);

impl ClientErrorCode {
    pub const NOT_SUPPORTED: ClientErrorCode = ClientErrorCode("NOT_SUPPORTED");
    pub const PROTOCOL_ERROR: ClientErrorCode = ClientErrorCode("PROTOCOL_ERROR");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Bulk(String),
    Integer(i64),
    Array(Vec<String>),
    Nil,
    Error {
        code: ClientErrorCode,
        message: String,
    },
}

impl Reply {
    pub fn error(code: ClientErrorCode, message: impl Into<String>) -> Reply {
        Reply::Error {
            code,
            message: message.into(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    pub fn write_to(&self, dst: &mut Vec<u8>) {
        match self {
            Reply::Bulk(s) => write_bulk(dst, s),
            Reply::Integer(i) => {
                dst.push(b':');
                dst.extend_from_slice(i.to_string().as_bytes());
                dst.extend_from_slice(CRLF);
            }
            Reply::Array(values) => {
                dst.push(b'*');
                dst.extend_from_slice(values.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                for value in values {
                    write_bulk(dst, value);
                }
            }
            Reply::Nil => dst.extend_from_slice(b"$-1\r\n"),
            Reply::Error { code, message } => {
                dst.push(b'-');
                dst.extend_from_slice(code.as_str().as_bytes());
                dst.push(b' ');
                // A simple error must stay on a single line.
                let message = message.replace(['\r', '\n'], " ");
                dst.extend_from_slice(message.as_bytes());
                dst.extend_from_slice(CRLF);
            }
        }
    }
}

fn write_bulk(dst: &mut Vec<u8>, s: &str) {
    dst.push(b'$');
    dst.extend_from_slice(s.len().to_string().as_bytes());
    dst.extend_from_slice(CRLF);
    dst.extend_from_slice(s.as_bytes());
    dst.extend_from_slice(CRLF);
}

impl From<Reply> for Vec<u8> {
    fn from(reply: Reply) -> Self {
        reply.serialize()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Bulk(s) => write!(f, "{:?}", s),
            Reply::Integer(i) => write!(f, "(integer) {}", i),
            Reply::Array(values) if values.is_empty() => write!(f, "(empty array)"),
            Reply::Array(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {:?}", i + 1, value)?;
                }
                Ok(())
            }
            Reply::Nil => write!(f, "(nil)"),
            Reply::Error { code, message } => write!(f, "(error) {} {}", code, message),
        }
    }
}
