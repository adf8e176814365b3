use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use std::str;
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::commands::Request;
use crate::reply::{ClientErrorCode, Reply};

pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

// Smallest encoding of one multibulk element: `$0\r\n\r\n`.
const MIN_BULK_LENGTH: usize = 6;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("line exceeds the maximum length of {max} bytes")]
    LineTooLong { max: usize },
    #[error("request exceeds the maximum length of {max} bytes")]
    RequestTooLong { max: usize },
    #[error("unbalanced quotes in request")]
    UnbalancedQuotes,
    #[error("invalid multibulk request; {0}")]
    InvalidMultibulk(String),
    #[error("invalid UTF-8 string")]
    InvalidUtf8(#[from] str::Utf8Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// The reply sent to the client before the connection is dropped, if the error was caused
    /// by what the client sent.
    pub fn to_reply(&self) -> Option<Reply> {
        match self {
            Error::Io(_) => None,
            err => Some(Reply::error(
                ClientErrorCode::PROTOCOL_ERROR,
                format!("protocol error; {}", err),
            )),
        }
    }
}

enum ParseError {
    // Not enough data is available to parse an entire request.
    Incomplete,
    Invalid(Error),
}

impl From<Error> for ParseError {
    fn from(err: Error) -> Self {
        ParseError::Invalid(err)
    }
}

impl From<str::Utf8Error> for ParseError {
    fn from(err: str::Utf8Error) -> Self {
        ParseError::Invalid(err.into())
    }
}

/// Turns the byte stream of a client into [`Request`]s and [`Reply`]s back into bytes.
///
/// Two request forms are understood. The inline form is a single line of whitespace separated
/// tokens, which is what a person types in a telnet session:
///
/// ```text
/// LPUSH mylist "hello world" foo
/// ```
///
/// A line starting with `*` is read as a multibulk request, the form every Redis client library
/// emits, so those clients work too.
///
/// Either way a request may not occupy more than `max_line_length` bytes, so a client can never
/// make the server buffer more than that for one request.
#[derive(Clone, Debug)]
pub struct RequestCodec {
    max_line_length: usize,
}

impl RequestCodec {
    pub fn new() -> RequestCodec {
        RequestCodec::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> RequestCodec {
        RequestCodec { max_line_length }
    }

    fn parse(&self, src: &mut Cursor<&[u8]>) -> Result<Option<Request>, ParseError> {
        if src.chunk().first() == Some(&b'*') {
            self.parse_multibulk(src)
        } else {
            self.parse_inline(src)
        }
    }

    fn parse_inline(&self, src: &mut Cursor<&[u8]>) -> Result<Option<Request>, ParseError> {
        let line = str::from_utf8(get_line(src, self.max_line_length)?)?;
        let mut args = split_args(line)?;

        if args.is_empty() {
            return Ok(None);
        }

        let command = args.remove(0);
        Ok(Some(Request::new(command, args)))
    }

    // *<number-of-elements>\r\n$<length>\r\n<data>\r\n...
    fn parse_multibulk(&self, src: &mut Cursor<&[u8]>) -> Result<Option<Request>, ParseError> {
        let start = src.position() as usize;
        let end = start + self.max_line_length;

        let header = get_line(src, self.max_line_length)?;
        let count = parse_length(&header[1..])?;

        if count <= 0 {
            return Ok(None);
        }

        // Reject a request that can't fit before waiting for its elements to arrive.
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let min_length = count.saturating_mul(MIN_BULK_LENGTH);
        if src.position() as usize + min_length > end {
            return Err(self.too_long().into());
        }

        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.parse_bulk(src, end)?);
        }

        let command = parts.remove(0);
        Ok(Some(Request::new(command, parts)))
    }

    fn parse_bulk(&self, src: &mut Cursor<&[u8]>, end: usize) -> Result<String, ParseError> {
        let header = get_line(src, self.max_line_length)?;
        if header.first() != Some(&b'$') {
            return Err(Error::InvalidMultibulk("expected '$'".to_string()).into());
        }

        let length = parse_length(&header[1..])?;
        if length < 0 || length as usize > self.max_line_length {
            let err = Error::InvalidMultibulk(format!("invalid bulk length: {}", length));
            return Err(err.into());
        }

        let length = length as usize;
        if src.position() as usize + length + 2 > end {
            return Err(self.too_long().into());
        }
        if src.remaining() < length + 2 {
            return Err(ParseError::Incomplete);
        }

        let chunk = src.chunk();
        if &chunk[length..length + 2] != b"\r\n" {
            let err = Error::InvalidMultibulk("bulk string is not terminated".to_string());
            return Err(err.into());
        }

        let data = str::from_utf8(&chunk[..length])?.to_string();
        src.advance(length + 2);

        Ok(data)
    }

    fn too_long(&self) -> Error {
        Error::RequestTooLong {
            max: self.max_line_length,
        }
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.is_empty() {
                return Ok(None);
            }

            let mut cursor = Cursor::new(&src[..]);
            let parsed = match self.parse(&mut cursor) {
                Ok(parsed) => parsed,
                // A complete request fits in the limit, so more pending bytes can only be an
                // oversized one.
                Err(ParseError::Incomplete) if src.len() > self.max_line_length => {
                    return Err(self.too_long())
                }
                Err(ParseError::Incomplete) => return Ok(None),
                Err(ParseError::Invalid(err)) => return Err(err),
            };

            // Remove the parsed request from the buffer.
            let position = cursor.position() as usize;
            src.advance(position);

            // Blank lines and empty multibulk requests carry no command, keep reading.
            if let Some(request) = parsed {
                return Ok(Some(request));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if src.is_empty() => Ok(None),
            // The last inline request of a stream may come without its line terminator.
            None if src[0] != b'*' => {
                src.extend_from_slice(b"\n");
                self.decode(src)
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "incomplete request at end of stream",
            )
            .into()),
        }
    }
}

impl Encoder<Reply> for RequestCodec {
    type Error = Error;

    fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes: Vec<u8> = reply.into();
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Returns the next `\n` terminated line without its terminator (and without a preceding `\r`).
fn get_line<'a>(src: &mut Cursor<&'a [u8]>, max: usize) -> Result<&'a [u8], ParseError> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();
    let rest = &buf[start..];

    let newline = match rest.iter().position(|&b| b == b'\n') {
        Some(newline) => newline,
        None if rest.len() > max => return Err(Error::LineTooLong { max }.into()),
        None => return Err(ParseError::Incomplete),
    };

    let mut line = &rest[..newline];
    if let Some(stripped) = line.strip_suffix(b"\r") {
        line = stripped;
    }
    if line.len() > max {
        return Err(Error::LineTooLong { max }.into());
    }

    src.set_position((start + newline + 1) as u64);

    Ok(line)
}

fn parse_length(src: &[u8]) -> Result<i64, Error> {
    str::from_utf8(src)?
        .parse::<i64>()
        .map_err(|_| {
            let length = String::from_utf8_lossy(src);
            Error::InvalidMultibulk(format!("invalid length: {}", length))
        })
}

/// Splits an inline request into arguments. Double quoted arguments may contain whitespace and
/// the escapes `\"`, `\\`, `\n`, `\r` and `\t`.
fn split_args(line: &str) -> Result<Vec<String>, Error> {
    let mut args = vec![];
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}

        let first = match chars.peek() {
            Some(&c) => c,
            None => break,
        };

        let mut arg = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => arg.push('\n'),
                        Some('r') => arg.push('\r'),
                        Some('t') => arg.push('\t'),
                        Some(c) => arg.push(c),
                        None => return Err(Error::UnbalancedQuotes),
                    },
                    Some(c) => arg.push(c),
                    None => return Err(Error::UnbalancedQuotes),
                }
            }

            // A closing quote must end the argument.
            if chars.peek().is_some_and(|c| !c.is_ascii_whitespace()) {
                return Err(Error::UnbalancedQuotes);
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_ascii_whitespace()) {
                arg.push(c);
            }
        }

        args.push(arg);
    }

    Ok(args)
}
