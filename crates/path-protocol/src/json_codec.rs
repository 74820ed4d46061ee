// crates/path-protocol/src/json_codec.rs

//! JSON bodies for requests and responses.
//!
//! Input (line → `PathRequest`):
//!
//! - `{"A":{"x":f,"y":f,"z":f},"B":{"x":f,"y":f,"z":f},"MapId":int}`
//!   optionally followed by the sentinel.
//! - A blank line (or a bare sentinel) decodes to `None`.
//!
//! Output (`&[Point3]` → line):
//!
//! - `[{"x":f,"y":f,"z":f},...] &gt;`, an empty array when there is no path.
//!
//! The request/response encoders for the other direction are here too so
//! clients and tests speak exactly what the server parses.

use path_core::{PathRequest, Point3};
use thiserror::Error;

use crate::framing::{append_sentinel, strip_sentinel, SENTINEL};

/// Errors that can arise when encoding/decoding a line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON, or JSON of the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Short, stable name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(e) if e.is_syntax() || e.is_eof() => "MalformedJson",
            ProtocolError::Malformed(_) => "InvalidRequest",
        }
    }
}

/// Decode one request line.
///
/// Returns `Ok(None)` for blank lines, which carry no request.
pub fn decode_request(line: &str) -> Result<Option<PathRequest>, ProtocolError> {
    let body = strip_sentinel(line);
    if body.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(body)?))
}

/// Encode a request line, sentinel included.
pub fn encode_request(req: &PathRequest) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(req)?;
    line.push_str(SENTINEL);
    Ok(line)
}

/// Encode a response line, sentinel included.
pub fn encode_response(path: &[Point3]) -> Result<String, ProtocolError> {
    let body = serde_json::to_string(path)?;
    Ok(append_sentinel(&body))
}

/// Decode a response line back into points.
pub fn decode_response(line: &str) -> Result<Vec<Point3>, ProtocolError> {
    Ok(serde_json::from_str(strip_sentinel(line))?)
}
