//! path-protocol
//!
//! Wire-level encoding/decoding for the pathfinding server.
//!
//! One request or response per line:
//!
//! ```text
//! client → server   {"A":{"x":..,"y":..,"z":..},"B":{..},"MapId":0}&gt;
//! server → client   [{"x":..,"y":..,"z":..},...] &gt;
//! ```
//!
//! - [`framing`]    : the `&gt;` end-of-message sentinel
//! - [`json_codec`] : JSON request/response bodies

pub mod framing;
pub mod json_codec;

pub use framing::{append_sentinel, strip_sentinel, SENTINEL};
pub use json_codec::{
    decode_request,
    decode_response,
    encode_request,
    encode_response,
    ProtocolError,
};
