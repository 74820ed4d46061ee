// crates/path-server/src/client.rs

//! Per-connection session.
//!
//! ```text
//! AWAIT_LINE → DECODE → RESOLVE → ENCODE_WRITE → AWAIT_LINE
//!      └──────────── EOF / any error ────────────→ CLOSED
//! ```
//!
//! One request is in flight per connection. Any failure is logged with
//! the peer address, appended to the error file, and ends this session
//! only.

use std::io;
use std::net::SocketAddr;

use bytes::BytesMut;
use path_core::{Path, PathError, PathRequest};
use path_protocol::{decode_request, encode_response, ProtocolError};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinError;
use tracing::{debug, trace};

use crate::types::{ServerState, SessionGuard};

/// Why a session ended early.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("request line longer than {0} bytes")]
    LineTooLong(usize),

    /// The engine call panicked or was cancelled.
    #[error("path query aborted: {0}")]
    QueryAborted(#[from] JoinError),
}

impl SessionError {
    /// Short, stable name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Io(_) => "IoError",
            SessionError::Protocol(e) => e.kind(),
            SessionError::Path(e) => e.kind(),
            SessionError::LineTooLong(_) => "LineTooLong",
            SessionError::QueryAborted(_) => "QueryAborted",
        }
    }
}

/// Run one connection to completion. `guard` is released when it ends.
pub async fn run_client(
    stream: TcpStream,
    peer: SocketAddr,
    state: ServerState,
    guard: SessionGuard,
) {
    let _guard = guard;
    state.log.success(format!("New Client: {}", peer));

    match serve_lines(stream, &state).await {
        Ok(()) => debug!(%peer, "client disconnected"),
        Err(e) => {
            state.log.report_failure(
                format!("{} occurred at client ", e.kind()),
                peer.to_string(),
                format!("{:?}", e),
            );
        }
    }
}

async fn serve_lines(stream: TcpStream, state: &ServerState) -> Result<(), SessionError> {
    let (mut read_stream, mut write_stream) = stream.into_split();
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        // Process complete lines
        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
            let line = buffer.split_to(newline_pos + 1);
            handle_line(&line, &mut write_stream, state).await?;
        }

        if buffer.len() > state.max_line_length {
            return Err(SessionError::LineTooLong(state.max_line_length));
        }

        if read_more(&mut read_stream, &mut buffer).await? == 0 {
            // EOF; a final line without a newline still counts.
            if !buffer.is_empty() {
                let line = buffer.split();
                handle_line(&line, &mut write_stream, state).await?;
            }
            return Ok(());
        }
    }
}

async fn read_more(read_stream: &mut OwnedReadHalf, buffer: &mut BytesMut) -> io::Result<usize> {
    buffer.reserve(1024);
    read_stream.read_buf(buffer).await
}

async fn handle_line(
    line: &[u8],
    write_stream: &mut OwnedWriteHalf,
    state: &ServerState,
) -> Result<(), SessionError> {
    let line = String::from_utf8_lossy(line);

    let Some(req) = decode_request(&line)? else {
        return Ok(());
    };
    trace!(?req, "request");

    let path = resolve(state, req).await?;
    let response = encode_response(&path)?;

    let data = format!("{}\n", response);
    write_stream.write_all(data.as_bytes()).await?;
    write_stream.flush().await?;
    Ok(())
}

/// Engine calls block, so they run on the blocking pool and only hold up
/// this session.
async fn resolve(state: &ServerState, req: PathRequest) -> Result<Path, SessionError> {
    let resolver = state.resolver.clone();
    let path = tokio::task::spawn_blocking(move || {
        resolver.ensure_map(req.map_id)?;
        resolver.resolve(req.map_id, req.start, req.end)
    })
    .await??;
    Ok(path)
}
