//! Interactive client for the pathfinding server.
//!
//! Usage:
//!
//! ```bash
//! # Run server
//! cargo run -p path-server
//!
//! # In another terminal
//! cargo run -p path-server --example path_client
//! ```
//!
//! Each stdin line `map x1 y1 z1 x2 y2 z2` becomes one request; the
//! returned path is printed point by point.

use std::env;
use std::error::Error;
use std::io::{self, Write};

use path_core::{PathRequest, Point3};
use path_protocol::{decode_response, encode_request};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Where to connect: env override or default.
    let addr = env::var("PATH_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:47110".to_string());

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut responses = BufReader::new(read_half).lines();
    println!("Connected.");
    println!("Type requests like:");
    println!("  0 -8949.95 -132.49 83.53 -9046.5 -45.8 88.3");
    println!("Type 'quit' or 'exit' to leave.\n");

    let stdin = io::stdin();

    loop {
        // Prompt
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let n = stdin.read_line(&mut line)?;
        if n == 0 {
            // EOF
            println!("\nEOF on stdin, exiting client.");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            println!("Exiting client.");
            break;
        }

        let req = match parse_request(trimmed) {
            Some(req) => req,
            None => {
                eprintln!("Expected: map x1 y1 z1 x2 y2 z2");
                continue;
            }
        };

        let request_line = encode_request(&req)?;
        write_half.write_all(format!("{}\n", request_line).as_bytes()).await?;

        // One response line per request.
        let Some(response) = responses.next_line().await? else {
            println!("Server closed the connection.");
            break;
        };
        let path = decode_response(&response)?;
        if path.is_empty() {
            println!("No path.");
        }
        for (i, p) in path.iter().enumerate() {
            println!("  {:>3}: {:.3} {:.3} {:.3}", i, p.x, p.y, p.z);
        }
    }

    Ok(())
}

fn parse_request(line: &str) -> Option<PathRequest> {
    let mut parts = line.split_whitespace();
    let map_id = parts.next()?.parse().ok()?;
    let coords: Vec<f32> = parts.map(|p| p.parse().ok()).collect::<Option<_>>()?;
    if coords.len() != 6 {
        return None;
    }
    Some(PathRequest {
        start: Point3::new(coords[0], coords[1], coords[2]),
        end: Point3::new(coords[3], coords[4], coords[5]),
        map_id,
    })
}
