// Shared harness for the server integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use path_core::{EngineError, NavEngine, PathResolver, Point3, RawPath};
use path_server::log_sink::{self, CapturingWriter, Level, LogRecord};
use path_server::server;
use path_server::types::{ClientRegistry, ServerState};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const SLOW_MAP: i32 = 99;
pub const SLOW_QUERY: Duration = Duration::from_millis(1000);

/// Maps 0, 1 and `SLOW_MAP` exist.
///
/// - map 0 answers with the fixed three-point reference path,
/// - map 1 echoes `[start, end]`,
/// - `SLOW_MAP` answers like map 0 after `SLOW_QUERY`.
pub struct FakeEngine;

pub fn reference_path() -> Vec<Point3> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.5, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
    ]
}

impl NavEngine for FakeEngine {
    fn load_map(&self, map_id: i32) -> Result<(), EngineError> {
        match map_id {
            0 | 1 | SLOW_MAP => Ok(()),
            _ => Err(EngineError::MapNotFound {
                map_id,
                path: format!("{:03}.mmap", map_id).into(),
            }),
        }
    }

    fn find_path(&self, map_id: i32, start: Point3, end: Point3) -> Result<RawPath, EngineError> {
        match map_id {
            0 => Ok(RawPath::from_points(&reference_path())),
            1 => Ok(RawPath::from_points(&[start, end])),
            SLOW_MAP => {
                std::thread::sleep(SLOW_QUERY);
                Ok(RawPath::from_points(&reference_path()))
            }
            _ => Err(EngineError::MapNotLoaded(map_id)),
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub clients: ClientRegistry,
    pub captured: CapturingWriter,
    shutdown: watch::Sender<bool>,
    server_task: Option<JoinHandle<()>>,
    log_task: JoinHandle<u64>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_limits(0, 64 * 1024).await
    }

    pub async fn start_with_limits(max_clients: usize, max_line_length: usize) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let captured = CapturingWriter::new();
        let (log, log_task) = log_sink::spawn(Box::new(captured.clone()), None);

        let clients = ClientRegistry::new();
        let state = ServerState {
            resolver: Arc::new(PathResolver::new(Arc::new(FakeEngine))),
            clients: clients.clone(),
            log,
            max_clients,
            max_line_length,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_task = tokio::spawn(server::serve(listener, state, shutdown_rx));

        TestServer {
            addr,
            clients,
            captured,
            shutdown,
            server_task: Some(server_task),
            log_task,
        }
    }

    /// Raise the stop signal and wait for the accept loop to return.
    /// Open sessions keep running.
    pub async fn stop_accepting(&mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.server_task.take() {
            task.await.unwrap();
        }
    }

    /// Wait for sessions to end, stop everything, return what was logged.
    pub async fn stop(mut self) -> Vec<LogRecord> {
        let clients = self.clients.clone();
        wait_until(move || clients.current() == 0).await;
        self.stop_accepting().await;
        // Finishes once the last session has dropped its handle.
        tokio::time::timeout(Duration::from_secs(5), self.log_task)
            .await
            .expect("log sink did not finish")
            .unwrap();
        self.captured.records()
    }
}

pub fn errors(records: &[LogRecord]) -> Vec<&LogRecord> {
    records.iter().filter(|r| r.level == Level::Error).collect()
}

pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Line-oriented test client.
pub struct Client {
    pub local_addr: SocketAddr,
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let local_addr = stream.local_addr().unwrap();
        let (read, write) = stream.into_split();
        Client {
            local_addr,
            lines: BufReader::new(read).lines(),
            write,
        }
    }

    pub async fn send_raw(&mut self, data: &str) {
        self.write.write_all(data.as_bytes()).await.unwrap();
        self.write.flush().await.unwrap();
    }

    pub async fn send_line(&mut self, line: &str) {
        self.send_raw(&format!("{}\n", line)).await;
    }

    /// Next response line, or `None` once the server closed the connection.
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("no response in time")
            .unwrap_or(None)
    }

    pub async fn close_write(&mut self) {
        self.write.shutdown().await.unwrap();
    }
}

pub fn request_line(map_id: i32, start: Point3, end: Point3) -> String {
    path_protocol::encode_request(&path_core::PathRequest { start, end, map_id }).unwrap()
}
