//! TCP pathfinding server.

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use path_core::{NavEngine, PathResolver, SerializedEngine, TileSetEngine};
use path_server::config::{Config, ConfigSource};
use path_server::log_sink::{self, ConsoleWriter, LogHandle};
use path_server::types::{ClientRegistry, ServerState};
use path_server::{server, status};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "path-server")]
#[clap(about = "Answers line-delimited JSON pathfinding requests over TCP")]
struct Cli {
    /// Configuration file; created with defaults if missing
    #[clap(short, long, default_value = "config.json")]
    config: PathBuf,

    /// File that session failures are appended to
    #[clap(short, long, default_value = "errors.txt")]
    error_log: PathBuf,

    /// Exit right away instead of waiting for Enter when startup fails
    #[clap(long)]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; the console log below is the user-facing output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let colored = io::stdout().is_terminal();
    print_banner(colored)?;

    let (log, log_task) = log_sink::spawn(
        Box::new(ConsoleWriter::stdout(colored)),
        Some(cli.error_log.clone()),
    );

    let result = start(&cli, &log).await;
    if let Err(e) = &result {
        log.error(format!("{:#}", e));
    }

    // The sink finishes once the last open session drops its handle. A
    // second Ctrl+C exits now; dropping the runtime then cancels those
    // sessions and waits for the sink to drain what they queued.
    drop(log);
    tokio::select! {
        _ = log_task => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    result
}

async fn start(cli: &Cli, log: &LogHandle) -> Result<()> {
    log.info(format!("Loading: {}...", cli.config.display()));
    let mut config = match Config::load_or_create(&cli.config) {
        Ok((config, ConfigSource::Loaded)) => {
            log.success("Loaded config file");
            config
        }
        Ok((config, ConfigSource::Created)) => {
            log.info("Created default config file");
            config
        }
        Err(e) => {
            log.error(format!("Failed to parse config file: {}", e));
            return abort(cli, log).await;
        }
    };
    if let Err(e) = config.apply_env() {
        log.error(format!("Bad environment override: {}", e));
        return abort(cli, log).await;
    }

    if !config.mmaps_path().is_dir() {
        log.error(format!(
            "MMAP folder {} missing, edit MmapsFolder in {}...",
            config.mmaps_folder,
            cli.config.display()
        ));
        return abort(cli, log).await;
    }

    let resolver = Arc::new(PathResolver::new(build_engine(&config)));

    if !config.preload_maps.is_empty() {
        log.info("Preloading Maps...");
        let maps = config.preload_maps.clone();
        let preloader = resolver.clone();
        let count = tokio::task::spawn_blocking(move || preloader.preload(&maps))
            .await
            .context("preload task failed")?
            .context("failed to preload maps")?;
        log.success(format!("Preloaded {} Maps", count));
    }

    let listener = server::bind(&config).await?;
    log.success(format!(
        "{} press Ctrl + C to exit...",
        config.socket_addr_string()
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let clients = ClientRegistry::new();
    if io::stdout().is_terminal() {
        tokio::spawn(status::run_status_display(
            clients.subscribe(),
            shutdown_rx.clone(),
        ));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_tx.send_replace(true);
        }
    });

    let state = ServerState {
        resolver,
        clients: clients.clone(),
        log: log.clone(),
        max_clients: config.max_clients,
        max_line_length: config.max_line_length,
    };
    server::serve(listener, state, shutdown_rx).await;

    log.info("Server stopped");
    let open = clients.current();
    if open > 0 {
        log.info(format!(
            "Waiting for {} client(s) to disconnect, press Ctrl + C again to exit now...",
            open
        ));
    }
    Ok(())
}

fn build_engine(config: &Config) -> Arc<dyn NavEngine> {
    let engine = TileSetEngine::new(config.mmaps_path());
    if config.serialize_engine {
        Arc::new(SerializedEngine::new(engine))
    } else {
        Arc::new(engine)
    }
}

/// Startup cannot continue. Wait for the user to acknowledge, then exit
/// cleanly.
async fn abort(cli: &Cli, log: &LogHandle) -> Result<()> {
    if cli.no_wait {
        return Ok(());
    }
    log.info("Press Enter to exit...");
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    })
    .await?;
    Ok(())
}

fn print_banner(colored: bool) -> io::Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let mut out = io::stdout();
    if colored {
        execute!(
            out,
            SetForegroundColor(Color::White),
            Print("  path-server :: navmesh pathfinding over TCP  "),
            SetForegroundColor(Color::Yellow),
            Print(format!("v{}\n\n", version)),
            ResetColor
        )
    } else {
        execute!(
            out,
            Print(format!(
                "  path-server :: navmesh pathfinding over TCP  v{}\n\n",
                version
            ))
        )
    }
}
