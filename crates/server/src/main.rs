//! RTMP ingest/relay server binary: parses CLI flags, binds the listener,
//! and runs the accept loop until an OS signal asks it to stop (4.12).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rtmprelay_context::Context;
use rtmprelay_rtmp::{Connection, ConnectionConfig, Registry, RelayManager};
use rtmprelay_signal::SignalHandler;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rtmprelay-server", version, about = "RTMP ingest and relay server")]
struct Cli {
    /// Address to accept RTMP connections on.
    #[arg(long, default_value = ":1935")]
    listen: String,

    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "rtmprelay_rtmp=debug".
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Chunk size advertised to every client in the initial control burst.
    #[arg(long, default_value_t = 4096)]
    chunk_size: u32,

    /// Record every published stream to an FLV file, not just ones a hook opts in.
    #[arg(long, default_value_t = false)]
    record_all: bool,

    /// Directory FLV recordings are written to.
    #[arg(long, default_value = "./recordings")]
    record_dir: PathBuf,

    /// `rtmp://host[:port]/app/streamName` destination to relay every published stream to. Repeatable.
    #[arg(long = "relay-to")]
    relay_to: Vec<String>,
}

fn parse_listen_addr(raw: &str) -> Result<SocketAddr, std::net::AddrParseError> {
    let raw = if let Some(port) = raw.strip_prefix(':') { format!("0.0.0.0:{port}") } else { raw.to_owned() };
    raw.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let listen_addr = match parse_listen_addr(&cli.listen) {
        Ok(addr) => addr,
        Err(err) => {
            error!(%err, listen = %cli.listen, "invalid --listen address");
            return ExitCode::from(2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to start tokio runtime");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(async_main(cli, listen_addr))
}

async fn async_main(cli: Cli, listen_addr: SocketAddr) -> ExitCode {
    let (ctx, handler) = Context::new();

    let listener = match TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, addr = %listen_addr, "failed to bind listener");
            return ExitCode::from(1);
        }
    };

    if !cli.record_all {
        // record_dir is only touched when recording is on; skip creating it otherwise.
    } else if let Err(err) = tokio::fs::create_dir_all(&cli.record_dir).await {
        error!(%err, dir = %cli.record_dir.display(), "failed to create recording directory");
        return ExitCode::from(1);
    }

    let relay = if cli.relay_to.is_empty() {
        None
    } else {
        match RelayManager::new(&cli.relay_to, ctx.clone()) {
            Ok(relay) => Some(Arc::new(relay)),
            Err(err) => {
                error!(%err, "invalid --relay-to destination");
                return ExitCode::from(2);
            }
        }
    };

    let config = ConnectionConfig {
        registry: Arc::new(Registry::new()),
        relay,
        record_all: cli.record_all,
        record_dir: cli.record_dir,
        chunk_size: cli.chunk_size,
    };

    info!(addr = %listen_addr, chunk_size = cli.chunk_size, record_all = cli.record_all, "rtmp server listening");

    let accept_ctx = ctx.clone();
    let accept_task = tokio::spawn(accept_loop(listener, accept_ctx, config));

    let mut signals = SignalHandler::with_signals([rtmprelay_signal::SignalKind::Interrupt, rtmprelay_signal::SignalKind::Terminate]);
    let signal = signals.recv().await;
    info!(?signal, "shutdown signal received");

    accept_task.abort();
    handler.shutdown().await;
    info!("shutdown complete");
    ExitCode::SUCCESS
}

async fn accept_loop(listener: TcpListener, ctx: Context, config: ConnectionConfig) {
    let mut next_id = 1u64;
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(%err, "failed to accept connection");
                continue;
            }
        };

        let local_addr = stream.local_addr().ok();
        let connection = Connection::new(next_id, remote_addr, ctx.clone(), config.clone());
        let id = next_id;
        next_id += 1;

        info!(
            connection_id = id,
            client_ip = %remote_addr.ip(),
            client_port = remote_addr.port(),
            server_ip = %local_addr.map(|a| a.ip().to_string()).unwrap_or_default(),
            server_port = local_addr.map(|a| a.port()).unwrap_or(0),
            "connection_accept"
        );
        tokio::spawn(async move {
            if let Err(err) = connection.run(stream).await {
                warn!(connection_id = id, %err, "connection closed with error");
            }
            info!(connection_id = id, "connection_close");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_port_as_wildcard_listen() {
        let addr = parse_listen_addr(":1935").unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:1935");
    }

    #[test]
    fn parses_explicit_host_and_port() {
        let addr = parse_listen_addr("127.0.0.1:1935").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:1935");
    }

    #[test]
    fn rejects_garbage_listen_address() {
        assert!(parse_listen_addr("not-an-address").is_err());
    }
}
