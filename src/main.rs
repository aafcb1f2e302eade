use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dqmwatch::demo::{demo_packages, DemoFiller};
use dqmwatch::{ClientConfig, MonitorView, SessionEnd, SessionEvent, SessionHandle, UpdateSummary};
use dqmwatch_wire::protocol::server::ServerSession;
use dqmwatch_wire::protocol::UpdateHeader;

/// Experiment number the demo server reports.
const DEMO_EXPERIMENT: i32 = 1;
/// Run-control state the demo server reports while running.
const DEMO_RUN_STATE: i32 = 2;
/// Entries added to every demo histogram per frame.
const DEMO_EVENTS_PER_FRAME: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "dqmwatch")]
#[command(about = "Live client for data-quality monitoring histogram servers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a monitoring server and print a summary per update
    Connect(ConnectArgs),
    /// Serve synthetic histograms for local testing
    DemoServer(DemoArgs),
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host (overrides the configuration)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides the configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Package to monitor; repeat for several. Default: all packages
    #[arg(short = 'P', long = "package")]
    packages: Vec<String>,

    /// Print one JSON summary per update
    #[arg(long)]
    json: bool,

    /// Close the session after this many updates
    #[arg(long)]
    max_updates: Option<u64>,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    bind: String,

    /// Milliseconds between update frames
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Update frames per run before the run number advances
    #[arg(long, default_value = "20")]
    run_length: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Connect(args) => run_connect(args),
        Command::DemoServer(args) => {
            init_tracing("info");
            run_demo_server(args)
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run a monitoring session until the server leaves or Ctrl-C.
fn run_connect(args: ConnectArgs) -> Result<()> {
    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if !args.packages.is_empty() {
        config.packages = args.packages;
    }
    init_tracing(&config.log_filter);

    let addr = config.address();
    println!("Connecting to {}...", addr);
    let (handle, mut events) =
        SessionHandle::connect(addr.as_str(), config.selection(), config.channel_capacity)?;
    println!("Connected!");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let (json, max_updates) = (args.json, args.max_updates);
    let mut view = MonitorView::new();
    runtime.block_on(async {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    handle.close();
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    view.apply(&event);
                    report(&event, &view, json)?;
                    if max_updates.is_some_and(|max| view.updates >= max) {
                        handle.close();
                    }
                }
            }
        }
        Ok::<_, anyhow::Error>(())
    })?;

    let dropped = handle.dropped_updates();
    if dropped > 0 {
        tracing::warn!(dropped, "updates dropped while printing");
    }

    match handle.join()? {
        SessionEnd::Closed => Ok(()),
        SessionEnd::Failed(e) => Err(e).context("Monitoring session failed"),
    }
}

fn report(event: &SessionEvent, view: &MonitorView, json: bool) -> Result<()> {
    match event {
        SessionEvent::PackageList(names) => {
            println!("Server offers {} packages: {}", names.len(), names.join(", "));
        }
        SessionEvent::Configured(packages) => {
            let names: Vec<&str> = packages.iter().map(|p| p.name()).collect();
            println!("Monitoring {}", names.join(", "));
        }
        SessionEvent::Update { header, new_run, .. } => {
            if *new_run {
                println!("Run {}/{} started", header.exp, header.run);
            }
            if let Some(summary) = view.summary() {
                if json {
                    println!("{}", serde_json::to_string(&summary)?);
                } else {
                    print_summary(&summary);
                }
            }
        }
        SessionEvent::Reset { reason } => {
            println!("Session ended: {}", reason);
        }
    }
    Ok(())
}

fn print_summary(summary: &UpdateSummary) {
    let packages: Vec<String> = summary
        .packages
        .iter()
        .map(|p| match p.rate {
            Some(rate) => format!("{} {:.0} ({:.1}/s)", p.name, p.entries, rate),
            None => format!("{} {:.0}", p.name, p.entries),
        })
        .collect();
    println!(
        "[exp {} run {} state {}] #{}: {}",
        summary.exp,
        summary.run,
        summary.state,
        summary.updates,
        packages.join(" | ")
    );
}

/// Accept clients forever, one thread each.
fn run_demo_server(args: DemoArgs) -> Result<()> {
    let listener =
        TcpListener::bind(&args.bind).with_context(|| format!("Failed to bind {}", args.bind))?;
    println!("Serving demo histograms on {}", listener.local_addr()?);

    let interval = Duration::from_millis(args.interval_ms);
    for (client, stream) in listener.incoming().enumerate() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        let run_length = args.run_length.max(1);
        thread::Builder::new()
            .name(format!("demo-client-{}", client))
            .spawn(move || {
                if let Err(e) = serve_demo_client(stream, interval, run_length, client as u64) {
                    tracing::warn!(error = %e, "demo client failed");
                }
            })
            .context("Failed to spawn client thread")?;
    }
    Ok(())
}

fn serve_demo_client(
    stream: TcpStream,
    interval: Duration,
    run_length: u64,
    seed: u64,
) -> dqmwatch_wire::Result<()> {
    let peer = stream.peer_addr()?;
    tracing::info!(%peer, "client connected");

    let mut server = ServerSession::new(stream, demo_packages());
    server.handshake()?;

    let mut filler = DemoFiller::new(seed);
    let mut run = 1;
    let mut frames_in_run = 0;
    loop {
        if frames_in_run == run_length {
            run += 1;
            frames_in_run = 0;
            server.packages_mut().iter_mut().for_each(|p| p.reset());
            tracing::info!(%peer, run, "starting new run");
        }
        filler.fill(server.packages_mut(), DEMO_EVENTS_PER_FRAME);

        let header = UpdateHeader::new(DEMO_EXPERIMENT, run, DEMO_RUN_STATE);
        if !server.try_update(header)? {
            tracing::info!(%peer, frames = server.frames(), "client left");
            return Ok(());
        }
        frames_in_run += 1;
        thread::sleep(interval);
    }
}
