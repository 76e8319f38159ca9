mod config;
mod poll;
mod probes;
mod render;
mod state;

use clap::Parser;
use config::Config;
use poll::poll_host;
use probes::{ProbeSettings, Prober, SystemProber};
use render::RenderSettings;
use reqwest::Client;
use state::HostState;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostmon")]
#[command(version)]
#[command(about = "Live reachability and latency table for a set of hosts")]
struct Cli {
    /// File with one host per line. Blank lines and `#` comments are skipped.
    #[arg(
        short = 'f',
        long,
        conflicts_with = "server",
        required_unless_present_any = ["server", "print_default_config"]
    )]
    file: Option<String>,
    /// Host to monitor. May be given more than once.
    #[arg(short = 's', long)]
    server: Vec<String>,
    /// Echo requests per probe cycle.
    #[arg(short = 'c', long, default_value_t = 3)]
    count: u32,
    /// Spacing between echo requests.
    #[arg(short = 'i', long, default_value = "200ms", value_parser = humantime::parse_duration)]
    interval: Duration,
    /// Per-echo reply timeout.
    #[arg(short = 't', long, default_value = "1s", value_parser = humantime::parse_duration)]
    timeout: Duration,
    /// Timeout for the application-layer status check.
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    http_timeout: Duration,
    /// Pause between probe cycles for each host.
    #[arg(short = 'd', long, default_value = "15s", value_parser = humantime::parse_duration)]
    cooldown: Duration,
    /// Screen refresh period.
    #[arg(long, default_value = "250ms", value_parser = humantime::parse_duration)]
    tick: Duration,
    /// Optional YAML file overriding the severity bands.
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    if cli.count == 0 {
        error!("count must be >= 1");
        std::process::exit(1);
    }

    let cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load config");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let hosts = match gather_hosts(&cli) {
        Ok(hosts) => hosts,
        Err(err) => {
            error!(error = %err, "failed to load host list");
            std::process::exit(1);
        }
    };
    if hosts.is_empty() {
        warn!("host list is empty, nothing to monitor");
        return;
    }

    info!(hosts = hosts.len(), cooldown = ?cli.cooldown, "starting hostmon");

    let client = Client::builder()
        .user_agent("hostmon/0.1.0")
        .build()
        .unwrap_or_else(|_| Client::new());
    let prober: Arc<dyn Prober> = Arc::new(SystemProber::new(client));
    let settings = ProbeSettings {
        ping_count: cli.count,
        ping_interval: cli.interval,
        ping_timeout: cli.timeout,
        http_timeout: cli.http_timeout,
    };

    let states: Vec<_> = hosts
        .iter()
        .map(|host| HostState::shared(host.clone()))
        .collect();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut poll_tasks = Vec::with_capacity(states.len());
    for state in &states {
        let prober = prober.clone();
        let state = state.clone();
        let settings = settings.clone();
        let shutdown = shutdown_rx.clone();
        poll_tasks.push(tokio::spawn(poll_host(
            prober,
            state,
            settings,
            cli.cooldown,
            shutdown,
        )));
    }

    let mut renderer_task = {
        let states = states.clone();
        let shutdown = shutdown_rx.clone();
        let render_settings = RenderSettings {
            tick: cli.tick,
            cooldown: cli.cooldown,
            bands: cfg.bands.clone(),
        };
        tokio::spawn(render::run_renderer(states, render_settings, shutdown))
    };

    // The renderer exits on its own when the user presses q or Esc; Ctrl+C
    // arrives as a signal only while the terminal is not in raw mode, so
    // both paths are needed.
    let exit_code = tokio::select! {
        res = &mut renderer_task => {
            info!("renderer exited, shutting down");
            renderer_outcome(res)
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                error!(error = %err, "failed to wait for Ctrl+C");
            }
            info!("received Ctrl+C, shutting down");
            let _ = shutdown_tx.send(true);
            renderer_outcome(renderer_task.await)
        }
    };

    let _ = shutdown_tx.send(true);
    for task in poll_tasks {
        let _ = task.await;
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn renderer_outcome(res: Result<io::Result<()>, tokio::task::JoinError>) -> i32 {
    match res {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            error!(error = %err, "terminal renderer failed");
            1
        }
        Err(err) => {
            error!(error = %err, "renderer task failed");
            1
        }
    }
}

fn gather_hosts(cli: &Cli) -> Result<Vec<String>, config::HostListError> {
    match &cli.file {
        Some(path) => config::load_host_file(path),
        None => Ok(cli.server.clone()),
    }
}

/// Logs go to stderr so they survive a redirect while the table owns stdout.
/// The default is quiet; RUST_LOG opens it up.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
