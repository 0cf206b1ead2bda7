use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use green_dot::config::parse_duration;
use green_dot::{
    app, bridge, cursor, App, AppEvent, Config, EdgePolicy, EnigoCursor, HotkeyManager, KeepAlive,
    TerminalButton, ToggleController, Transport,
};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "greendot", version, about = "Start/Stop toggle that nudges the mouse cursor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Where pointer calls are executed
    #[arg(long, value_enum)]
    transport: Option<Transport>,

    /// Global hotkey that toggles, e.g. "ctrl+alt+g"
    #[arg(long, conflicts_with = "no_hotkey")]
    hotkey: Option<String>,

    /// Do not register a global hotkey
    #[arg(long)]
    no_hotkey: bool,

    /// Wiggle the pointer at this interval while running, e.g. "3s"
    #[arg(long, value_parser = parse_interval)]
    keep_alive: Option<Duration>,

    /// What to do when a move would leave the screen
    #[arg(long, value_enum)]
    edge: Option<EdgePolicy>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    save_config: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve pointer requests on stdin/stdout for a parent process
    #[command(hide = true)]
    Bridge {
        #[arg(long, value_enum, default_value_t = EdgePolicy::Clamp)]
        edge: EdgePolicy,
    },
}

fn parse_interval(value: &str) -> std::result::Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(hotkey) = &self.hotkey {
            config.toggle_hotkey = hotkey.clone();
            config.hotkey_enabled = true;
        }
        if self.no_hotkey {
            config.hotkey_enabled = false;
        }
        if let Some(interval) = self.keep_alive {
            config.keep_alive = Some(interval);
        }
        if let Some(edge) = self.edge {
            config.edge_policy = edge;
        }
        config.verbose |= self.verbose;
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "green_dot=debug,greendot=debug"
    } else {
        "green_dot=info,greendot=info"
    };
    // stdout belongs to the button, or to the wire in bridge mode.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn setup_hotkey(config: &Config, events: UnboundedSender<AppEvent>) -> Result<HotkeyManager> {
    Ok(HotkeyManager::start(&config.toggle_hotkey, events)?)
}

async fn run_bridge(edge: EdgePolicy) -> Result<()> {
    init_tracing(false);
    let mut cursor = EnigoCursor::new(edge);
    bridge::serve(
        &mut cursor,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
    .context("bridge stopped")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Bridge { edge }) = &cli.command {
        return run_bridge(*edge).await;
    }

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;
    init_tracing(config.verbose);

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        println!("{} configuration saved to {}", "✓".green(), path);
        return Ok(());
    }

    let cursor = cursor::connect(&config)?;
    info!(transport = ?config.transport, edge = ?config.edge_policy, "cursor service ready");

    println!("{} {}", "●".green(), "Green Dot".bold());

    let (events, receiver) = unbounded_channel();
    let _hotkeys = if config.hotkey_enabled {
        match setup_hotkey(&config, events.clone()) {
            Ok(manager) => {
                println!("  hotkey: {}", config.toggle_hotkey.cyan());
                Some(manager)
            }
            Err(e) => {
                warn!(error = %e, "continuing without global hotkey");
                None
            }
        }
    } else {
        None
    };
    if let Some(interval) = config.keep_alive {
        println!("  keep-alive: every {}ms", interval.as_millis());
    }

    app::spawn_terminal_reader(events.clone())?;
    drop(events);

    let controller = ToggleController::new(TerminalButton::new(), cursor);
    let keep_alive = config
        .keep_alive
        .map(|interval| KeepAlive::new(interval, config.keep_alive_step));

    let controller = App::new(controller, keep_alive)
        .run(receiver, app::wait_for_signal(tokio::signal::ctrl_c()))
        .await;

    info!(state = ?controller.state(), "exiting");
    Ok(())
}
