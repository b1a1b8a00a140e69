//! Shelly device CLI
//!
//! Talks JSON-RPC to one device per invocation and prints replies as pretty
//! JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use shelly_rpc::{
    AnyComponent, CallContext, ComponentKey, Config, Kvs, RpcClient, Shelly, Switch,
    TransportKind,
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Command line client for Shelly Gen2+ devices
#[derive(Parser, Debug)]
#[command(name = "shelly")]
#[command(version, about)]
#[command(after_help = "\
Examples:
  shelly -d 192.168.33.1 info
  shelly -d boiler status switch:0
  shelly -d boiler switch 0 on --toggle-after 600
  shelly -d garage --ws call Shelly.GetStatus
  shelly -d garage call Switch.Set '{\"id\": 0, \"on\": false}'
  shelly -d garage kvs set greeting '\"hello\"'
")]
struct Cli {
    /// Device name from the config file, or an address (`host[:port]` or URL)
    #[arg(short, long, env = "SHELLY_DEVICE")]
    device: Option<String>,

    /// Use the persistent WebSocket channel instead of HTTP
    #[arg(long)]
    ws: bool,

    /// Per-call timeout in milliseconds (overrides the config file)
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Config file (defaults to `<config_dir>/shelly/config.json`)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Invoke any RPC method
    Call {
        /// Method name, e.g. `Sys.GetStatus`
        method: String,
        /// Params as a JSON object
        params: Option<String>,
    },

    /// Show a component's status (`switch:0`, `sys`, ...)
    Status { key: ComponentKey },

    /// Show a component's config (`switch:0`, `sys`, ...)
    Config { key: ComponentKey },

    /// Drive a switch output
    Switch {
        id: u32,
        #[command(subcommand)]
        action: SwitchAction,
    },

    /// Key-value store on the device
    Kvs {
        #[command(subcommand)]
        command: KvsCommand,
    },

    /// Show device identity and firmware
    Info {
        /// Include identification-only fields
        #[arg(long)]
        ident: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SwitchAction {
    On {
        /// Flip back off after this many seconds
        #[arg(long, value_name = "SECONDS")]
        toggle_after: Option<f64>,
    },
    Off {
        /// Flip back on after this many seconds
        #[arg(long, value_name = "SECONDS")]
        toggle_after: Option<f64>,
    },
    Toggle,
}

#[derive(Subcommand, Debug)]
enum KvsCommand {
    Get {
        key: String,
    },
    /// Store a value; parsed as JSON, or taken as a plain string
    Set {
        key: String,
        value: String,
        #[arg(long)]
        etag: Option<String>,
    },
    Delete {
        key: String,
        #[arg(long)]
        etag: Option<String>,
    },
    /// List keys, optionally filtered by a `*` pattern
    List {
        #[arg(long = "match", value_name = "PATTERN")]
        pattern: Option<String>,
    },
}

/// Set up logging to stderr.
/// Debug builds default to debug level, release builds to info.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shelly={default_level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_params(params: Option<&str>) -> Result<Option<Value>> {
    params
        .map(|text| serde_json::from_str(text).context("params must be valid JSON"))
        .transpose()
}

/// JSON if it parses, otherwise the literal text as a string.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

async fn connect(cli: &Cli, ctx: &CallContext) -> Result<Arc<RpcClient>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(timeout) = cli.timeout {
        config.client.request_timeout_ms = timeout;
    }

    let Some(target) = cli.device.as_deref() else {
        bail!("No device given. Use --device <name|address> or set SHELLY_DEVICE");
    };

    let mut device = config.resolve(target);
    if cli.ws {
        device.transport = TransportKind::Ws;
    }
    debug!("Using {} over {:?}", device.address, device.transport);

    let client = device
        .connect(ctx, &config.client)
        .await
        .with_context(|| format!("Failed to connect to {}", device.address))?;
    Ok(Arc::new(client))
}

async fn run(cli: &Cli, client: &Arc<RpcClient>, ctx: &CallContext) -> Result<()> {
    match &cli.command {
        Commands::Call { method, params } => {
            let params = parse_params(params.as_deref())?;
            let raw = client.call(ctx, method, params).await?;
            let value: Value = serde_json::from_str(raw.get())?;
            print_json(&value)
        }
        Commands::Status { key } => {
            let component = AnyComponent::new(client.clone(), key.clone());
            print_json(&component.get_status(ctx).await?)
        }
        Commands::Config { key } => {
            let component = AnyComponent::new(client.clone(), key.clone());
            print_json(&component.get_config(ctx).await?)
        }
        Commands::Switch { id, action } => {
            let switch = Switch::new(client.clone(), *id);
            let result = match action {
                SwitchAction::On { toggle_after } => switch.set(ctx, true, *toggle_after).await?,
                SwitchAction::Off { toggle_after } => {
                    switch.set(ctx, false, *toggle_after).await?
                }
                SwitchAction::Toggle => switch.toggle(ctx).await?,
            };
            info!("switch:{} was {}", id, if result.was_on { "on" } else { "off" });
            print_json(&result)
        }
        Commands::Kvs { command } => run_kvs(command, client, ctx).await,
        Commands::Info { ident } => {
            let device = Shelly::new(client.clone());
            print_json(&device.get_device_info(ctx, *ident).await?)
        }
    }
}

async fn run_kvs(command: &KvsCommand, client: &Arc<RpcClient>, ctx: &CallContext) -> Result<()> {
    let kvs = Kvs::new(client.clone());
    match command {
        KvsCommand::Get { key } => print_json(&kvs.get(ctx, key).await?),
        KvsCommand::Set { key, value, etag } => {
            let result = kvs
                .set(ctx, key, parse_value(value), etag.as_deref())
                .await?;
            print_json(&result)
        }
        KvsCommand::Delete { key, etag } => print_json(&kvs.delete(ctx, key, etag.as_deref()).await?),
        KvsCommand::List { pattern } => print_json(&kvs.list(ctx, pattern.as_deref()).await?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let ctx = CallContext::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let client = connect(&cli, &ctx).await?;
    let call_ctx = match client.default_context().deadline() {
        Some(deadline) => ctx.child().with_deadline(deadline),
        None => ctx.child(),
    };

    let result = run(&cli, &client, &call_ctx).await;
    client.close().await?;
    result
}
