use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use librime_bridge::{handle_line, NativeRime};
use rime_bridge_core::{Bridge, BridgeConfig, MockRime, RimeApi};
use tracing_subscriber::EnvFilter;

/// Serve Rime session operations over stdin/stdout, one JSON request per line.
#[derive(Parser, Debug)]
#[command(name = "rime-bridge", version, about)]
struct Args {
    /// TOML file with distribution metadata and loader hints
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to librime, overriding the config and platform defaults
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Use the built-in in-memory engine instead of librime
    #[arg(long)]
    demo: bool,

    /// Print the operation table and exit
    #[arg(long)]
    list_ops: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load_toml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    if let Some(lib) = &args.library {
        config.library = Some(lib.clone());
    }
    Ok(config)
}

fn attach(args: &Args, config: BridgeConfig) -> Result<Bridge<Box<dyn RimeApi + Send>>> {
    let bridge = if args.demo {
        tracing::info!("using in-memory engine");
        Bridge::attach(|_| Ok(Box::new(MockRime::new()) as Box<dyn RimeApi + Send>), config)
    } else {
        Bridge::attach(
            |cfg| NativeRime::load(cfg).map(|n| Box::new(n) as Box<dyn RimeApi + Send>),
            config,
        )
    };
    bridge.context("attaching to librime (try --demo)")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;
    let bridge = attach(&args, config)?;

    if args.list_ops {
        for op in bridge.operations() {
            println!("{:<28} {}..={}  {}", op.name, op.min_args, op.max_args, op.doc);
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if let Some(answer) = handle_line(&bridge, &line) {
            writeln!(out, "{}", answer).context("writing stdout")?;
            out.flush().context("writing stdout")?;
        }
    }

    bridge.with_handle(|h| h.finalize());
    Ok(())
}
