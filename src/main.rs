use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use mudlink::config::{ConfigOrigin, MudlinkConfig};
use mudlink::errors::AppResult;
use mudlink::render::{TableRenderer, render_negotiation_table, render_registry};
use mudlink::replay::{ReplayReport, parse_hex_capture, replay};
use telnet_automata::Decision;

#[derive(Parser)]
#[command(name = "mudlink")]
#[command(version)]
#[command(about = "Replay and inspect telnet negotiation", long_about = None)]
struct Cli {
    /// Configuration file, created with defaults when missing
    #[arg(short, long, global = true, default_value = "mudlink.toml")]
    config: PathBuf,

    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a captured server stream through a protocol session
    Replay {
        /// Capture file, or `-` for stdin
        capture: String,

        /// Bytes per feed call (0 feeds everything at once)
        #[arg(long, default_value = "512")]
        chunk: usize,

        /// Capture is whitespace separated hex instead of raw bytes
        #[arg(long)]
        hex: bool,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the option negotiation transition table
    Table {
        /// How unsolicited offers are answered
        #[arg(long, value_enum, default_value = "accept")]
        policy: Policy,

        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },

    /// List the options the configured session negotiates
    Options {
        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    Accept,
    Refuse,
}

impl From<Policy> for Decision {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Accept => Decision::Accept,
            Policy::Refuse => Decision::Refuse,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("mudlink: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let (config, origin) = MudlinkConfig::load_from_file(&cli.config)?;
    init_logging(&config, cli.verbose);

    match origin {
        ConfigOrigin::File => debug!(path = %cli.config.display(), "configuration loaded"),
        ConfigOrigin::TemplateWritten => {
            info!(path = %cli.config.display(), "wrote default configuration")
        }
        ConfigOrigin::DefaultsOnly { reason } => warn!(
            path = %cli.config.display(),
            %reason,
            "could not create default config file, using defaults"
        ),
    }

    match cli.command {
        Commands::Replay {
            capture,
            chunk,
            hex,
            json,
        } => cmd_replay(&config, &capture, chunk, hex, json),
        Commands::Table { policy, no_color } => {
            let renderer = TableRenderer::new(!no_color);
            let mut stdout = io::stdout().lock();
            render_negotiation_table(&renderer, &mut stdout, policy.into())?;
            Ok(())
        }
        Commands::Options { no_color } => {
            let renderer = TableRenderer::new(!no_color);
            let mut stdout = io::stdout().lock();
            render_registry(&renderer, &mut stdout, &config.options)?;
            Ok(())
        }
    }
}

fn init_logging(config: &MudlinkConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

fn cmd_replay(
    config: &MudlinkConfig,
    capture: &str,
    chunk: usize,
    hex: bool,
    json: bool,
) -> AppResult<()> {
    let raw = if capture == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        buffer
    } else {
        fs::read(capture)?
    };

    let input = if hex {
        parse_hex_capture(&String::from_utf8_lossy(&raw))?
    } else {
        raw
    };

    let mut session = config.build_session();
    let (output, chunks) = replay(&mut session, &input, chunk)?;
    let source = if capture == "-" { "stdin" } else { capture };
    let report = ReplayReport::new(source, input.len(), chunks, &output, &session);

    let mut stdout = io::stdout().lock();
    if json {
        writeln!(stdout, "{}", report.to_json()?)?;
    } else {
        report.write_text(&mut stdout)?;
    }
    Ok(())
}
