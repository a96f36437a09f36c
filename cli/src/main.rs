//! evgen-run
//!
//! Run one event generator from the command line.
//!
//! Usage: `evgen-run <GENERATOR> -n N --beams SPEC [-p KEY=VALUE]... [-P FILE]...`
//!
//! Parameter files are applied first, in the order given, then `-p`
//! overrides. Events go to stdout unless `--output` names a file; logs
//! always go to stderr.

mod error;

use clap::{ArgAction, Parser};
use evgen_core::engines::p1::SEED_LIMIT;
use evgen_core::params::file::load_into;
use evgen_core::search::SEARCH_PATH_ENV;
use evgen_core::{
    CancellationToken, OutputFormat, ParameterDictionary, Precision, Registry, RunConfig, RunDriver,
    RunError, RunRequest, SearchPath,
};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "evgen-run")]
#[command(about = "Drive a native event generator through one run", long_about = None)]
#[command(version)]
struct Args {
    /// Generator name (see --list)
    #[arg(required_unless_present = "list")]
    generator: Option<String>,

    /// Print the resolvable generator names and exit
    #[arg(long)]
    list: bool,

    /// Number of events to generate
    #[arg(short = 'n', long = "events", default_value_t = 1)]
    events: u64,

    /// Beam specification, e.g. "p:900,pbar:900" or "LHC:14000"
    #[arg(short, long)]
    beams: Option<String>,

    /// Parameter override (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Parameter file (repeatable); bare names are looked up on the search path
    #[arg(short = 'P', long = "param-file", value_name = "FILE")]
    param_files: Vec<PathBuf>,

    /// Random seed
    #[arg(short, long, conflicts_with = "randomize_seed")]
    seed: Option<u64>,

    /// Draw a fresh random seed
    #[arg(long)]
    randomize_seed: bool,

    /// Output file, or "-" for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Significant digits for momenta
    #[arg(long, default_value_t = 8)]
    precision: u8,

    /// Filter level: 0 none, 1 physical, 2 stable
    #[arg(short, long, default_value_t = 0)]
    filter: u8,

    /// Output format: ascii or json
    #[arg(long, default_value = "ascii")]
    format: String,

    /// Print the resolved configuration to stderr before running
    #[arg(long)]
    dump_config: bool,

    /// Write the JSON run report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let code = match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            err.exit_code()
        }
    };
    process::exit(code);
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: Args) -> Result<i32, CliError> {
    let cwd = std::env::current_dir().map_err(CliError::WorkingDir)?;
    let search = SearchPath::standard(cwd, std::env::var_os(SEARCH_PATH_ENV).as_deref());
    let registry = Registry::with_builtin(search.clone());

    if args.list {
        for name in registry.resolvable() {
            println!("{}", name);
        }
        return Ok(0);
    }
    let generator = args.generator.unwrap_or_default();
    registry.check(&generator).map_err(RunError::from)?;

    // Files first, then command-line overrides
    let mut params = ParameterDictionary::new();
    for file in &args.param_files {
        load_into(file, &search, &mut params)?;
    }
    let mut overrides = ParameterDictionary::new();
    for assignment in &args.params {
        overrides.insert_assignment(assignment)?;
    }
    params.extend_from(&overrides);

    let seed = if args.randomize_seed {
        let seed = random_seed();
        info!(seed, "randomized seed");
        Some(seed)
    } else {
        args.seed
    };

    let config = RunConfig::resolve(RunRequest {
        generator,
        beams: args.beams,
        seed,
        num_events: args.events,
        filter_level: args.filter,
        params,
    })?;

    if args.dump_config {
        eprint!("{}", config.resolved().dump());
    }

    let precision = Precision::new(args.precision).ok_or(CliError::Precision(args.precision))?;
    let format: OutputFormat = args.format.parse().map_err(CliError::Format)?;

    let sink: Box<dyn Write> = if args.output == "-" {
        Box::new(io::stdout().lock())
    } else {
        let path = PathBuf::from(&args.output);
        let file = File::create(&path).map_err(|source| CliError::Output { path, source })?;
        Box::new(BufWriter::new(file))
    };
    let mut writer = format.writer(sink, precision);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.cancel()) {
        warn!("cannot install interrupt handler: {}", e);
    }

    let report = RunDriver::new(&registry, cancel).run(&config, writer.as_mut())?;

    if let Some(path) = &args.report {
        let written = serde_json::to_string_pretty(&report)
            .map_err(io::Error::from)
            .and_then(|json| fs::write(path, json));
        if let Err(e) = written {
            warn!("cannot write report {}: {}", path.display(), e);
        }
    }

    Ok(report.exit_code())
}

/// Fresh seed inside every engine's native range
fn random_seed() -> u64 {
    (Uuid::new_v4().as_u128() as u64) % SEED_LIMIT
}
