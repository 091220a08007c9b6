//! w3 CLI

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::{path::PathBuf, process::ExitCode};
use tracing::error;
use w3up_cli::{config::Config, inspect, shard, store::FileStore, Error};

/// Flag for verbose output
const VERBOSE_FLAG: &str = "verbose";

/// Flag for JSON output
const JSON_FLAG: &str = "json";

/// Loads the configuration file (if any) and applies flag overrides.
fn load_config(matches: &ArgMatches) -> Result<Config, Error> {
    let mut cfg = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Ok(Some(shard_size)) = matches.try_get_one::<usize>("shard-size") {
        cfg.shard_size = *shard_size;
    }
    if matches.get_flag("verify") {
        cfg.verify = true;
    }
    Ok(cfg)
}

fn run_shard(matches: &ArgMatches) -> Result<(), Error> {
    let cfg = load_config(matches)?;
    let car = matches.get_one::<PathBuf>("car").unwrap();
    let out = matches.get_one::<PathBuf>("out").unwrap();
    let mut store = FileStore::new(out)?;
    let summary = shard::shard(car, &cfg, &mut store)?;
    if matches.get_flag(JSON_FLAG) {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

fn run_inspect(matches: &ArgMatches) -> Result<(), Error> {
    let cfg = load_config(matches)?;
    let car = matches.get_one::<PathBuf>("car").unwrap();
    let stats = inspect::inspect(car, &cfg)?;
    if matches.get_flag(JSON_FLAG) {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{stats}");
    }
    Ok(())
}

fn car_arg() -> Arg {
    Arg::new("car")
        .required(true)
        .help("Path to the CAR file")
        .value_parser(value_parser!(PathBuf))
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .help("Path to YAML config file")
        .value_parser(value_parser!(PathBuf))
}

fn verify_arg() -> Arg {
    Arg::new("verify")
        .long("verify")
        .help("Check every block against its link while decoding")
        .action(ArgAction::SetTrue)
}

fn json_arg() -> Arg {
    Arg::new(JSON_FLAG)
        .long(JSON_FLAG)
        .help("Print results as JSON")
        .action(ArgAction::SetTrue)
}

/// Entrypoint for the w3 CLI
fn main() -> ExitCode {
    // Define application
    let matches = Command::new("w3")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Split content-addressed archives into size-bounded shards.")
        .arg(
            Arg::new(VERBOSE_FLAG)
                .short('v')
                .long(VERBOSE_FLAG)
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new(shard::CMD)
                .about("Split a CAR file into shards no larger than the shard size and store each one in a directory.")
                .arg(car_arg())
                .arg(
                    Arg::new("out")
                        .long("out")
                        .required(true)
                        .help("Directory to write shards to")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("shard-size")
                        .long("shard-size")
                        .help("Maximum size of a shard in bytes (overrides the config file)")
                        .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..)),
                )
                .arg(config_arg())
                .arg(verify_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new(inspect::CMD)
                .about("Print the roots of a CAR file and count its blocks.")
                .arg(car_arg())
                .arg(config_arg())
                .arg(verify_arg())
                .arg(json_arg()),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag(VERBOSE_FLAG) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    // Parse subcommands
    match matches.subcommand() {
        Some((shard::CMD, matches)) => {
            if let Err(e) = run_shard(matches) {
                error!(error = %e, "failed to shard archive");
            } else {
                return ExitCode::SUCCESS;
            }
        }
        Some((inspect::CMD, matches)) => {
            if let Err(e) = run_inspect(matches) {
                error!(error = %e, "failed to inspect archive");
            } else {
                return ExitCode::SUCCESS;
            }
        }
        Some((cmd, _)) => {
            error!(cmd, "invalid subcommand");
        }
        None => {
            error!("no subcommand provided");
        }
    }
    ExitCode::FAILURE
}
