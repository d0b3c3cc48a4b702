use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use jiff::civil::{Date, Time};
use tracing::error;

use pmb::artifact::{parse_date, parse_time};
use pmb::config::DEFAULT_CONFIG_PATH;
use pmb::{Config, DatabaseScope, Operation, PmbError, logging};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "pmb")]
#[command(about = "Full and incremental MySQL backups from dumps and binary logs")]
struct Args {
    /// What to do: backup, restore or fetch
    #[arg(value_name = "ACTION")]
    actions: Vec<String>,

    /// Take a full backup (dump)
    #[arg(long, short = 'f')]
    full: bool,

    /// Capture the binary log written since the last backup
    #[arg(long, short = 'i')]
    incremental: bool,

    /// Cover every database instead of the configured default
    #[arg(long)]
    all_databases: bool,

    /// Cover this database instead of the configured default
    #[arg(long, value_name = "NAME")]
    database: Option<String>,

    /// Day to restore or fetch (YYYYMMDD, default today)
    #[arg(long, value_parser = date_arg)]
    date: Option<Date>,

    /// Latest incremental time to include (HHMM, default end of day)
    #[arg(long, value_parser = time_arg)]
    time: Option<Time>,

    /// Only write to the log file, not the console
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Console verbosity (repeat for more)
    #[arg(long, short, action = ArgAction::Count)]
    verbose: u8,
}

fn date_arg(s: &str) -> Result<Date, String> {
    parse_date(s).ok_or_else(|| format!("invalid date '{}', expected YYYYMMDD", s))
}

fn time_arg(s: &str) -> Result<Time, String> {
    parse_time(s).ok_or_else(|| format!("invalid time '{}', expected HHMM", s))
}

/// Command-line position of a flag, if the user passed it.
fn position(matches: &ArgMatches, id: &str) -> Option<usize> {
    match matches.value_source(id) {
        Some(ValueSource::CommandLine) => matches.index_of(id),
        _ => None,
    }
}

/// Everything a command needs from the command line, already validated.
pub struct Invocation {
    pub scope: DatabaseScope,
    pub date: Option<Date>,
    pub time: Option<Time>,
    pub quiet: bool,
}

/// Scope from `--all-databases`/`--database`, the first one given winning.
fn scope(matches: &ArgMatches, args: &Args, default_database: &str) -> DatabaseScope {
    DatabaseScope::resolve(
        position(matches, "all_databases"),
        position(matches, "database").zip(args.database.as_deref()),
        default_database,
    )
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let operation = match Operation::from_args(&args.actions, args.full, args.incremental) {
        Ok(operation) => operation,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(e.exit_code());
        }
    };
    logging::init(&config.logging.log_path, args.verbose, args.quiet)?;

    let invocation = Invocation {
        scope: scope(&matches, &args, &config.mysql.default_database),
        date: args.date,
        time: args.time,
        quiet: args.quiet,
    };

    if let Err(e) = run(operation, &config, &invocation) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}

fn run(operation: Operation, config: &Config, invocation: &Invocation) -> Result<(), PmbError> {
    match operation {
        Operation::Backup(mode) => commands::backup::run(config, invocation, mode),
        Operation::Restore => commands::restore::run(config, invocation),
        Operation::Fetch => commands::fetch::run(config, invocation),
    }
}
