//! pgcopy CLI - dependency-ordered compare and copy between PostgreSQL databases.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pgcopy::{Config, Operation, Orchestrator, RunConfig, ShowRows, SyncError};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pgcopy")]
#[command(about = "Dependency-ordered schema diff, data comparison and copy between PostgreSQL databases")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON run summary to stdout after the report
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print definition lines for every source table and generator
    Define(SchemaArgs),

    /// Print CREATE/ALTER TABLE statements for what the destination lacks
    Alter(AlterArgs),

    /// Copy the tables and generators named by definition lines on stdin
    Copy(CopyArgs),

    /// Define and copy every table in one step
    Single(WriteArgs),

    /// Compare the rows of the tables named by definition lines on stdin
    Compare(CompareArgs),
}

#[derive(Args)]
struct SchemaArgs {
    /// One transaction per side for the whole run
    #[arg(long)]
    single_transaction: bool,

    /// Render an HTML report instead of text
    #[arg(long)]
    html: bool,
}

#[derive(Args)]
struct AlterArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Omit NOT NULL from generated ALTER TABLE ADD statements
    #[arg(long)]
    relaxed_nulls: bool,
}

#[derive(Args)]
struct WriteArgs {
    /// One transaction per side for the whole run
    #[arg(long)]
    single_transaction: bool,

    /// Continue past rows that cannot be copied
    #[arg(long)]
    keep_going: bool,

    /// Print generated SQL and every row error
    #[arg(long)]
    verbose: bool,

    /// Leave destination triggers enabled while copying
    #[arg(long)]
    fire_triggers: bool,

    /// Commit the destination at every checkpoint
    #[arg(long)]
    commit_on_checkpoint: bool,
}

#[derive(Args)]
struct CopyArgs {
    #[command(flatten)]
    write: WriteArgs,

    /// Update the row by primary key when an insert fails
    #[arg(long)]
    update: bool,
}

#[derive(Args)]
struct CompareArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Hide HTML tables that would display no rows
    #[arg(long)]
    limited: bool,

    /// Row classes listed in the HTML report
    #[arg(long, value_enum, value_delimiter = ',')]
    show: Vec<ShowArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowArg {
    Same,
    Missing,
    Extra,
    Different,
}

impl From<ShowArg> for ShowRows {
    fn from(arg: ShowArg) -> Self {
        match arg {
            ShowArg::Same => ShowRows::Same,
            ShowArg::Missing => ShowRows::Missing,
            ShowArg::Extra => ShowRows::Extra,
            ShowArg::Different => ShowRows::Different,
        }
    }
}

impl SchemaArgs {
    fn apply(&self, run: &mut RunConfig) {
        run.single_transaction |= self.single_transaction;
        run.html |= self.html;
    }
}

impl WriteArgs {
    fn apply(&self, run: &mut RunConfig) {
        run.single_transaction |= self.single_transaction;
        run.keep_going |= self.keep_going;
        run.verbose |= self.verbose;
        run.fire_triggers |= self.fire_triggers;
        run.commit_on_checkpoint |= self.commit_on_checkpoint;
    }
}

impl Commands {
    /// Operation to run, with the command-line options applied over the file's.
    fn apply(&self, run: &mut RunConfig) -> Operation {
        match self {
            Commands::Define(args) => {
                args.apply(run);
                Operation::Define
            }
            Commands::Alter(args) => {
                args.schema.apply(run);
                run.relaxed_nulls |= args.relaxed_nulls;
                Operation::Alter
            }
            Commands::Copy(args) => {
                args.write.apply(run);
                run.update_fallback |= args.update;
                Operation::Copy
            }
            Commands::Single(args) => {
                args.apply(run);
                Operation::Single
            }
            Commands::Compare(args) => {
                args.schema.apply(run);
                run.limited |= args.limited;
                if !args.show.is_empty() {
                    run.show = args.show.iter().copied().map(ShowRows::from).collect();
                }
                Operation::Compare
            }
        }
    }
}

/// Exit code for command-line usage errors.
const USAGE_EXIT_CODE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(USAGE_EXIT_CODE),
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), SyncError> {
    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format).map_err(SyncError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let operation = cli.command.apply(&mut config.run);
    config.validate_for(operation)?;

    let orchestrator = Orchestrator::connect(config, operation).await?;
    let summary = orchestrator
        .run(operation, io::stdin().lock(), io::stdout())
        .await?;

    if cli.output_json {
        println!("{}", summary.to_json()?);
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
