use crate::report::{run_assess, run_tables, AssessArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use newborn_care::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Newborn Care",
    about = "Newborn growth, bilirubin and special-management decision support",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Assess one newborn from the command line
    Assess(AssessArgs),
    /// Print the bilirubin threshold tables
    Tables,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Growth reference CSV (overrides NEWBORN_REFERENCE_TABLE)
    #[arg(long)]
    pub(crate) reference_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_assess(args),
        Command::Tables => run_tables(),
    }
}
