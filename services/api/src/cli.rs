use crate::demo::{run_demo, run_requirements, DemoArgs, RequirementsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use subsidy_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Subsidy Intake",
    about = "Derive, reconcile and collect the supporting documents of housing-subsidy applications",
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
    /// Print the documents required for a set of application facts
    Requirements(RequirementsArgs),
    /// Run an in-memory walkthrough: derive, upload, remove and score
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Requirements(args) => run_requirements(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
