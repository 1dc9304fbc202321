use crate::demo::{run_demo, run_match_delivery, run_rank, DemoArgs, MatchDeliveryArgs, RankArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fleet_ops::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Fleet Operations Dispatch",
    about = "Rank vehicles, match deliveries, and run the fleet dispatch service",
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
    /// Rank reallocation candidates for a vehicle's load
    Rank(RankArgs),
    /// Pick a vehicle for a new delivery
    MatchDelivery(MatchDeliveryArgs),
    /// Walk through reallocation, assistance, and delivery workflows
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
        Command::Rank(args) => run_rank(args),
        Command::MatchDelivery(args) => run_match_delivery(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
