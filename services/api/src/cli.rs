use crate::server;
use crate::simulate::{run_simulation, SimulateArgs};
use clap::{Args, Parser, Subcommand};
use solar_proposal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Solar Proposal Service",
    about = "Serve the proposal webhook or generate a proposal from the command line",
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
    /// Generate one proposal locally and print the computed figures
    Simulate(SimulateArgs),
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
        Command::Simulate(args) => run_simulation(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_optional() {
        let cli = Cli::try_parse_from(["solar-proposal-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn simulate_accepts_proposal_fields() {
        let cli = Cli::try_parse_from([
            "solar-proposal-api",
            "simulate",
            "--name",
            "Ana Souza",
            "--address",
            "Rua A, 10 - Centro",
            "--bill",
            "439,85",
            "--output-dir",
            "/tmp/propostas",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Simulate(args)) => {
                assert_eq!(args.name, "Ana Souza");
                assert_eq!(args.bill, "439,85");
                assert_eq!(
                    args.output_dir.as_deref(),
                    Some(std::path::Path::new("/tmp/propostas"))
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
