use crate::derive::{run_derive, DeriveArgs};
use crate::server;
use adoption_params::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Adoption Parameters",
    about = "Derive stakeholder adoption parameters from survey answers",
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
    /// Derive every parameter table from a parameters file and answer directory
    Derive(DeriveArgs),
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
        Command::Derive(args) => run_derive(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["adoption-params-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn derive_accepts_path_overrides() {
        let cli = Cli::try_parse_from([
            "adoption-params-api",
            "derive",
            "--parameters",
            "config/eu.toml",
            "--answers-dir",
            "data/answers",
            "--output-dir",
            "out",
            "--json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Derive(args)) => {
                assert_eq!(
                    args.parameters.as_deref(),
                    Some(std::path::Path::new("config/eu.toml"))
                );
                assert_eq!(
                    args.answers_dir.as_deref(),
                    Some(std::path::Path::new("data/answers"))
                );
                assert!(args.json);
            }
            other => panic!("expected derive command, got {other:?}"),
        }
    }
}
