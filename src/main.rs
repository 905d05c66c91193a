// Entrypoint for the CLI application.
// - Sets up logging on stderr so prompts on stdout stay readable.
// - Builds the API client from `TAPE_HOST` and the token file, then
//   dispatches the subcommand (or opens the interactive menu).

use clap::Parser;
use tape_cli::{
    api::ApiClient,
    cli::{run, Cli},
    config::FileConfig,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tape_cli=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let api = ApiClient::from_env(FileConfig::from_home())?;
    run(cli, &api)
}
