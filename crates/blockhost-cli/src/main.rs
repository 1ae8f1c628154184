//! CLI entry point - the composition root.
//!
//! Loads the config, wires the registry via bootstrap and dispatches to the
//! command handlers.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use blockhost_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load_or_default(cli.config.as_deref()).map_err(CliError::from)?;
    let ctx = bootstrap(config);

    match cli.command {
        Commands::Run { ids } => handlers::run::execute(&ctx, ids).await,
        Commands::List => handlers::list::execute(&ctx).await,
        Commands::Status { id } => handlers::status::execute(&ctx, &id).await,
        Commands::Logs {
            id,
            source,
            search,
            limit,
        } => handlers::logs::execute(&ctx, &id, source, search, limit).await,
        Commands::SetProperty { id, pairs } => {
            handlers::set_property::execute(&ctx, &id, &pairs).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}
