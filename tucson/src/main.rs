use std::process::ExitCode;

use clap::Parser;
use tucson::cli::{version_text, Cli, Command, ServeArgs, VERSION};
use tucson::tucson_core::layers::init_tracing;
use tucson::tucson_core::{GatewayConfig, Settings};
use tucson::Gateway;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Version => {
            println!("{}", version_text());
            Ok(())
        }
        Command::Serve(args) => run_serve(&cli, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway terminated");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(cli: &Cli, args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply_globals(&mut settings);
    args.apply(&mut settings);

    init_tracing(&settings.logging)?;
    tracing::info!(app = "tucson", version = VERSION, "Starting tucson");

    let config = GatewayConfig::from_settings(settings)?;
    let gateway = Gateway::discover(config).await?;
    tucson::serve(gateway).await?;
    Ok(())
}
