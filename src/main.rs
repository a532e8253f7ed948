use attendex::app::App;
use attendex::cli::{Args, Command};
use attendex::config::Config;
use attendex::logging::setup_logging;
use clap::Parser;
use figment::{Figment, providers::Env};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config: Config = match Figment::new().merge(Env::raw()).extract() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config.log_level, args.tracing);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                environment = if cfg!(debug_assertions) {
                    "development"
                } else {
                    "production"
                },
                "starting attendex"
            );

            let app = match App::new(config).await {
                Ok(app) => app,
                Err(e) => {
                    error!(error = ?e, "failed to initialize application");
                    return ExitCode::FAILURE;
                }
            };
            app.run().await
        }
        Command::Classroom(classroom) => match attendex::classroom::runner::run(classroom).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "classroom session failed");
                ExitCode::FAILURE
            }
        },
    }
}
