use clap::Parser;
use okrtracker_lib::{
    config::Config,
    init::AppServices,
    services::{self, Cli},
};
use serde_json::Value;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let config = Config::load(config_path.as_deref());
    if let Err(errors) = config.validate() {
        for error in errors {
            eprintln!("Invalid configuration: {}", error);
        }
        return ExitCode::FAILURE;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = Config::init(config) {
        tracing::error!("{}", e);
        return ExitCode::FAILURE;
    }

    let app = match AppServices::initialize(Config::get()).await {
        Ok(app) => app,
        Err(e) => {
            println!("{}", serde_json::json!({ "error": e }));
            return ExitCode::FAILURE;
        }
    };

    match services::execute(cli.command, &app.okr_service).await {
        Ok(Value::Null) => {
            println!("null");
            ExitCode::FAILURE
        }
        Ok(value) => {
            println!("{:#}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            println!("{}", serde_json::json!({ "error": e }));
            ExitCode::FAILURE
        }
    }
}
