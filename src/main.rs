// Runtime Configuration spike - walks through the Runtime Configuration API
//
// Authenticates with Application Default Credentials, creates a config, lists
// configs, grants a role on it, creates/reads/deletes a variable and finally
// deletes the config again.

use clap::Parser;
use std::path::PathBuf;

use runtimeconfig_spike::config::{process_env, EnvVars, LogLevel, SettingsOverrides};
use runtimeconfig_spike::runtimeconfig::RuntimeConfigClientConfig;
use runtimeconfig_spike::{
    connect, run_spike, ApplicationDefaultCredentials, Error, Settings, SettingsLoader,
};

/// Runtime Configuration spike - exercise the Runtime Configuration API
#[derive(Parser, Debug)]
#[command(name = "runtimeconfig-spike")]
#[command(about = "Create, inspect and delete a Runtime Configuration config and variable")]
#[command(version)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Settings file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Runtime Configuration API root
    #[arg(long)]
    endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Delete created resources when a later step fails
    #[arg(long)]
    cleanup_on_failure: bool,
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            endpoint: self.endpoint.clone(),
            request_timeout_secs: self.timeout,
            cleanup_on_failure: self.cleanup_on_failure.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let loader = SettingsLoader::new(args.config.clone());
    let settings = match loader.load(&process_env, &args.overrides()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(Error::from(err).exit_code());
        }
    };

    init_logging(args.verbose, args.json_logs, settings.log_level);
    tracing::debug!(
        source = ?settings.source,
        endpoint = %settings.endpoint,
        timeout = ?settings.request_timeout,
        cleanup_on_failure = settings.spike.cleanup_on_failure,
        "Settings loaded"
    );

    if let Err(err) = run(&settings).await {
        tracing::error!(operation = ?err.operation().map(|op| op.method_name()), "{}", err);
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }
}

/// Resolve credentials and run the spike once
async fn run(settings: &Settings) -> Result<(), Error> {
    tracing::info!("Starting Runtime Configuration spike");

    println!("Creating Runtime Configuration API client");
    let source = ApplicationDefaultCredentials::new();
    let client_config = RuntimeConfigClientConfig {
        endpoint: settings.endpoint.clone(),
        timeout: settings.request_timeout,
        ..Default::default()
    };
    let connected = connect(&source, client_config, &process_env).await?;

    let mut stdout = std::io::stdout();
    let report = run_spike(
        &connected.client,
        &connected.project_id,
        &settings.spike,
        &mut stdout,
    )
    .await?;

    tracing::info!(config = %report.config_path, "Runtime Configuration spike finished");
    Ok(())
}

/// Initialize logging on stderr so stdout carries only progress lines
fn init_logging(verbose: bool, json: bool, level: LogLevel) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = if verbose {
        LogLevel::Debug
    } else {
        level
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(EnvVars::LOG)
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| format!("runtimeconfig_spike={}", log_level).into());

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
