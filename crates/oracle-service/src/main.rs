use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oracle_account::implementations::local;
use oracle_chain::implementations::rpc;
use oracle_config::{Config, ConfigLoader};
use oracle_core::{EngineBuilder, VerificationEngine};
use oracle_storage::implementations::{file, memory};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;

#[derive(Parser)]
#[command(name = "mint-oracle")]
#[command(about = "Payment verification and mint authorization oracle", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/oracle.toml")]
	config: PathBuf,

	/// Overrides `oracle.log_level` from the configuration file
	#[arg(long, env = "ORACLE_LOG_LEVEL")]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the oracle HTTP service
	Start,
	/// Validate the configuration file and signing key
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

	setup_tracing(cli.log_level.as_deref().unwrap_or(&config.oracle.log_level));

	match cli.command {
		Some(Commands::Start) | None => start_service(config).await,
		Some(Commands::Validate) => validate_config(config),
	}
}

fn build_engine(config: Config) -> Result<VerificationEngine> {
	EngineBuilder::new(config)
		.with_storage_factory("memory", |c| Ok(memory::create_storage(c)))
		.with_storage_factory("file", |c| Ok(file::create_storage(c)))
		.with_chain_factory("alloy", rpc::create_chain_reader)
		.with_account_factory("local", local::create_account)
		.build()
		.context("Failed to build verification engine")
}

async fn start_service(config: Config) -> Result<()> {
	info!("Starting {}", config.oracle.name);

	let host = config.oracle.http_host.clone();
	let port = config.oracle.http_port;
	let engine = Arc::new(build_engine(config)?);

	api::start_http_server(engine, &host, port, shutdown_signal())
		.await
		.context("HTTP server failed")?;

	info!("Oracle stopped");
	Ok(())
}

fn validate_config(config: Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Oracle name: {}", config.oracle.name);
	info!("Chain provider: {}", config.chain.provider);
	info!("Storage backend: {}", config.storage.backend);
	info!("Payment recipient: {}", config.payment.recipient);
	info!("Price tiers: {:?}", config.payment.tiers);

	let engine = build_engine(config)?;
	info!("Signer address: {}", engine.signer_address());

	Ok(())
}

fn setup_tracing(log_level: &str) {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to listen for SIGTERM: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("Shutdown signal received");
}
