//! `filing-broker` server binary.

// std
use std::path::PathBuf;
// crates.io
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use time::UtcOffset;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use filing_broker::{
	config::{BrokerConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH},
	schedule::ResetScheduler,
	server::{self, AppState},
};

/// Rate-limited API key pool and filing cache server.
#[derive(Debug, Parser)]
#[command(name = "filing-broker", version, about, long_about = None)]
struct Args {
	/// Path to the configuration file; missing files are skipped.
	#[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
	config: PathBuf,
}

fn main() -> Result<()> {
	// Reading the local offset is only sound while the process is single-threaded.
	let offset = UtcOffset::current_local_offset();

	color_eyre::install()?;

	let args = Args::parse();

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=info".into()))
		.with(tracing_subscriber::fmt::layer())
		.init();
	tracing::info!("filing-broker v{}", env!("CARGO_PKG_VERSION"));

	let offset = offset.unwrap_or_else(|e| {
		tracing::warn!(error = %e, "Local UTC offset is unavailable; scheduling in UTC.");

		UtcOffset::UTC
	});
	let config = BrokerConfig::load(&args.config).wrap_err("failed to load configuration")?;
	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.wrap_err("failed to start the async runtime")?;

	runtime.block_on(run(config, offset))
}

async fn run(config: BrokerConfig, offset: UtcOffset) -> Result<()> {
	let reset_at = config.reset.time_of_day()?;
	let addr = config.server.socket_addr()?;
	let state =
		AppState::from_config(&config).wrap_err("failed to initialize broker components")?;
	let scheduler = ResetScheduler::spawn(state.pool.clone(), reset_at, offset);

	tracing::info!(%offset, %reset_at, "Stale key reset scheduled.");

	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.wrap_err_with(|| format!("failed to bind to {addr}"))?;

	server::serve(listener, server::create_router(state), shutdown_signal())
		.await
		.wrap_err("server error")?;
	scheduler.shutdown().await;
	tracing::info!("Shut down cleanly.");

	Ok(())
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("Shutdown signal received; draining requests."),
		Err(e) => {
			tracing::error!(error = %e, "Failed to listen for the shutdown signal.");

			std::future::pending::<()>().await;
		},
	}
}
