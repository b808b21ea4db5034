use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tn_thumbnails::{http, Config, Instrumented};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Generates and serves thumbnails
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	/// JSON configuration file, defaults are used when omitted
	#[arg(long, env = "THUMBNAILS_CONFIG")]
	config: Option<PathBuf>,

	/// Address the http server listens on
	#[arg(long, env = "THUMBNAILS_LISTEN", default_value = "127.0.0.1:9186")]
	listen: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(fmt::layer())
		.with(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new("info,tn_thumbnails=debug")),
		)
		.init();

	let args = Args::parse();

	let config = match &args.config {
		Some(path) => Config::from_path(path)
			.with_context(|| format!("failed to load config <path='{}'>", path.display()))?,
		None => {
			warn!("No config file given, using defaults");
			Config::default()
		}
	};

	let service = config
		.build_service()
		.context("failed to set up the thumbnail service")?;

	let app = http::router(Arc::new(Instrumented::new(service)));

	let listener = TcpListener::bind(args.listen)
		.await
		.with_context(|| format!("failed to bind <addr='{}'>", args.listen))?;

	info!("Listening on http://{}", args.listen);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("error with http server")
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!(?e, "Failed to listen for the shutdown signal, running until killed");
		std::future::pending::<()>().await;
	}

	info!("Shutting down");
}
