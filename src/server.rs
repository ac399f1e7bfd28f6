//! JSON-over-HTTP surface: shared state, router, and listener lifecycle.

pub mod error;
pub mod handlers;

pub use error::*;

// crates.io
use axum::{
	Router,
	routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	cache::FilingCache,
	config::BrokerConfig,
	error::ConfigError,
	fetch::RateLimitedFetcher,
	http::ReqwestHttpClient,
	object::{FsObjectStore, ObjectStore},
	pool::KeyPool,
	store::{DocumentStore, FileStore},
};

/// Handles shared by every request.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Key pool over the tokens collection.
	pub pool: KeyPool,
	/// Filing cache over the filings collection.
	pub cache: Arc<FilingCache<ReqwestHttpClient>>,
}
impl AppState {
	/// Bundles already-constructed components.
	pub fn new(pool: KeyPool, cache: impl Into<Arc<FilingCache<ReqwestHttpClient>>>) -> Self {
		Self { pool, cache: cache.into() }
	}

	/// Builds the file-backed stores, the reqwest transport, and the fetcher from `config`.
	pub fn from_config(config: &BrokerConfig) -> Result<Self> {
		let documents: Arc<dyn DocumentStore> =
			Arc::new(FileStore::open(config.storage.documents_path.clone())?);
		let objects: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::open(
			config.storage.objects_root.clone(),
			config.storage.public_base()?,
		)?);
		let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;
		let fetcher = RateLimitedFetcher::new(
			ReqwestHttpClient::with_client(client),
			config.upstream.endpoint_url()?,
			config.upstream.credentials.clone(),
		)?;
		let pool = KeyPool::with_collection(documents.clone(), &config.collections.tokens);
		let cache = FilingCache::new(documents, objects, fetcher)
			.with_collection(&config.collections.filings);

		tracing::info!(
			documents = %config.storage.documents_path.display(),
			objects = %config.storage.objects_root.display(),
			credentials = cache.fetcher().credential_count(),
			"Broker components initialized."
		);

		Ok(Self::new(pool, cache))
	}
}

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/api/view", post(handlers::view_filing))
		.route("/getKeys", get(handlers::get_keys))
		.route("/markKeysUsed", post(handlers::mark_keys_used))
		.route("/getAvailableKeyCount", get(handlers::available_key_count))
		.route("/leaseKeys", post(handlers::lease_keys))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

/// Serves `router` on `listener` until `shutdown` resolves, then drains in-flight requests.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	if let Ok(addr) = listener.local_addr() {
		tracing::info!(%addr, "Listening.");
	}

	axum::serve(listener, router).with_graceful_shutdown(shutdown).await
}
