//! Typed broker configuration with per-field defaults.
//!
//! Every section can be omitted. With the `server` feature, [`BrokerConfig::load`] layers an
//! optional TOML file, `FILING_BROKER_*` environment variables (`__` separates sections, e.g.
//! `FILING_BROKER_UPSTREAM__CREDENTIALS=[k1,k2]`), and the plain `PORT` variable.

// std
use std::{
	net::SocketAddr,
	path::{Path, PathBuf},
};
// crates.io
#[cfg(feature = "server")]
use figment::{
	Figment,
	providers::{Env, Format, Toml},
};
use time::Time;
// self
use crate::{_prelude::*, error::ConfigError, model::Credential, object::PublicUrlBase};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "FILING_BROKER_";
/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "FILING_BROKER_CONFIG";
/// Configuration file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/filing-broker.toml";

/// Root configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
	/// Listener settings.
	#[serde(default)]
	pub server: ServerConfig,
	/// Upstream download API.
	#[serde(default)]
	pub upstream: UpstreamConfig,
	/// Document and object storage.
	#[serde(default)]
	pub storage: StorageConfig,
	/// Collection names.
	#[serde(default)]
	pub collections: CollectionsConfig,
	/// Daily reset schedule.
	#[serde(default)]
	pub reset: ResetConfig,
}
impl BrokerConfig {
	/// Layers the file at `path` (skipped when absent), `FILING_BROKER_*`, and `PORT`.
	#[cfg(feature = "server")]
	pub fn figment(path: &Path) -> Figment {
		let mut figment = Figment::new();

		if path.exists() {
			tracing::info!(config_path = %path.display(), "Loading configuration from file.");

			figment = figment.merge(Toml::file(path));
		} else {
			tracing::debug!(config_path = %path.display(), "No configuration file found.");
		}

		figment
			.merge(
				Env::prefixed(ENV_PREFIX)
					.filter(|key| !key.as_str().eq_ignore_ascii_case("config"))
					.split("__"),
			)
			.merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
	}

	/// Loads the configuration; see [`BrokerConfig::figment`].
	#[cfg(feature = "server")]
	pub fn load(path: &Path) -> Result<Self, figment::Error> {
		Self::figment(path).extract()
	}
}

/// Listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
	/// Socket address to listen on.
	#[serde(default = "default_bind")]
	pub bind: String,
	/// Port override, normally fed from `PORT`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,
}
impl ServerConfig {
	/// Resolves the listen address, applying the port override.
	pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
		let mut addr = self
			.bind
			.parse::<SocketAddr>()
			.map_err(|source| ConfigError::InvalidBind { bind: self.bind.clone(), source })?;

		if let Some(port) = self.port {
			addr.set_port(port);
		}

		Ok(addr)
	}
}
impl Default for ServerConfig {
	fn default() -> Self {
		Self { bind: default_bind(), port: None }
	}
}

/// Upstream download API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
	/// Endpoint receiving `token` and `url` query parameters.
	#[serde(default = "default_endpoint")]
	pub endpoint: String,
	/// Credentials in rotation order.
	#[serde(default)]
	pub credentials: Vec<Credential>,
}
impl UpstreamConfig {
	/// Parses the endpoint.
	pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
		let url = Url::parse(&self.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
			endpoint: self.endpoint.clone(),
			source,
		})?;

		if url.cannot_be_a_base() {
			return Err(ConfigError::InvalidEndpoint {
				endpoint: self.endpoint.clone(),
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			});
		}

		Ok(url)
	}
}
impl Default for UpstreamConfig {
	fn default() -> Self {
		Self { endpoint: default_endpoint(), credentials: Vec::new() }
	}
}

/// Storage settings for the bundled file-backed stores.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
	/// JSON snapshot holding every document collection.
	#[serde(default = "default_documents_path")]
	pub documents_path: PathBuf,
	/// Directory holding stored objects.
	#[serde(default = "default_objects_root")]
	pub objects_root: PathBuf,
	/// Host used in public object URLs.
	#[serde(default = "default_public_host")]
	pub public_host: String,
	/// Bucket used in public object URLs.
	#[serde(default = "default_bucket")]
	pub bucket: String,
}
impl StorageConfig {
	/// Builds the `https://<host>/<bucket>` base for public object URLs.
	pub fn public_base(&self) -> Result<PublicUrlBase, ConfigError> {
		PublicUrlBase::new(&self.public_host, &self.bucket)
	}
}
impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			documents_path: default_documents_path(),
			objects_root: default_objects_root(),
			public_host: default_public_host(),
			bucket: default_bucket(),
		}
	}
}

/// Document collection names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionsConfig {
	/// Key records.
	#[serde(default = "default_tokens_collection")]
	pub tokens: String,
	/// Filing records.
	#[serde(default = "default_filings_collection")]
	pub filings: String,
}
impl Default for CollectionsConfig {
	fn default() -> Self {
		Self { tokens: default_tokens_collection(), filings: default_filings_collection() }
	}
}

/// Local time of day the stale-key reset runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetConfig {
	/// Hour, 0-23.
	#[serde(default)]
	pub hour: u8,
	/// Minute, 0-59.
	#[serde(default = "default_reset_minute")]
	pub minute: u8,
}
impl ResetConfig {
	/// Validated time of day.
	pub fn time_of_day(&self) -> Result<Time, ConfigError> {
		Time::from_hms(self.hour, self.minute, 0)
			.map_err(|_| ConfigError::InvalidResetTime { hour: self.hour, minute: self.minute })
	}
}
impl Default for ResetConfig {
	fn default() -> Self {
		Self { hour: 0, minute: default_reset_minute() }
	}
}

fn default_bind() -> String {
	"0.0.0.0:8080".into()
}

fn default_endpoint() -> String {
	"https://api.sec-api.io/filing-reader".into()
}

fn default_documents_path() -> PathBuf {
	PathBuf::from("data/documents.json")
}

fn default_objects_root() -> PathBuf {
	PathBuf::from("data/objects")
}

fn default_public_host() -> String {
	"storage.googleapis.com".into()
}

fn default_bucket() -> String {
	"filing-pdf".into()
}

fn default_tokens_collection() -> String {
	"tokens".into()
}

fn default_filings_collection() -> String {
	"financialReports".into()
}

fn default_reset_minute() -> u8 {
	1
}
