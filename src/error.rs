//! Broker-level error types shared across the key pool, fetcher, cache, and stores.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Document-store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Object-store failure.
	#[error("{0}")]
	Object(
		#[from]
		#[source]
		crate::object::ObjectError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream download API refused the request.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Caller supplied malformed input.
	#[error("Invalid request: {reason}.")]
	InvalidRequest {
		/// Human-readable explanation of what was rejected.
		reason: String,
	},
}
impl Error {
	/// Builds an [`Error::InvalidRequest`] from any displayable reason.
	pub fn invalid_request(reason: impl Into<String>) -> Self {
		Self::InvalidRequest { reason: reason.into() }
	}

	/// Returns `true` when the failure was caused by the caller's input.
	pub fn is_client_error(&self) -> bool {
		matches!(self, Self::InvalidRequest { .. })
	}
}
impl From<crate::model::IdentifierError> for Error {
	fn from(e: crate::model::IdentifierError) -> Self {
		Self::invalid_request(e.to_string())
	}
}

/// Configuration and validation failures raised while wiring the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The fetcher was configured without any upstream credential.
	#[error("At least one upstream credential is required.")]
	NoCredentials,
	/// Upstream endpoint cannot be used as a request base.
	#[error("Upstream endpoint `{endpoint}` is invalid.")]
	InvalidEndpoint {
		/// Offending endpoint string.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Public object URL base cannot be built from the host + bucket pair.
	#[error("Public object URL base for bucket `{bucket}` is invalid.")]
	InvalidPublicBase {
		/// Bucket name used to build the base.
		bucket: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Server bind address cannot be parsed.
	#[error("Bind address `{bind}` is invalid.")]
	InvalidBind {
		/// Offending bind string.
		bind: String,
		/// Underlying parsing failure.
		#[source]
		source: std::net::AddrParseError,
	},
	/// Reset schedule time is outside of a 24-hour clock.
	#[error("Reset time {hour:02}:{minute:02} is not a valid time of day.")]
	InvalidResetTime {
		/// Configured hour.
		hour: u8,
		/// Configured minute.
		minute: u8,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Terminal responses from the upstream download API.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Every configured credential answered with HTTP 429.
	#[error("All {attempts} upstream credentials are rate limited; unable to download the filing.")]
	CredentialsExhausted {
		/// Number of attempts made before giving up.
		attempts: usize,
	},
	/// Upstream answered with a non-success status other than 429.
	#[error("Upstream returned HTTP {status}: {body}.")]
	Status {
		/// HTTP status code returned by the upstream API.
		status: u16,
		/// Response body, decoded lossily as UTF-8.
		body: String,
	},
}

/// Transport-level failures (DNS, TCP, TLS, body read).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the download API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
