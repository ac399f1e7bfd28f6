//! Upstream download loop with sticky credential rotation.
//!
//! [`RateLimitedFetcher::download`] walks the credential ring starting at the shared cursor. A
//! 429 rotates to the next credential immediately; any other non-success status, or a transport
//! failure, ends the download without rotating. Each call tries every credential at most once.

mod metrics;
pub mod rotation;

pub use metrics::FetchMetrics;
pub use rotation::*;

// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError, UpstreamError},
	http::FetchHttpClient,
	model::Credential,
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Fetcher specialized for the crate's default reqwest transport.
pub type ReqwestFetcher = RateLimitedFetcher<ReqwestHttpClient>;

/// Downloads resources through the upstream API, rotating credentials on rate limits.
pub struct RateLimitedFetcher<C>
where
	C: ?Sized + FetchHttpClient,
{
	/// HTTP client used for every upstream request.
	pub http_client: Arc<C>,
	/// Shared download counters.
	pub metrics: Arc<FetchMetrics>,
	endpoint: Url,
	ring: CredentialRing,
}
impl<C> RateLimitedFetcher<C>
where
	C: ?Sized + FetchHttpClient,
{
	/// Query parameter carrying the credential.
	pub const TOKEN_PARAM: &'static str = "token";
	/// Query parameter carrying the source URL.
	pub const URL_PARAM: &'static str = "url";

	/// Creates a fetcher; at least one credential is required.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		endpoint: Url,
		credentials: Vec<Credential>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			http_client: http_client.into(),
			metrics: Default::default(),
			endpoint,
			ring: CredentialRing::new(credentials)?,
		})
	}

	/// Upstream endpoint requests are sent to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Index of the credential the next download starts with.
	pub fn cursor(&self) -> usize {
		self.ring.position()
	}

	/// Number of configured credentials.
	pub fn credential_count(&self) -> usize {
		self.ring.len()
	}

	/// Downloads `resource_url`, returning the full response body.
	pub async fn download(&self, resource_url: &str) -> Result<Vec<u8>> {
		const KIND: OpKind = OpKind::Download;

		let span = OpSpan::new(KIND, "download");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.rotate(resource_url)).await;

		match &result {
			Ok(body) => {
				self.metrics.record_success();
				obs::record_op_outcome(KIND, OpOutcome::Success);
				tracing::debug!(bytes = body.len(), "Downloaded resource.");
			},
			Err(e) => {
				self.metrics.record_failure();
				obs::record_op_outcome(KIND, OpOutcome::Failure);
				tracing::warn!(error = %e, "Download failed.");
			},
		}

		result
	}

	async fn rotate(&self, resource_url: &str) -> Result<Vec<u8>> {
		let total = self.ring.len();
		let mut index = self.ring.position();

		for attempt in 1..=total {
			let credential = self.ring.credential(index);

			self.metrics.record_attempt();

			let reply = self
				.http_client
				.get(self.request_url(credential, resource_url))
				.await
				.map_err(TransportError::network)?;

			if reply.is_success() {
				return Ok(reply.body);
			}
			if !reply.is_rate_limited() {
				return Err(UpstreamError::Status { status: reply.status, body: reply.body_text() }
					.into());
			}

			self.metrics.record_rate_limited();
			tracing::warn!(
				credential = %credential.hint(),
				attempt,
				retry_after_secs = reply.metadata.retry_after.map(|d| d.whole_seconds()),
				"Credential is rate limited; rotating."
			);

			index = self.ring.advance(index);
		}

		Err(UpstreamError::CredentialsExhausted { attempts: total }.into())
	}

	fn request_url(&self, credential: &Credential, resource_url: &str) -> Url {
		let mut url = self.endpoint.clone();

		url.query_pairs_mut()
			.append_pair(Self::TOKEN_PARAM, credential.expose())
			.append_pair(Self::URL_PARAM, resource_url);

		url
	}
}
impl<C> Debug for RateLimitedFetcher<C>
where
	C: ?Sized + FetchHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimitedFetcher")
			.field("endpoint", &self.endpoint.as_str())
			.field("credentials", &self.ring.len())
			.field("cursor", &self.ring.position())
			.finish()
	}
}
