//! Transport primitives for the upstream download API.
//!
//! The module exposes [`FetchHttpClient`] alongside [`HttpReply`] and [`ResponseMetadata`] so
//! downstream crates can plug in custom HTTP stacks. The fetcher only ever issues `GET` requests
//! and classifies replies by status, so a transport reports every HTTP status as a reply and
//! reserves its error type for failures where no status is available (DNS, TCP, TLS, body read).

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Boxed future returned by [`FetchHttpClient::get`].
pub type HttpFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpReply, E>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of downloading a resource.
///
/// Implementations must be `Send + Sync + 'static` so a single client can be shared by the
/// fetcher across concurrent requests, and the returned futures must be `Send` so handlers can
/// run on a multi-threaded executor.
pub trait FetchHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Issues a `GET` for `url` and buffers the full response body.
	fn get(&self, url: Url) -> HttpFuture<'_, Self::TransportError>;
}

/// Captures metadata from an HTTP response for logging and classification.
///
/// Additional metadata fields may be added in future releases, so downstream code
/// should construct values using field names instead of struct update syntax.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Buffered response returned by a [`FetchHttpClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Header-derived metadata.
	pub metadata: ResponseMetadata,
	/// Full response body.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Builds a reply without metadata.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, metadata: ResponseMetadata::default(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for HTTP 429.
	pub fn is_rate_limited(&self) -> bool {
		self.status == 429
	}

	/// Decodes the body lossily for error reporting.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
impl Debug for HttpReply {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpReply")
			.field("status", &self.status)
			.field("metadata", &self.metadata)
			.field("body_len", &self.body.len())
			.finish()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The request URL embeds a credential, so reqwest errors are stripped of their URL before they
/// leave the transport.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl FetchHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn get(&self, url: Url) -> HttpFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.get(url).send().await.map_err(ReqwestError::without_url)?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await.map_err(ReqwestError::without_url)?.to_vec();

			Ok(HttpReply { status, metadata: ResponseMetadata { retry_after }, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
