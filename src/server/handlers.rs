//! Request handlers for the filing and key endpoints.
//!
//! Bodies and query strings are parsed by hand so malformed input always yields a JSON
//! `400 bad_request` instead of an extractor rejection.

// crates.io
use axum::{
	Json,
	body::Bytes,
	extract::{RawQuery, State},
};
// self
use crate::{
	_prelude::*,
	model::{FilingSubmission, KeyId},
	server::{
		AppState,
		error::{ApiError, ApiResult},
	},
};

const INVALID_COUNT: &str = "Invalid 'count' parameter";
const INVALID_BODY: &str = "Invalid request body";

/// Body returned by `POST /api/view`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewResponse {
	/// Public URL of the cached filing.
	#[serde(rename = "fileURL")]
	pub file_url: String,
}

/// Body returned by `GET /getAvailableKeyCount`.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyCountResponse {
	/// Number of keys in the `available` state.
	pub available_keys_count: usize,
}

/// `POST /api/view`: resolves a filing to its public URL, downloading it on a miss.
pub async fn view_filing(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ViewResponse>> {
	let submission = serde_json::from_slice::<FilingSubmission>(&body)
		.map_err(|e| ApiError::bad_request(format!("{INVALID_BODY}: {e}")))?;
	let file_url = state.cache.resolve(submission.into_record()?).await?;

	Ok(Json(ViewResponse { file_url }))
}

/// `GET /getKeys?count=N`: lists up to `N` available keys without marking them.
pub async fn get_keys(
	State(state): State<AppState>,
	RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<KeyId>>> {
	let count = parse_count(query.as_deref())?;

	Ok(Json(state.pool.list_available(count).await?))
}

/// `POST /markKeysUsed`: marks a JSON array of key ids as used.
pub async fn mark_keys_used(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
	let ids = serde_json::from_slice::<Vec<String>>(&body)
		.map_err(|_| ApiError::bad_request(INVALID_BODY))?;
	let outcome = state.pool.mark_used(ids).await;

	if outcome.failed() > 0 {
		tracing::warn!(failed = outcome.failed(), "Some keys could not be marked used.");
	}

	Ok("Keys updated successfully")
}

/// `GET /getAvailableKeyCount`.
pub async fn available_key_count(State(state): State<AppState>) -> ApiResult<Json<KeyCountResponse>> {
	let available_keys_count = state.pool.count_available().await?;

	Ok(Json(KeyCountResponse { available_keys_count }))
}

/// `POST /leaseKeys?count=N`: atomically claims up to `N` available keys.
pub async fn lease_keys(
	State(state): State<AppState>,
	RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<KeyId>>> {
	let count = parse_count(query.as_deref())?;

	Ok(Json(state.pool.lease(count).await?))
}

/// Extracts a positive `count` from a raw query string.
fn parse_count(query: Option<&str>) -> ApiResult<usize> {
	query
		.and_then(|raw| {
			url::form_urlencoded::parse(raw.as_bytes())
				.find(|(key, _)| key == "count")
				.map(|(_, value)| value.into_owned())
		})
		.and_then(|value| value.trim().parse::<usize>().ok())
		.filter(|count| *count > 0)
		.ok_or_else(|| ApiError::bad_request(INVALID_COUNT))
}
