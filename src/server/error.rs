//! API error mapping for the HTTP surface.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::{_prelude::*, error::UpstreamError};

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error code for programmatic handling.
	pub code: String,
	/// Human-readable error message.
	pub message: String,
}

/// API error type.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// Request could not be parsed or validated.
	#[error("{0}")]
	BadRequest(String),
	/// Failure raised by the broker core.
	#[error(transparent)]
	Broker(#[from] Error),
}
impl ApiError {
	/// Builds an [`ApiError::BadRequest`].
	pub fn bad_request(message: impl Into<String>) -> Self {
		Self::BadRequest(message.into())
	}

	/// Error code for this error.
	pub fn code(&self) -> &'static str {
		match self {
			Self::BadRequest(_) => "bad_request",
			Self::Broker(e) => match e {
				Error::InvalidRequest { .. } => "bad_request",
				Error::Upstream(UpstreamError::CredentialsExhausted { .. }) =>
					"credentials_exhausted",
				Error::Upstream(UpstreamError::Status { .. }) => "upstream_error",
				Error::Transport(_) => "transport_error",
				Error::Storage(_) => "storage_error",
				Error::Object(_) => "object_error",
				Error::Config(_) => "config_error",
			},
		}
	}

	/// HTTP status code for this error.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::BadRequest(_) => StatusCode::BAD_REQUEST,
			Self::Broker(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
			Self::Broker(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status_code();

		if status.is_server_error() {
			tracing::error!(code = self.code(), error = %self, "Request failed.");
		}

		let body = ErrorResponse { code: self.code().into(), message: self.to_string() };

		(status, Json(body)).into_response()
	}
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
