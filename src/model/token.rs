//! Pooled API key records and their status lifecycle.

// crates.io
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	model::KeyId,
	store::{Document, FieldFilter, Fields, StoreError},
};

/// Document field holding the key status.
pub const STATUS_FIELD: &str = "status";
/// Document field holding the last status transition instant (RFC 3339).
pub const LAST_MODIFIED_FIELD: &str = "last_modified";

/// Lifecycle status of a pooled key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
	/// The key can be handed out.
	Available,
	/// The key was consumed today and waits for the daily reset.
	Used,
}
impl KeyStatus {
	/// Returns the stable label stored in the document.
	pub const fn as_str(self) -> &'static str {
		match self {
			KeyStatus::Available => "available",
			KeyStatus::Used => "used",
		}
	}

	/// Equality filter selecting documents in this status.
	pub fn filter(self) -> FieldFilter {
		FieldFilter::eq(STATUS_FIELD, self.as_str())
	}
}
impl Display for KeyStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for KeyStatus {
	type Err = StoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"available" => Ok(KeyStatus::Available),
			"used" => Ok(KeyStatus::Used),
			other => Err(StoreError::Serialization { message: format!("unknown key status `{other}`") }),
		}
	}
}

/// A pooled API key as tracked by the metadata store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyToken {
	/// Key value, also the document id.
	pub id: KeyId,
	/// Current status.
	pub status: KeyStatus,
	/// Last status transition, if one was ever recorded.
	pub last_modified: Option<OffsetDateTime>,
}
impl KeyToken {
	/// Creates a token with no recorded transition.
	pub fn new(id: KeyId, status: KeyStatus) -> Self {
		Self { id, status, last_modified: None }
	}

	/// Sets the last transition instant.
	pub fn with_last_modified(mut self, instant: OffsetDateTime) -> Self {
		self.last_modified = Some(instant);

		self
	}

	/// Field patch moving a token into `status` at `instant`.
	pub fn transition_fields(status: KeyStatus, instant: OffsetDateTime) -> Result<Fields, StoreError> {
		let mut fields = Fields::new();

		fields.insert(STATUS_FIELD.into(), Value::from(status.as_str()));
		fields.insert(LAST_MODIFIED_FIELD.into(), timestamp_value(instant)?);

		Ok(fields)
	}

	/// Returns whether the last transition happened on a different calendar day than `now`.
	///
	/// The comparison uses `now`'s UTC offset. `None` means no transition was recorded.
	pub fn is_stale_at(&self, now: OffsetDateTime) -> Option<bool> {
		self.last_modified.map(|modified| modified.to_offset(now.offset()).date() != now.date())
	}

	/// Decodes a token from its stored document.
	pub fn from_document(document: &Document) -> Result<Self, StoreError> {
		let id = KeyId::new(&document.id)
			.map_err(|e| StoreError::malformed(&document.id, e.to_string()))?;
		let status = document
			.field(STATUS_FIELD)
			.and_then(Value::as_str)
			.ok_or_else(|| StoreError::malformed(&document.id, "missing `status` field"))?
			.parse::<KeyStatus>()
			.map_err(|e| StoreError::malformed(&document.id, e.to_string()))?;
		let last_modified = match document.field(LAST_MODIFIED_FIELD) {
			None | Some(Value::Null) => None,
			Some(Value::String(raw)) => Some(
				OffsetDateTime::parse(raw, &Rfc3339)
					.map_err(|e| StoreError::malformed(&document.id, format!("`last_modified`: {e}")))?,
			),
			Some(_) =>
				return Err(StoreError::malformed(&document.id, "`last_modified` is not a string")),
		};

		Ok(Self { id, status, last_modified })
	}

	/// Encodes the token as a document.
	pub fn to_document(&self) -> Result<Document, StoreError> {
		let mut fields = Fields::new();

		fields.insert(STATUS_FIELD.into(), Value::from(self.status.as_str()));

		if let Some(instant) = self.last_modified {
			fields.insert(LAST_MODIFIED_FIELD.into(), timestamp_value(instant)?);
		}

		Ok(Document::new(self.id.as_str(), fields))
	}
}

fn timestamp_value(instant: OffsetDateTime) -> Result<Value, StoreError> {
	instant
		.format(&Rfc3339)
		.map(Value::String)
		.map_err(|e| StoreError::Serialization { message: format!("Failed to format timestamp: {e}") })
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros::datetime;
	// self
	use super::*;

	fn key(id: &str) -> KeyId {
		KeyId::new(id).expect("Key fixture should be valid.")
	}

	#[test]
	fn document_round_trip_keeps_status_and_instant() {
		let token = KeyToken::new(key("k-1"), KeyStatus::Used)
			.with_last_modified(datetime!(2025-11-10 12:00 UTC));
		let document = token.to_document().expect("Token should encode.");

		assert_eq!(document.field(STATUS_FIELD), Some(&json!("used")));
		assert_eq!(document.field(LAST_MODIFIED_FIELD), Some(&json!("2025-11-10T12:00:00Z")));
		assert_eq!(KeyToken::from_document(&document).expect("Token should decode."), token);
	}

	#[test]
	fn decoding_rejects_unknown_status() {
		let mut fields = Fields::new();

		fields.insert(STATUS_FIELD.into(), json!("leased"));

		let err = KeyToken::from_document(&Document::new("k-1", fields))
			.expect_err("Unknown status must be rejected.");

		assert!(matches!(err, StoreError::Malformed { ref id, .. } if id == "k-1"));
	}

	#[test]
	fn staleness_uses_calendar_days_in_now_offset() {
		let now = datetime!(2025-11-11 00:30 +01:00);
		let late_yesterday = KeyToken::new(key("a"), KeyStatus::Used)
			.with_last_modified(datetime!(2025-11-10 22:45 UTC));
		let earlier_today = KeyToken::new(key("b"), KeyStatus::Used)
			.with_last_modified(datetime!(2025-11-10 23:15 UTC));

		assert_eq!(late_yesterday.is_stale_at(now), Some(true));
		assert_eq!(earlier_today.is_stale_at(now), Some(false));
		assert_eq!(KeyToken::new(key("c"), KeyStatus::Used).is_stale_at(now), None);
	}
}
