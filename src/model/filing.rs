//! Filing metadata records and the inbound submission payload.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	model::FilingId,
	store::{Document, StoreError},
};

/// Metadata stored for every cached filing.
///
/// The record is written with camelCase field names and is fully overwritten every time the
/// filing is reprocessed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingRecord {
	/// Primary key; also names the stored object.
	pub filing_id: FilingId,
	/// Ticker symbol of the filer.
	#[serde(default)]
	pub ticker: String,
	/// Filer's company name.
	#[serde(default)]
	pub company_name: String,
	/// Source URL the filing is downloaded from.
	pub filing_url: String,
	/// Public locator of the cached object, set once the object has been written.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stored_url: Option<String>,
	/// Accession number assigned by the filing agency.
	#[serde(default)]
	pub accession_no: String,
	/// Form type (10-K, 8-K, ...).
	#[serde(default)]
	pub form_type: String,
	/// Instant the filing was filed.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub filed_at: Option<OffsetDateTime>,
	/// Instant the record was last written by the cache.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_updated: Option<OffsetDateTime>,
}
impl FilingRecord {
	/// Creates a record carrying only the required fields.
	pub fn new(filing_id: FilingId, filing_url: impl Into<String>) -> Self {
		Self {
			filing_id,
			ticker: String::new(),
			company_name: String::new(),
			filing_url: filing_url.into(),
			stored_url: None,
			accession_no: String::new(),
			form_type: String::new(),
			filed_at: None,
			last_updated: None,
		}
	}

	/// Decodes a record from its stored document, reporting the failing field path.
	pub fn from_document(document: &Document) -> Result<Self, StoreError> {
		let value = Value::Object(document.fields.clone());

		serde_path_to_error::deserialize(value).map_err(|e| {
			StoreError::malformed(&document.id, format!("{} at `{}`", e.inner(), e.path()))
		})
	}

	/// Encodes the record as a document keyed by its filing id.
	pub fn to_document(&self) -> Result<Document, StoreError> {
		match serde_json::to_value(self) {
			Ok(Value::Object(fields)) => Ok(Document::new(self.filing_id.as_str(), fields)),
			Ok(_) => Err(StoreError::Serialization {
				message: "filing record did not serialize to an object".into(),
			}),
			Err(e) => Err(StoreError::Serialization {
				message: format!("Failed to serialize filing record: {e}"),
			}),
		}
	}
}

/// Filing payload accepted from callers before validation.
///
/// Every field is optional at parse time so that missing identifiers surface as
/// [`Error::InvalidRequest`] rather than as a JSON syntax error.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingSubmission {
	/// Requested filing identifier.
	#[serde(default)]
	pub filing_id: Option<String>,
	/// Source URL to download from.
	#[serde(default)]
	pub filing_url: Option<String>,
	/// Ticker symbol of the filer.
	#[serde(default)]
	pub ticker: Option<String>,
	/// Filer's company name.
	#[serde(default)]
	pub company_name: Option<String>,
	/// Accession number.
	#[serde(default)]
	pub accession_no: Option<String>,
	/// Form type.
	#[serde(default)]
	pub form_type: Option<String>,
	/// Instant the filing was filed.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub filed_at: Option<OffsetDateTime>,
}
impl FilingSubmission {
	/// Validates the payload and converts it into a fresh [`FilingRecord`].
	pub fn into_record(self) -> Result<FilingRecord> {
		let filing_id = self.filing_id.filter(|value| !value.is_empty());
		let filing_url = self.filing_url.filter(|value| !value.trim().is_empty());
		let (Some(filing_id), Some(filing_url)) = (filing_id, filing_url) else {
			return Err(Error::invalid_request("Missing filingId or filingUrl parameter"));
		};
		let mut record = FilingRecord::new(FilingId::new(filing_id)?, filing_url);

		record.ticker = self.ticker.unwrap_or_default();
		record.company_name = self.company_name.unwrap_or_default();
		record.accession_no = self.accession_no.unwrap_or_default();
		record.form_type = self.form_type.unwrap_or_default();
		record.filed_at = self.filed_at;

		Ok(record)
	}
}
