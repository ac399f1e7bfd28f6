//! Object-store contracts for cached filing blobs.
//!
//! Objects live under deterministic keys derived from the filing id and are always written with
//! full-overwrite semantics, so uploading the same filing twice is harmless. Every backend
//! exposes the same public URL shape: `https://<host>/<bucket>/<key>`.

pub mod fs;
pub mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

// self
use crate::{_prelude::*, error::ConfigError, model::FilingId};

/// Boxed future returned by [`ObjectStore`] operations.
pub type ObjectFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ObjectError>> + 'a + Send>>;

/// Blob storage contract used by the filing cache.
pub trait ObjectStore
where
	Self: Send + Sync,
{
	/// Returns `true` if an object is stored under `key`.
	fn exists<'a>(&'a self, key: &'a ObjectKey) -> ObjectFuture<'a, bool>;

	/// Writes (or fully replaces) the object under `key` and returns its public URL.
	fn put<'a>(&'a self, key: &'a ObjectKey, data: Vec<u8>) -> ObjectFuture<'a, Url>;

	/// Public URL of `key`, whether or not the object exists.
	fn public_url(&self, key: &ObjectKey) -> Url;
}

/// Relative, slash-separated object key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);
impl ObjectKey {
	/// Folder holding every cached filing.
	pub const FILING_PREFIX: &'static str = "filings";

	/// Validates a raw key: non-empty relative segments, no `.`/`..`, no backslashes.
	pub fn new(raw: impl Into<String>) -> Result<Self, ObjectError> {
		let raw = raw.into();
		let valid = !raw.is_empty()
			&& !raw.contains('\\')
			&& !raw.chars().any(char::is_control)
			&& raw.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..");

		if valid { Ok(Self(raw)) } else { Err(ObjectError::InvalidKey { key: raw }) }
	}

	/// Deterministic key of a filing's PDF: `filings/<filing_id>.pdf`.
	pub fn for_filing(filing_id: &FilingId) -> Self {
		Self(format!("{}/{filing_id}.pdf", Self::FILING_PREFIX))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Iterates over the key's path segments.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split('/')
	}
}
impl Display for ObjectKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl From<ObjectKey> for String {
	fn from(value: ObjectKey) -> Self {
		value.0
	}
}
impl TryFrom<String> for ObjectKey {
	type Error = ObjectError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

/// `https://<host>/<bucket>` base used to build public object URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicUrlBase(Url);
impl PublicUrlBase {
	/// Builds the base for `host` (optionally with a port) and `bucket`.
	pub fn new(host: &str, bucket: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(&format!("https://{host}/{bucket}"))
			.map_err(|source| ConfigError::InvalidPublicBase { bucket: bucket.into(), source })?;

		if url.cannot_be_a_base() || bucket.is_empty() || bucket.contains('/') {
			return Err(ConfigError::InvalidPublicBase {
				bucket: bucket.into(),
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			});
		}

		Ok(Self(url))
	}

	/// Appends the key's segments, percent-encoding each one.
	pub fn locate(&self, key: &ObjectKey) -> Url {
		let mut url = self.0.clone();

		if let Ok(mut segments) = url.path_segments_mut() {
			segments.pop_if_empty().extend(key.segments());
		}

		url
	}

	/// Returns the base URL.
	pub fn as_url(&self) -> &Url {
		&self.0
	}
}

/// Error type produced by [`ObjectStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ObjectError {
	/// The key is not a valid relative object path.
	#[error("Object key `{key}` is invalid.")]
	InvalidKey {
		/// Offending key.
		key: String,
	},
	/// Backend-level failure for the object store.
	#[error("Object store failure for `{key}`: {message}.")]
	Backend {
		/// Key being accessed.
		key: String,
		/// Human-readable error payload.
		message: String,
	},
}
