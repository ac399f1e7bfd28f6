//! Simple file-backed [`DocumentStore`] for single-node deployments.

// std
use std::{
	collections::BTreeMap,
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use futures_util::stream;
// self
use crate::{
	_prelude::*,
	store::{
		CompareAndSwapOutcome, Document, DocumentCursor, DocumentStore, FieldFilter, Fields,
		StoreError, StoreFuture, UpdateOutcome, memory::Collections,
	},
};

/// Persists every collection to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Collections>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { Collections::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the snapshot path backing this store.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Collections, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Collections::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Collections) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl DocumentStore for FileStore {
	fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>> {
		Box::pin(async move {
			Ok(self
				.inner
				.read()
				.get(collection)
				.and_then(|docs| docs.get(id))
				.map(|fields| Document::new(id, fields.clone())))
		})
	}

	fn set<'a>(&'a self, collection: &'a str, document: Document) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.entry(collection.to_owned()).or_default().insert(document.id, document.fields);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		fields: Fields,
	) -> StoreFuture<'a, UpdateOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			match guard.get_mut(collection).and_then(|docs| docs.get_mut(id)) {
				Some(existing) => existing.extend(fields),
				None => return Ok(UpdateOutcome::Missing),
			}

			self.persist_locked(&guard)?;

			Ok(UpdateOutcome::Updated)
		})
	}

	fn compare_and_update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		expected: &'a FieldFilter,
		fields: Fields,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let outcome = match guard.get_mut(collection).and_then(|docs| docs.get_mut(id)) {
				Some(existing) if expected.matches(existing) => {
					existing.extend(fields);

					CompareAndSwapOutcome::Updated
				},
				Some(_) => CompareAndSwapOutcome::Mismatch,
				None => CompareAndSwapOutcome::Missing,
			};

			if matches!(outcome, CompareAndSwapOutcome::Updated) {
				self.persist_locked(&guard)?;
			}

			Ok(outcome)
		})
	}

	fn query<'a>(
		&'a self,
		collection: &'a str,
		filter: &'a FieldFilter,
		limit: Option<usize>,
	) -> StoreFuture<'a, DocumentCursor<'a>> {
		Box::pin(async move {
			let documents: Vec<Document> = self
				.inner
				.read()
				.get(collection)
				.map(|docs: &BTreeMap<String, Fields>| {
					docs.iter()
						.filter(|(_, fields)| filter.matches(fields))
						.take(limit.unwrap_or(usize::MAX))
						.map(|(id, fields)| Document::new(id.as_str(), fields.clone()))
						.collect()
				})
				.unwrap_or_default();
			let cursor: DocumentCursor<'a> = Box::pin(stream::iter(documents.into_iter().map(Ok)));

			Ok(cursor)
		})
	}
}
