//! Directory-backed [`ObjectStore`] that mirrors object keys as relative paths.

// std
use std::{
	fs,
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use tempfile::NamedTempFile;
// self
use crate::{
	_prelude::*,
	object::{ObjectError, ObjectFuture, ObjectKey, ObjectStore, PublicUrlBase},
};

/// Stores each object as a file below `root`; each write is staged in its own temp file and renamed into place.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
	root: PathBuf,
	base: PublicUrlBase,
}
impl FsObjectStore {
	/// Opens (or creates) the object directory.
	pub fn open(root: impl Into<PathBuf>, base: PublicUrlBase) -> Result<Self, ObjectError> {
		let root = root.into();

		fs::create_dir_all(&root).map_err(|e| ObjectError::Backend {
			key: String::new(),
			message: format!("Failed to create object root {}: {e}", root.display()),
		})?;

		Ok(Self { root, base })
	}

	/// Returns the directory holding the objects.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Filesystem path an object key maps to.
	pub fn path_for(&self, key: &ObjectKey) -> PathBuf {
		key.segments().fold(self.root.clone(), |path, segment| path.join(segment))
	}

	fn backend(key: &ObjectKey, message: String) -> ObjectError {
		ObjectError::Backend { key: key.to_string(), message }
	}

	fn write_now(&self, key: &ObjectKey, data: &[u8]) -> Result<(), ObjectError> {
		let path = self.path_for(key);

		let parent = path.parent().unwrap_or(&self.root);

		fs::create_dir_all(parent).map_err(|e| {
			Self::backend(key, format!("Failed to create {}: {e}", parent.display()))
		})?;

		let mut staged = NamedTempFile::new_in(parent).map_err(|e| {
			Self::backend(key, format!("Failed to stage a write in {}: {e}", parent.display()))
		})?;

		staged
			.write_all(data)
			.and_then(|()| staged.as_file().sync_all())
			.map_err(|e| {
				Self::backend(key, format!("Failed to write {}: {e}", staged.path().display()))
			})?;
		staged.persist(&path).map_err(|e| {
			Self::backend(key, format!("Failed to replace {}: {}", path.display(), e.error))
		})?;

		Ok(())
	}
}
impl ObjectStore for FsObjectStore {
	fn exists<'a>(&'a self, key: &'a ObjectKey) -> ObjectFuture<'a, bool> {
		Box::pin(async move {
			let path = self.path_for(key);

			path.try_exists()
				.map(|found| found && path.is_file())
				.map_err(|e| Self::backend(key, format!("Failed to inspect {}: {e}", path.display())))
		})
	}

	fn put<'a>(&'a self, key: &'a ObjectKey, data: Vec<u8>) -> ObjectFuture<'a, Url> {
		Box::pin(async move {
			self.write_now(key, &data)?;

			Ok(self.public_url(key))
		})
	}

	fn public_url(&self, key: &ObjectKey) -> Url {
		self.base.locate(key)
	}
}
