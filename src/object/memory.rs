//! In-process [`ObjectStore`] for tests and demos.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	object::{ObjectFuture, ObjectKey, ObjectStore, PublicUrlBase},
};

/// Keeps objects in a shared map and counts writes.
#[derive(Clone, Debug)]
pub struct MemoryObjectStore {
	base: PublicUrlBase,
	objects: Arc<RwLock<HashMap<ObjectKey, Vec<u8>>>>,
	writes: Arc<AtomicU64>,
}
impl MemoryObjectStore {
	/// Creates an empty store publishing URLs under `base`.
	pub fn new(base: PublicUrlBase) -> Self {
		Self { base, objects: Default::default(), writes: Default::default() }
	}

	/// Returns a copy of the stored bytes, if any.
	pub fn get(&self, key: &ObjectKey) -> Option<Vec<u8>> {
		self.objects.read().get(key).cloned()
	}

	/// Drops the object under `key`, returning whether it existed.
	pub fn remove(&self, key: &ObjectKey) -> bool {
		self.objects.write().remove(key).is_some()
	}

	/// Total number of successful writes since creation.
	pub fn writes(&self) -> u64 {
		self.writes.load(Ordering::Relaxed)
	}
}
impl ObjectStore for MemoryObjectStore {
	fn exists<'a>(&'a self, key: &'a ObjectKey) -> ObjectFuture<'a, bool> {
		let objects = self.objects.clone();

		Box::pin(async move { Ok(objects.read().contains_key(key)) })
	}

	fn put<'a>(&'a self, key: &'a ObjectKey, data: Vec<u8>) -> ObjectFuture<'a, Url> {
		Box::pin(async move {
			self.objects.write().insert(key.clone(), data);
			self.writes.fetch_add(1, Ordering::Relaxed);

			Ok(self.public_url(key))
		})
	}

	fn public_url(&self, key: &ObjectKey) -> Url {
		self.base.locate(key)
	}
}
