//! Ordered fallback reads over multiple children, with unconditional
//! fan-out writes.

use crate::{Handle, Storage, null_handle};
use tilestore_core::{Blob, TileProtocol};

/// Tries each child's `get`/`get_meta` in order, returning the first hit.
/// `put_meta` and `expire` fan out to every child unconditionally — no
/// short-circuiting on the first success or failure, so a union backend
/// never leaves a subset of its children stale relative to the others.
pub struct UnionStorage {
	children: Vec<Box<dyn Storage>>,
}

impl UnionStorage {
	#[must_use]
	pub fn new(children: Vec<Box<dyn Storage>>) -> UnionStorage {
		UnionStorage { children }
	}
}

impl Storage for UnionStorage {
	fn get(&self, tile: &TileProtocol) -> Box<dyn Handle> {
		for child in &self.children {
			let handle = child.get(tile);
			if handle.exists() {
				return handle;
			}
		}
		null_handle()
	}

	fn get_meta(&self, tile: &TileProtocol) -> Option<Blob> {
		self.children.iter().find_map(|child| child.get_meta(tile))
	}

	fn put_meta(&self, tile: &TileProtocol, bytes: &Blob) -> bool {
		// `fold` rather than `all`/`any` so every child is visited regardless
		// of earlier results.
		self.children.iter().fold(true, |ok, child| child.put_meta(tile, bytes) && ok)
	}

	fn expire(&self, tile: &TileProtocol) -> bool {
		self.children.iter().fold(true, |ok, child| child.expire(tile) && ok)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::NullStorage;
	use std::sync::Mutex;
	use tilestore_core::{Command, TileFormat};

	struct RecordingStorage {
		data: Option<Blob>,
		puts: Mutex<u32>,
		expires: Mutex<u32>,
		fail_writes: bool,
	}

	impl Storage for RecordingStorage {
		fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
			null_handle()
		}

		fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
			self.data.clone()
		}

		fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
			*self.puts.lock().unwrap() += 1;
			!self.fail_writes
		}

		fn expire(&self, _tile: &TileProtocol) -> bool {
			*self.expires.lock().unwrap() += 1;
			!self.fail_writes
		}
	}

	fn tile() -> TileProtocol {
		TileProtocol::new(Command::Render, 0, 0, 0, "osm", TileFormat::Png.into())
	}

	#[test]
	fn get_meta_falls_back_in_order() {
		let miss = Box::new(RecordingStorage { data: None, puts: Mutex::new(0), expires: Mutex::new(0), fail_writes: false });
		let hit = Box::new(RecordingStorage {
			data: Some(Blob::from(&b"found"[..])),
			puts: Mutex::new(0),
			expires: Mutex::new(0),
			fail_writes: false,
		});
		let union = UnionStorage::new(vec![miss, hit]);
		assert_eq!(union.get_meta(&tile()).unwrap().as_slice(), b"found");
	}

	#[test]
	fn writes_fan_out_to_every_child_even_after_a_failure() {
		let counter_a: &'static Mutex<u32> = Box::leak(Box::new(Mutex::new(0u32)));
		let counter_b: &'static Mutex<u32> = Box::leak(Box::new(Mutex::new(0u32)));
		struct Counting<'a>(&'a Mutex<u32>, bool);
		impl Storage for Counting<'_> {
			fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
				null_handle()
			}
			fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
				None
			}
			fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
				*self.0.lock().unwrap() += 1;
				self.1
			}
			fn expire(&self, _tile: &TileProtocol) -> bool {
				*self.0.lock().unwrap() += 1;
				self.1
			}
		}
		let union = UnionStorage::new(vec![Box::new(Counting(counter_a, false)), Box::new(Counting(counter_b, true))]);
		let ok = union.put_meta(&tile(), &Blob::new_empty());
		assert!(!ok);
		assert_eq!(*counter_a.lock().unwrap(), 1);
		assert_eq!(*counter_b.lock().unwrap(), 1);
	}

	#[test]
	fn get_prefers_the_first_existing_child_over_a_later_one() {
		use crate::handle::OwnedHandle;

		struct FixedChild(&'static str);
		impl Storage for FixedChild {
			fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
				Box::new(OwnedHandle::new(Blob::from(self.0.as_bytes()), 1, false))
			}
			fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
				None
			}
			fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
				true
			}
			fn expire(&self, _tile: &TileProtocol) -> bool {
				true
			}
		}
		let union = UnionStorage::new(vec![Box::new(FixedChild("from-a")), Box::new(FixedChild("from-b"))]);
		let handle = union.get(&tile());
		assert_eq!(handle.data(), Some(&b"from-a"[..]));
	}

	#[test]
	fn all_misses_yields_null() {
		let union = UnionStorage::new(vec![Box::new(NullStorage), Box::new(NullStorage)]);
		assert!(!union.get(&tile()).exists());
		assert!(union.get_meta(&tile()).is_none());
	}
}
