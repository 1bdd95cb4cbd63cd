//! The null backend: a test double and fail-safe leaf. Every write
//! succeeds vacuously; every read misses.

use crate::{Handle, Storage, null_handle};
use tilestore_core::{Blob, TileProtocol};

#[derive(Debug, Default)]
pub struct NullStorage;

impl Storage for NullStorage {
	fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
		null_handle()
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
