//! Delegates tile data to a child storage but delegates freshness to an
//! external [`ExpiryService`] — the child's own expiry bits are never
//! consulted once wrapped.

use crate::{ExpiryService, Handle, Storage, handle::OverlayHandle};
use std::sync::Arc;
use tilestore_core::{Blob, TileProtocol};

pub struct ExpiryOverlay {
	child: Box<dyn Storage>,
	expiry: Arc<dyn ExpiryService>,
}

impl ExpiryOverlay {
	#[must_use]
	pub fn new(child: Box<dyn Storage>, expiry: Arc<dyn ExpiryService>) -> ExpiryOverlay {
		ExpiryOverlay { child, expiry }
	}
}

impl Storage for ExpiryOverlay {
	fn get(&self, tile: &TileProtocol) -> Box<dyn Handle> {
		let inner = self.child.get(tile);
		let expired = self.expiry.is_expired(tile);
		Box::new(OverlayHandle::new(inner, expired))
	}

	fn get_meta(&self, tile: &TileProtocol) -> Option<Blob> {
		self.child.get_meta(tile)
	}

	fn put_meta(&self, tile: &TileProtocol, bytes: &Blob) -> bool {
		let ok = self.child.put_meta(tile, bytes);
		if ok {
			self.expiry.set_expired(tile, false);
		}
		ok
	}

	fn expire(&self, tile: &TileProtocol) -> bool {
		self.expiry.set_expired(tile, true)
	}
}
