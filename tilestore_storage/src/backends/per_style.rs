//! Routes a request to the child registered for the tile's style, falling
//! back to a default child when no exact match is registered.

use crate::{Handle, Storage, null_handle};
use std::collections::HashMap;
use tilestore_core::{Blob, TileProtocol};

/// Exact-match-or-default dispatch: unlike [`crate::backends::UnionStorage`],
/// only ever one child is consulted per operation.
pub struct PerStyleStorage {
	routes: HashMap<String, Box<dyn Storage>>,
	default: Option<Box<dyn Storage>>,
}

impl PerStyleStorage {
	#[must_use]
	pub fn new(routes: HashMap<String, Box<dyn Storage>>, default: Option<Box<dyn Storage>>) -> PerStyleStorage {
		PerStyleStorage { routes, default }
	}

	fn route(&self, style: &str) -> Option<&dyn Storage> {
		self.routes.get(style).map(AsRef::as_ref).or_else(|| self.default.as_deref())
	}
}

impl Storage for PerStyleStorage {
	fn get(&self, tile: &TileProtocol) -> Box<dyn Handle> {
		match self.route(&tile.style) {
			Some(child) => child.get(tile),
			None => null_handle(),
		}
	}

	fn get_meta(&self, tile: &TileProtocol) -> Option<Blob> {
		self.route(&tile.style)?.get_meta(tile)
	}

	fn put_meta(&self, tile: &TileProtocol, bytes: &Blob) -> bool {
		self.route(&tile.style).is_some_and(|child| child.put_meta(tile, bytes))
	}

	fn expire(&self, tile: &TileProtocol) -> bool {
		self.route(&tile.style).is_some_and(|child| child.expire(tile))
	}
}
