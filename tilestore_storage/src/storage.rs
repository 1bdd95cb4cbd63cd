//! The four-operation storage contract every backend implements.

use crate::Handle;
use tilestore_core::{Blob, TileProtocol};

/// A backend — leaf or composite — honoring the four-operation contract.
/// `get_meta`'s "bool plus out-param" shape from the source material becomes
/// `Option<Blob>` here: bytes are returned only on success, matching §4.1's
/// "`bytes` is overwritten only on success" without an out-parameter.
///
/// No operation is `async`: §5 mandates a synchronous, blocking contract
/// with no suspension points, so these are plain blocking methods rather
/// than `async_trait` methods.
pub trait Storage: Send + Sync {
	/// Returns a handle describing the single tile inside its metatile.
	/// Never fails outright — a miss or I/O error yields [`crate::null_handle`].
	fn get(&self, tile: &TileProtocol) -> Box<dyn Handle>;

	/// Reads the entire metatile container covering `tile`. `None` if no
	/// metatile is present or I/O failed.
	fn get_meta(&self, tile: &TileProtocol) -> Option<Blob>;

	/// Writes an entire metatile container. The caller is responsible for
	/// metatile alignment (`tile.is_metatile_aligned()`); backends may
	/// refuse otherwise.
	fn put_meta(&self, tile: &TileProtocol, bytes: &Blob) -> bool;

	/// Marks the covering metatile dirty.
	fn expire(&self, tile: &TileProtocol) -> bool;
}
