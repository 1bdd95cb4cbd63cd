//! Synthesizes a tile by alpha-compositing an "over" image onto an "under"
//! image, each fetched from its own child storage.

use crate::{Handle, ImageCodec, Storage, collaborators::DecodedImage, handle::OwnedHandle, null_handle};
use anyhow::{Result, bail};
use std::sync::Arc;
use tilestore_core::{Blob, ProtoFmt, TileFormat, TileProtocol};

/// One overlay definition: which children and formats feed `under`/`over`,
/// which formats this node can produce, and which legs participate in
/// `expire`.
pub struct CompositingConfig {
	pub under_format: TileFormat,
	pub over_format: TileFormat,
	pub under_style: Option<String>,
	pub over_style: Option<String>,
	pub producible: ProtoFmt,
	pub expire_under: bool,
	pub expire_over: bool,
}

/// Never answers `get_meta`/`put_meta` (composited metatiles are not
/// storable), only synthesizes single-tile reads.
pub struct CompositingStorage {
	under: Box<dyn Storage>,
	over: Box<dyn Storage>,
	codec: Arc<dyn ImageCodec>,
	config: CompositingConfig,
}

impl CompositingStorage {
	pub fn new(under: Box<dyn Storage>, over: Box<dyn Storage>, codec: Arc<dyn ImageCodec>, config: CompositingConfig) -> Result<CompositingStorage> {
		if config.producible.is_empty() {
			bail!("compositing backend configured with an empty producible format mask");
		}
		Ok(CompositingStorage { under, over, codec, config })
	}

	fn child_tile(&self, tile: &TileProtocol, format: TileFormat, style: Option<&str>) -> TileProtocol {
		tile.with_format_and_style(format.into(), style)
	}

	fn synthesize(&self, tile: &TileProtocol) -> Result<SynthesizeOutcome> {
		let under_tile = self.child_tile(tile, self.config.under_format, self.config.under_style.as_deref());
		let over_tile = self.child_tile(tile, self.config.over_format, self.config.over_style.as_deref());

		let under_handle = self.under.get(&under_tile);
		if !under_handle.exists() {
			// Return the child's own handle verbatim rather than collapsing
			// it to a generic miss, so its timestamp/expiry survive.
			return Ok(SynthesizeOutcome::Miss(under_handle));
		}
		let over_handle = self.over.get(&over_tile);
		if !over_handle.exists() {
			return Ok(SynthesizeOutcome::Miss(over_handle));
		}

		let under_bytes = under_handle.data().unwrap_or(&[]);
		let over_bytes = over_handle.data().unwrap_or(&[]);
		let mut under_image: DecodedImage = self.codec.decode(under_bytes)?;
		let over_image = self.codec.decode(over_bytes)?;
		if under_image.width != over_image.width || under_image.height != over_image.height {
			bail!(
				"compositing dimension mismatch: under is {}x{}, over is {}x{}",
				under_image.width,
				under_image.height,
				over_image.width,
				over_image.height
			);
		}
		self.codec.merge(&mut under_image, &over_image)?;
		let encoded = self.codec.encode(&under_image)?;

		let last_modified = under_handle.last_modified().max(over_handle.last_modified());
		let expired = under_handle.expired() || over_handle.expired();
		Ok(SynthesizeOutcome::Hit(Box::new(OwnedHandle::new(encoded, last_modified, expired))))
	}
}

/// The result of attempting to synthesize a tile: either the composited
/// image, or the real handle of whichever child leg missed, returned
/// verbatim instead of a generic "not found".
enum SynthesizeOutcome {
	Hit(Box<dyn Handle>),
	Miss(Box<dyn Handle>),
}

impl Storage for CompositingStorage {
	fn get(&self, tile: &TileProtocol) -> Box<dyn Handle> {
		if !tile.format.is_subset_of(self.config.producible) {
			return null_handle();
		}
		match self.synthesize(tile) {
			Ok(SynthesizeOutcome::Hit(handle)) => handle,
			Ok(SynthesizeOutcome::Miss(handle)) => handle,
			Err(error) => {
				log::error!("tilestore: compositing failed for ({}, {}, z{}): {error}", tile.x, tile.y, tile.z);
				null_handle()
			}
		}
	}

	fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
		None
	}

	fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
		false
	}

	fn expire(&self, tile: &TileProtocol) -> bool {
		let under_tile = self.child_tile(tile, self.config.under_format, self.config.under_style.as_deref());
		let over_tile = self.child_tile(tile, self.config.over_format, self.config.over_style.as_deref());

		// The second call is guarded on the first leg's success: a failed
		// under-expire must not be masked by an over-expire that happens to
		// succeed, and an un-attempted leg defaults to "ok" so it never drags
		// down a result the first leg already determined.
		let under_ok = if self.config.expire_under { self.under.expire(&under_tile) } else { true };
		let over_ok = if under_ok && self.config.expire_over { self.over.expire(&over_tile) } else { true };
		under_ok && over_ok
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::NullStorage;
	use crate::collaborators::GrayscaleAlphaCodec;
	use std::sync::Mutex;
	use tilestore_core::Command;

	struct FixedImage {
		bytes: Blob,
		last_modified: i64,
		expired: bool,
	}

	impl Storage for FixedImage {
		fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
			Box::new(OwnedHandle::new(self.bytes.clone(), self.last_modified, self.expired))
		}
		fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
			None
		}
		fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
			false
		}
		fn expire(&self, _tile: &TileProtocol) -> bool {
			true
		}
	}

	fn image_bytes(codec: &GrayscaleAlphaCodec, image: &DecodedImage) -> Blob {
		codec.encode(image).unwrap()
	}

	fn tile() -> TileProtocol {
		TileProtocol::new(Command::Render, 1024, 1024, 12, "hillshade", TileFormat::Png.into())
	}

	fn config() -> CompositingConfig {
		CompositingConfig {
			under_format: TileFormat::Png,
			over_format: TileFormat::Png,
			under_style: Some("base".into()),
			over_style: Some("shade".into()),
			producible: ProtoFmt::single(TileFormat::Png),
			expire_under: true,
			expire_over: true,
		}
	}

	#[test]
	fn last_modified_is_max_and_expiry_is_disjunction() {
		let codec = GrayscaleAlphaCodec;
		let under = FixedImage {
			bytes: image_bytes(&codec, &DecodedImage::new(2, 1, vec![(100, 255), (100, 255)])),
			last_modified: 10,
			expired: false,
		};
		let over = FixedImage {
			bytes: image_bytes(&codec, &DecodedImage::new(2, 1, vec![(200, 255), (0, 0)])),
			last_modified: 20,
			expired: true,
		};
		let composite = CompositingStorage::new(Box::new(under), Box::new(over), Arc::new(codec), config()).unwrap();
		let handle = composite.get(&tile());
		assert!(handle.exists());
		assert_eq!(handle.last_modified(), 20);
		assert!(handle.expired());
	}

	#[test]
	fn dimension_mismatch_yields_null() {
		let codec = GrayscaleAlphaCodec;
		let under = FixedImage { bytes: image_bytes(&codec, &DecodedImage::new(2, 1, vec![(0, 0), (0, 0)])), last_modified: 1, expired: false };
		let over = FixedImage { bytes: image_bytes(&codec, &DecodedImage::new(1, 1, vec![(0, 0)])), last_modified: 1, expired: false };
		let composite = CompositingStorage::new(Box::new(under), Box::new(over), Arc::new(codec), config()).unwrap();
		assert!(!composite.get(&tile()).exists());
	}

	#[test]
	fn missing_under_short_circuits_before_fetching_over() {
		let codec = GrayscaleAlphaCodec;
		let composite = CompositingStorage::new(Box::new(NullStorage), Box::new(NullStorage), Arc::new(codec), config()).unwrap();
		assert!(!composite.get(&tile()).exists());
	}

	#[test]
	fn missing_under_returns_that_childs_handle_verbatim() {
		struct MissWithExpiry;
		impl Storage for MissWithExpiry {
			fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
				Box::new(OwnedHandleMiss { last_modified: 99, expired: true })
			}
			fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
				None
			}
			fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
				false
			}
			fn expire(&self, _tile: &TileProtocol) -> bool {
				true
			}
		}
		struct OwnedHandleMiss {
			last_modified: i64,
			expired: bool,
		}
		impl Handle for OwnedHandleMiss {
			fn exists(&self) -> bool {
				false
			}
			fn last_modified(&self) -> i64 {
				self.last_modified
			}
			fn data(&self) -> Option<&[u8]> {
				None
			}
			fn expired(&self) -> bool {
				self.expired
			}
		}

		let codec = GrayscaleAlphaCodec;
		let composite = CompositingStorage::new(Box::new(MissWithExpiry), Box::new(NullStorage), Arc::new(codec), config()).unwrap();
		let handle = composite.get(&tile());
		assert!(!handle.exists());
		assert_eq!(handle.last_modified(), 99);
		assert!(handle.expired());
	}

	#[test]
	fn get_meta_and_put_meta_always_refuse() {
		let codec = GrayscaleAlphaCodec;
		let composite = CompositingStorage::new(Box::new(NullStorage), Box::new(NullStorage), Arc::new(codec), config()).unwrap();
		assert!(composite.get_meta(&tile()).is_none());
		assert!(!composite.put_meta(&tile(), &Blob::new_empty()));
	}

	#[test]
	fn expire_skips_over_when_under_fails() {
		struct FailingExpire(Mutex<bool>);
		impl Storage for FailingExpire {
			fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
				null_handle()
			}
			fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
				None
			}
			fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
				false
			}
			fn expire(&self, _tile: &TileProtocol) -> bool {
				*self.0.lock().unwrap() = true;
				false
			}
		}
		struct TrackingExpire(Mutex<bool>);
		impl Storage for TrackingExpire {
			fn get(&self, _tile: &TileProtocol) -> Box<dyn Handle> {
				null_handle()
			}
			fn get_meta(&self, _tile: &TileProtocol) -> Option<Blob> {
				None
			}
			fn put_meta(&self, _tile: &TileProtocol, _bytes: &Blob) -> bool {
				false
			}
			fn expire(&self, _tile: &TileProtocol) -> bool {
				*self.0.lock().unwrap() = true;
				true
			}
		}
		let over_called = Mutex::new(false);
		let composite = CompositingStorage::new(
			Box::new(FailingExpire(Mutex::new(false))),
			Box::new(TrackingExpire(over_called)),
			Arc::new(GrayscaleAlphaCodec),
			config(),
		)
		.unwrap();
		assert!(!composite.expire(&tile()));
	}
}
