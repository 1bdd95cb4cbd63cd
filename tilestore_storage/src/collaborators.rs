//! External collaborators the algebra is specified against but does not
//! itself implement: the image codec used for pixel compositing, and the
//! remote expiry service an [`crate::backends::ExpiryOverlay`] defers to.
//! Each trait here is the full interface the algebra requires; this module
//! also ships one small concrete implementation of each so the crate's own
//! tests (and the `tilestore` CLI) have something real to run against.

use anyhow::{Result, ensure};
use std::collections::HashSet;
use std::sync::Mutex;
use tilestore_core::{Blob, TileProtocol};

/// A decoded raster image: one `(gray, alpha)` byte pair per pixel,
/// row-major. Real backends would decode to/from PNG/JPEG/GIF; this is
/// deliberately the simplest format that still has a meaningful alpha
/// composite to test against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
	pub width: u32,
	pub height: u32,
	pixels: Vec<(u8, u8)>,
}

impl DecodedImage {
	#[must_use]
	pub fn new(width: u32, height: u32, pixels: Vec<(u8, u8)>) -> DecodedImage {
		DecodedImage { width, height, pixels }
	}

	#[must_use]
	pub fn pixel(&self, x: u32, y: u32) -> (u8, u8) {
		self.pixels[(y * self.width + x) as usize]
	}
}

/// `decode`, `merge`, `encode` — the three operations the compositing
/// backend calls out to (§4.6 step 5–7).
pub trait ImageCodec: Send + Sync {
	fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;
	/// Alpha-composites `over` onto `under`, mutating `under` in place. Must
	/// not read from `under` after starting to write it in a way that would
	/// alias `over` (§9: "must not alias the over-image").
	fn merge(&self, under: &mut DecodedImage, over: &DecodedImage) -> Result<()>;
	fn encode(&self, image: &DecodedImage) -> Result<Blob>;
}

/// A codec for the two-bytes-per-pixel `(gray, alpha)` format used by this
/// crate's own tests and CLI demos.
#[derive(Debug, Default)]
pub struct GrayscaleAlphaCodec;

impl ImageCodec for GrayscaleAlphaCodec {
	fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
		ensure!(bytes.len() >= 8, "image header truncated");
		let width = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
		let height = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
		let expected = width as usize * height as usize * 2;
		ensure!(bytes.len() - 8 == expected, "pixel data length {} does not match {width}x{height}", bytes.len() - 8);
		let pixels = bytes[8..].chunks_exact(2).map(|p| (p[0], p[1])).collect();
		Ok(DecodedImage { width, height, pixels })
	}

	fn merge(&self, under: &mut DecodedImage, over: &DecodedImage) -> Result<()> {
		ensure!(
			under.width == over.width && under.height == over.height,
			"dimension mismatch: under is {}x{}, over is {}x{}",
			under.width,
			under.height,
			over.width,
			over.height
		);
		for (under_pixel, &(over_gray, over_alpha)) in under.pixels.iter_mut().zip(over.pixels.iter()) {
			if over_alpha == 0 {
				continue;
			}
			let a = f32::from(over_alpha) / 255.0;
			under_pixel.0 = (f32::from(under_pixel.0) * (1.0 - a) + f32::from(over_gray) * a).round() as u8;
			under_pixel.1 = under_pixel.1.max(over_alpha);
		}
		Ok(())
	}

	fn encode(&self, image: &DecodedImage) -> Result<Blob> {
		let mut out = Vec::with_capacity(8 + image.pixels.len() * 2);
		out.extend_from_slice(&image.width.to_le_bytes());
		out.extend_from_slice(&image.height.to_le_bytes());
		for &(gray, alpha) in &image.pixels {
			out.push(gray);
			out.push(alpha);
		}
		Ok(Blob::from(out))
	}
}

/// `is_expired`, `set_expired` — the authority an [`crate::backends::ExpiryOverlay`]
/// defers to instead of consulting a child's own expiry bits.
pub trait ExpiryService: Send + Sync {
	fn is_expired(&self, tile: &TileProtocol) -> bool;
	fn set_expired(&self, tile: &TileProtocol, expired: bool) -> bool;
}

/// An in-process expiry service keyed by metatile origin, for tests and for
/// the CLI when no remote service is configured.
#[derive(Debug, Default)]
pub struct InMemoryExpiryService {
	expired: Mutex<HashSet<(String, u32, u32, u8)>>,
}

impl InMemoryExpiryService {
	#[must_use]
	pub fn new() -> InMemoryExpiryService {
		InMemoryExpiryService::default()
	}

	fn key(tile: &TileProtocol) -> (String, u32, u32, u8) {
		let (x, y) = tile.metatile_origin();
		(tile.style.clone(), x, y, tile.z)
	}
}

impl ExpiryService for InMemoryExpiryService {
	fn is_expired(&self, tile: &TileProtocol) -> bool {
		self.expired.lock().unwrap().contains(&Self::key(tile))
	}

	fn set_expired(&self, tile: &TileProtocol, expired: bool) -> bool {
		let mut guard = self.expired.lock().unwrap();
		if expired {
			guard.insert(Self::key(tile));
		} else {
			guard.remove(&Self::key(tile));
		}
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilestore_core::{Command, TileFormat};

	fn tile(style: &str) -> TileProtocol {
		TileProtocol::new(Command::Render, 1024, 1024, 12, style, TileFormat::Png.into())
	}

	#[test]
	fn codec_round_trip() {
		let codec = GrayscaleAlphaCodec;
		let image = DecodedImage::new(2, 1, vec![(10, 255), (20, 128)]);
		let bytes = codec.encode(&image).unwrap();
		let decoded = codec.decode(bytes.as_slice()).unwrap();
		assert_eq!(decoded, image);
	}

	#[test]
	fn merge_blends_by_alpha_and_ignores_transparent_over_pixels() {
		let codec = GrayscaleAlphaCodec;
		let mut under = DecodedImage::new(2, 1, vec![(100, 255), (100, 255)]);
		let over = DecodedImage::new(2, 1, vec![(200, 255), (50, 0)]);
		codec.merge(&mut under, &over).unwrap();
		assert_eq!(under.pixel(0, 0), (200, 255));
		assert_eq!(under.pixel(1, 0), (100, 255));
	}

	#[test]
	fn merge_rejects_dimension_mismatch() {
		let codec = GrayscaleAlphaCodec;
		let mut under = DecodedImage::new(2, 1, vec![(0, 0), (0, 0)]);
		let over = DecodedImage::new(1, 1, vec![(0, 0)]);
		assert!(codec.merge(&mut under, &over).is_err());
	}

	#[test]
	fn expiry_service_tracks_per_metatile() {
		let service = InMemoryExpiryService::new();
		let a = tile("osm");
		assert!(!service.is_expired(&a));
		service.set_expired(&a, true);
		assert!(service.is_expired(&a));
		service.set_expired(&a, false);
		assert!(!service.is_expired(&a));
	}
}
