//! The local-directory backend: one metatile per file under a configured
//! root, hashed into a directory tree so no single directory holds an
//! unreasonable number of entries.

use crate::{Handle, Storage, null_handle};
use anyhow::{Context, Result};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tilestore_core::{Blob, Metatile, TileProtocol};

/// Folds a metatile-aligned `(x, y)` pair into 5 one-byte hashes, mod_tile
/// style: four bits of `x` and four of `y` per byte, least-significant
/// nibbles first. `hash[4]` becomes the outermost directory, `hash[0]` the
/// `.meta` filename — this is the bit-by-bit layout external tools need to
/// reproduce to read/write the same files (§6).
fn hash_path(x: u32, y: u32) -> [u8; 5] {
	let (mut mx, mut my) = (x >> 3, y >> 3);
	let mut hash = [0u8; 5];
	for slot in &mut hash {
		*slot = (((mx & 0x0f) << 4) | (my & 0x0f)) as u8;
		mx >>= 4;
		my >>= 4;
	}
	hash
}

fn metatile_path(root: &Path, style: &str, z: u8, x: u32, y: u32) -> PathBuf {
	let hash = hash_path(x, y);
	root
		.join(style)
		.join(z.to_string())
		.join(format!("{}", hash[4]))
		.join(format!("{}", hash[3]))
		.join(format!("{}", hash[2]))
		.join(format!("{}", hash[1]))
		.join(format!("{}.meta", hash[0]))
}

fn mtime_secs(metadata: &fs::Metadata) -> i64 {
	FileTime::from_last_modification_time(metadata).unix_seconds()
}

/// Releases [`DiskStorage`]'s single outstanding-handle lock when the
/// handle it came with is dropped.
struct OutstandingGuard(Arc<AtomicBool>);

impl Drop for OutstandingGuard {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

struct DiskHandle {
	data: Blob,
	last_modified: i64,
	_guard: OutstandingGuard,
}

impl Handle for DiskHandle {
	fn exists(&self) -> bool {
		true
	}

	fn last_modified(&self) -> i64 {
		self.last_modified
	}

	fn data(&self) -> Option<&[u8]> {
		Some(self.data.as_slice())
	}

	fn expired(&self) -> bool {
		self.last_modified == 0
	}
}

/// Stores one metatile per file under `root/style/z/…`. Allocates a single
/// outstanding-handle slot per instance (§5): a second `get` while an
/// earlier handle is alive panics rather than racing on a shared buffer.
/// Callers needing parallel reads per backend must pool instances.
pub struct DiskStorage {
	root: PathBuf,
	outstanding: Arc<AtomicBool>,
}

impl DiskStorage {
	#[must_use]
	pub fn new(root: impl Into<PathBuf>) -> DiskStorage {
		DiskStorage {
			root: root.into(),
			outstanding: Arc::new(AtomicBool::new(false)),
		}
	}

	fn path_for(&self, tile: &TileProtocol) -> PathBuf {
		let (x, y) = tile.metatile_origin();
		metatile_path(&self.root, &tile.style, tile.z, x, y)
	}
}

impl Storage for DiskStorage {
	fn get(&self, tile: &TileProtocol) -> Box<dyn Handle> {
		if self.outstanding.swap(true, Ordering::SeqCst) {
			panic!("disk backend: a handle from a previous get() is still outstanding for this instance");
		}
		let guard = OutstandingGuard(self.outstanding.clone());

		let path = self.path_for(tile);
		let Ok(metadata) = fs::metadata(&path) else {
			return null_handle();
		};
		let last_modified = mtime_secs(&metadata);

		let Ok(bytes) = fs::read(&path) else {
			log::error!("tilestore: failed to read metatile file {}", path.display());
			return null_handle();
		};
		let Ok(metatile) = Metatile::decode(&bytes) else {
			log::error!("tilestore: corrupt metatile container at {}", path.display());
			return null_handle();
		};
		let Some(format) = tile.format.single_format() else {
			return null_handle();
		};
		let (origin_x, origin_y) = tile.metatile_origin();
		let Some(data) = metatile.tile(format, tile.x - origin_x, tile.y - origin_y) else {
			return null_handle();
		};

		Box::new(DiskHandle {
			data: data.clone(),
			last_modified,
			_guard: guard,
		})
	}

	fn get_meta(&self, tile: &TileProtocol) -> Option<Blob> {
		let path = self.path_for(tile);
		let metadata = fs::metadata(&path).ok()?;
		if !metadata.is_file() {
			return None;
		}
		// An epoch mtime means `expire` fired; `get_meta` reports that as
		// "no metatile available" rather than serving stale bytes (see
		// SPEC_FULL.md §4.3 for why `get` and `get_meta` disagree here).
		if mtime_secs(&metadata) == 0 {
			return None;
		}
		match fs::read(&path) {
			Ok(bytes) => Some(Blob::from(bytes)),
			Err(error) => {
				log::error!("tilestore: failed to read metatile file {}: {error}", path.display());
				None
			}
		}
	}

	fn put_meta(&self, tile: &TileProtocol, bytes: &Blob) -> bool {
		if !tile.is_metatile_aligned() {
			log::debug!("tilestore: refusing put_meta off metatile boundary for ({}, {})", tile.x, tile.y);
			return false;
		}
		let path = self.path_for(tile);
		let write = || -> Result<()> {
			let parent = path.parent().context("metatile path has no parent directory")?;
			fs::create_dir_all(parent)?;
			let tmp = parent.join(format!(".tmp-{}-{}", std::process::id(), fastrand_suffix()));
			fs::write(&tmp, bytes.as_slice())?;
			fs::rename(&tmp, &path)?;
			Ok(())
		};
		match write() {
			Ok(()) => true,
			Err(error) => {
				log::error!("tilestore: failed to write metatile file {}: {error}", path.display());
				false
			}
		}
	}

	fn expire(&self, tile: &TileProtocol) -> bool {
		let path = self.path_for(tile);
		if !path.exists() {
			return false;
		}
		match filetime::set_file_mtime(&path, FileTime::from_unix_time(0, 0)) {
			Ok(()) => true,
			Err(error) => {
				log::error!("tilestore: failed to set expiry mtime on {}: {error}", path.display());
				false
			}
		}
	}
}

/// A short, collision-resistant-enough suffix for temp file names —
/// `put_meta` only needs uniqueness among concurrent writers to the same
/// directory, not cryptographic randomness.
fn fastrand_suffix() -> u64 {
	use std::time::{SystemTime, UNIX_EPOCH};
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos().into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilestore_core::{Command, MetatileSection, TileFormat};

	fn metatile_bytes(format: TileFormat, x: u32, y: u32, z: u8) -> Blob {
		let tiles = (0..8)
			.flat_map(|dy| (0..8).map(move |dx| (dx, dy)))
			.map(|(dx, dy)| Blob::from(format!("{z:03}|{:06}|{:06}", x + dx, y + dy).into_bytes()))
			.collect();
		let section = MetatileSection::new(format, x, y, z, tiles).unwrap();
		Blob::from(Metatile::new(vec![section]).encode().unwrap())
	}

	fn tile(x: u32, y: u32, z: u8, style: &str, format: TileFormat) -> TileProtocol {
		TileProtocol::new(Command::Render, x, y, z, style, format.into())
	}

	#[test]
	fn empty_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let storage = DiskStorage::new(dir.path());
		let t = tile(0, 0, 0, "", TileFormat::Png);
		let bytes = metatile_bytes(TileFormat::Png, 0, 0, 0);
		assert!(storage.put_meta(&t, &bytes));
		assert_eq!(storage.get_meta(&t).unwrap(), bytes);
	}

	#[test]
	fn multiformat_tiles_from_metatile() {
		let dir = tempfile::tempdir().unwrap();
		let storage = DiskStorage::new(dir.path());
		let t = tile(1024, 1024, 12, "osm", TileFormat::Png);

		let tiles_for = |format: TileFormat| {
			(0..8)
				.flat_map(|dy| (0..8).map(move |dx| (dx, dy)))
				.map(|(dx, dy): (u32, u32)| Blob::from(format!("{format}-{dx}-{dy}").into_bytes()))
				.collect::<Vec<_>>()
		};
		let png = MetatileSection::new(TileFormat::Png, 1024, 1024, 12, tiles_for(TileFormat::Png)).unwrap();
		let jpeg = MetatileSection::new(TileFormat::Jpeg, 1024, 1024, 12, tiles_for(TileFormat::Jpeg)).unwrap();
		let bytes = Blob::from(Metatile::new(vec![png, jpeg]).encode().unwrap());
		assert!(storage.put_meta(&t, &bytes));

		for dy in 0..8 {
			for dx in 0..8 {
				for format in [TileFormat::Png, TileFormat::Jpeg] {
					let t2 = tile(1024 + dx, 1024 + dy, 12, "osm", format);
					let handle = storage.get(&t2);
					assert!(handle.exists(), "({dx},{dy}) {format} should exist");
					assert!(!handle.expired());
				}
			}
		}
	}

	#[test]
	fn expire_then_get_reports_expired_but_present() {
		let dir = tempfile::tempdir().unwrap();
		let storage = DiskStorage::new(dir.path());
		let t = tile(8, 8, 5, "osm", TileFormat::Png);
		let bytes = metatile_bytes(TileFormat::Png, 8, 8, 5);
		assert!(storage.put_meta(&t, &bytes));
		assert!(storage.expire(&t));

		let handle = storage.get(&t);
		assert!(handle.exists());
		assert!(handle.expired());
		assert!(storage.get_meta(&t).is_none());
	}

	#[test]
	fn put_meta_refuses_unaligned_tile() {
		let dir = tempfile::tempdir().unwrap();
		let storage = DiskStorage::new(dir.path());
		let t = tile(3, 3, 5, "osm", TileFormat::Png);
		assert!(!storage.put_meta(&t, &Blob::new_empty()));
	}

	#[test]
	#[should_panic(expected = "still outstanding")]
	fn second_get_while_handle_alive_panics() {
		let dir = tempfile::tempdir().unwrap();
		let storage = DiskStorage::new(dir.path());
		let t = tile(0, 0, 0, "", TileFormat::Png);
		storage.put_meta(&t, &metatile_bytes(TileFormat::Png, 0, 0, 0));
		let _first = storage.get(&t);
		let _second = storage.get(&t);
	}
}
