//! The metatile container: an 8×8 group of same-style, same-zoom tiles
//! packed into one buffer, one header-plus-directory-plus-payload section
//! per stored format.
//!
//! ```rust
//! use tilestore_core::{Blob, Metatile, MetatileSection, TileFormat};
//!
//! let tiles = (0..64).map(|i| Blob::from(vec![i as u8])).collect();
//! let section = MetatileSection::new(TileFormat::Png, 1024, 1024, 12, tiles).unwrap();
//! let metatile = Metatile::new(vec![section]);
//! let bytes = metatile.encode().unwrap();
//! let decoded = Metatile::decode(&bytes).unwrap();
//! assert_eq!(decoded.tile(TileFormat::Png, 3, 5).unwrap().as_slice(), &[3 + 8 * 5]);
//! ```

use crate::{Blob, TileFormat};
use anyhow::{Result, bail, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// `M`, `E`, `T`, `A`.
pub const MAGIC: &[u8; 4] = b"META";
/// Metatiles group an 8×8 block of tiles.
pub const METATILE_DIM: u32 = 8;
/// `METATILE_DIM * METATILE_DIM`.
pub const METATILE_TILE_COUNT: usize = 64;
/// Fixed fields before the directory: magic, count, x, y, z, format.
const FIXED_HEADER_LEN: usize = 24;
/// 64 directory entries of `(offset: u32, len: u32)`.
const DIRECTORY_LEN: usize = METATILE_TILE_COUNT * 8;
/// Bytes consumed by one section's header and directory, before payload.
pub const SECTION_HEADER_LEN: usize = FIXED_HEADER_LEN + DIRECTORY_LEN;

/// Row-major directory index for an offset `(dx, dy)` within a metatile.
#[must_use]
pub fn tile_index(dx: u32, dy: u32) -> usize {
	(METATILE_DIM * dy + dx) as usize
}

/// One format's worth of an encoded metatile: its 64 tile payloads in
/// row-major `(dx, dy)` order.
#[derive(Debug, Clone)]
pub struct MetatileSection {
	pub format: TileFormat,
	pub x: u32,
	pub y: u32,
	pub z: u8,
	tiles: Vec<Blob>,
}

impl MetatileSection {
	pub fn new(format: TileFormat, x: u32, y: u32, z: u8, tiles: Vec<Blob>) -> Result<MetatileSection> {
		ensure!(
			tiles.len() == METATILE_TILE_COUNT,
			"a metatile section must carry exactly {METATILE_TILE_COUNT} tiles, got {}",
			tiles.len()
		);
		Ok(MetatileSection { format, x, y, z, tiles })
	}

	#[must_use]
	pub fn tile(&self, dx: u32, dy: u32) -> &Blob {
		&self.tiles[tile_index(dx, dy)]
	}

	fn encoded_len(&self) -> usize {
		SECTION_HEADER_LEN + self.tiles.iter().map(Blob::len).sum::<usize>()
	}
}

/// A container holding one or more [`MetatileSection`]s for the same
/// `(x, y, z)`, concatenated in ascending format-bit order.
#[derive(Debug, Clone)]
pub struct Metatile {
	sections: Vec<MetatileSection>,
}

impl Metatile {
	#[must_use]
	pub fn new(mut sections: Vec<MetatileSection>) -> Metatile {
		sections.sort_by_key(|section| section.format.bit_index());
		Metatile { sections }
	}

	#[must_use]
	pub fn section(&self, format: TileFormat) -> Option<&MetatileSection> {
		self.sections.iter().find(|section| section.format == format)
	}

	/// The single tile at `(dx, dy)` within the section for `format`, if the
	/// metatile carries that format.
	#[must_use]
	pub fn tile(&self, format: TileFormat, dx: u32, dy: u32) -> Option<&Blob> {
		Some(self.section(format)?.tile(dx, dy))
	}

	pub fn encode(&self) -> Result<Vec<u8>> {
		ensure!(!self.sections.is_empty(), "a metatile must carry at least one format section");

		let total_len: usize = self.sections.iter().map(MetatileSection::encoded_len).sum();
		let mut out = Vec::with_capacity(total_len);

		// Offsets are absolute, relative to the start of the whole container.
		// Sections are self-contained (header, directory, payload) laid out
		// back to back, so a reader can skip a section using its own
		// directory without needing to know about sections after it.
		for section in &self.sections {
			let section_start = out.len() as u32;
			out.write_all(MAGIC)?;
			out.write_u32::<LittleEndian>(METATILE_TILE_COUNT as u32)?;
			out.write_u32::<LittleEndian>(section.x)?;
			out.write_u32::<LittleEndian>(section.y)?;
			out.write_u32::<LittleEndian>(u32::from(section.z))?;
			out.write_u32::<LittleEndian>(format_bit_mask(section.format))?;

			let mut offset = section_start + SECTION_HEADER_LEN as u32;
			for tile in &section.tiles {
				out.write_u32::<LittleEndian>(offset)?;
				out.write_u32::<LittleEndian>(tile.len() as u32)?;
				offset += tile.len() as u32;
			}

			for tile in &section.tiles {
				out.write_all(tile.as_slice())?;
			}
		}

		Ok(out)
	}

	pub fn decode(bytes: &[u8]) -> Result<Metatile> {
		let mut sections = Vec::new();
		let mut cursor = Cursor::new(bytes);

		while (cursor.position() as usize) < bytes.len() {
			let mut magic = [0u8; 4];
			cursor.read_exact(&mut magic)?;
			ensure!(&magic == MAGIC, "bad metatile magic {magic:?}");

			let count = cursor.read_u32::<LittleEndian>()?;
			ensure!(count as usize == METATILE_TILE_COUNT, "unexpected entry count {count}");
			let x = cursor.read_u32::<LittleEndian>()?;
			let y = cursor.read_u32::<LittleEndian>()?;
			let z = cursor.read_u32::<LittleEndian>()?;
			let format_mask = cursor.read_u32::<LittleEndian>()?;
			let format = format_from_bit_mask(format_mask)?;

			let mut entries = Vec::with_capacity(METATILE_TILE_COUNT);
			for _ in 0..METATILE_TILE_COUNT {
				let offset = cursor.read_u32::<LittleEndian>()? as usize;
				let len = cursor.read_u32::<LittleEndian>()? as usize;
				entries.push((offset, len));
			}

			let mut tiles = Vec::with_capacity(METATILE_TILE_COUNT);
			for (offset, len) in entries {
				let end = offset.checked_add(len).ok_or_else(|| anyhow::anyhow!("tile range overflow"))?;
				ensure!(end <= bytes.len(), "tile payload range {offset}..{end} out of bounds");
				tiles.push(Blob::from(&bytes[offset..end]));
			}

			// advance past this section's payload bytes to the next header
			let payload_len: usize = tiles.iter().map(Blob::len).sum();
			cursor.set_position((cursor.position() as usize + payload_len) as u64);

			sections.push(MetatileSection::new(format, x, y, z as u8, tiles)?);
		}

		ensure!(!sections.is_empty(), "empty metatile buffer");
		Ok(Metatile { sections })
	}
}

impl TileFormat {
	pub(crate) fn bit_index(self) -> u8 {
		match self {
			TileFormat::Png => 0,
			TileFormat::Jpeg => 1,
			TileFormat::Gif => 2,
			TileFormat::Json => 3,
		}
	}
}

fn format_bit_mask(format: TileFormat) -> u32 {
	1u32 << format.bit_index()
}

fn format_from_bit_mask(mask: u32) -> Result<TileFormat> {
	match mask {
		1 => Ok(TileFormat::Png),
		2 => Ok(TileFormat::Jpeg),
		4 => Ok(TileFormat::Gif),
		8 => Ok(TileFormat::Json),
		_ => bail!("unrecognized single-format bitmask {mask:#x} in metatile section header"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tile_for(z: u8, x: u32, y: u32) -> Blob {
		Blob::from(format!("{z:03}|{x:06}|{y:06}").into_bytes())
	}

	fn section(format: TileFormat, x: u32, y: u32, z: u8) -> MetatileSection {
		let tiles = (0..METATILE_DIM)
			.flat_map(|dy| (0..METATILE_DIM).map(move |dx| (dx, dy)))
			.map(|(dx, dy)| tile_for(z, x + dx, y + dy))
			.collect();
		MetatileSection::new(format, x, y, z, tiles).unwrap()
	}

	#[test]
	fn round_trip_single_format() {
		let metatile = Metatile::new(vec![section(TileFormat::Png, 1024, 1024, 12)]);
		let bytes = metatile.encode().unwrap();
		let decoded = Metatile::decode(&bytes).unwrap();
		for dy in 0..METATILE_DIM {
			for dx in 0..METATILE_DIM {
				assert_eq!(
					decoded.tile(TileFormat::Png, dx, dy).unwrap().as_slice(),
					tile_for(12, 1024 + dx, 1024 + dy).as_slice()
				);
			}
		}
	}

	#[test]
	fn multiformat_sections_are_ascending_and_independently_readable() {
		let metatile = Metatile::new(vec![
			section(TileFormat::Jpeg, 8, 8, 3),
			section(TileFormat::Png, 8, 8, 3),
		]);
		let bytes = metatile.encode().unwrap();
		let decoded = Metatile::decode(&bytes).unwrap();
		assert!(decoded.section(TileFormat::Png).is_some());
		assert!(decoded.section(TileFormat::Jpeg).is_some());
		assert!(decoded.section(TileFormat::Gif).is_none());
	}

	#[test]
	fn rejects_short_section() {
		assert!(MetatileSection::new(TileFormat::Png, 0, 0, 0, vec![Blob::new_empty(); 3]).is_err());
	}

	#[test]
	fn decode_rejects_bad_magic() {
		let mut bytes = Metatile::new(vec![section(TileFormat::Png, 0, 0, 0)]).encode().unwrap();
		bytes[0] = b'X';
		assert!(Metatile::decode(&bytes).is_err());
	}
}
