//! Tile image formats and the format bitset (`ProtoFmt`) used both as a
//! single-format selector on a tile address and as a capability mask on a
//! backend (the set of formats it can produce).

use enumset::{EnumSet, EnumSetType};
use std::fmt::Display;

/// A single tile image format.
#[derive(Debug, EnumSetType)]
pub enum TileFormat {
	Png,
	Jpeg,
	Gif,
	Json,
}

impl Display for TileFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			TileFormat::Png => "png",
			TileFormat::Jpeg => "jpeg",
			TileFormat::Gif => "gif",
			TileFormat::Json => "json",
		})
	}
}

/// A bitset over [`TileFormat`]. `fmtNone` from the source material is
/// [`ProtoFmt::empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtoFmt(EnumSet<TileFormat>);

impl ProtoFmt {
	#[must_use]
	pub fn empty() -> ProtoFmt {
		ProtoFmt(EnumSet::empty())
	}

	#[must_use]
	pub fn single(format: TileFormat) -> ProtoFmt {
		ProtoFmt(EnumSet::only(format))
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn contains(&self, format: TileFormat) -> bool {
		self.0.contains(format)
	}

	/// True if `self` is a subset of `other` — used to test whether a tile's
	/// single format is among a backend's producible formats.
	#[must_use]
	pub fn is_subset_of(&self, other: ProtoFmt) -> bool {
		self.0.is_subset(other.0)
	}

	#[must_use]
	pub fn union(self, other: ProtoFmt) -> ProtoFmt {
		ProtoFmt(self.0 | other.0)
	}

	pub fn insert(&mut self, format: TileFormat) {
		self.0.insert(format);
	}

	/// Formats present in the set, in ascending bit order — the order the
	/// metatile container concatenates per-format sections in.
	pub fn iter_ascending(&self) -> impl Iterator<Item = TileFormat> {
		self.0.iter()
	}

	/// The lone format of a set with exactly one member — the usual shape
	/// when `ProtoFmt` is used as a single-format tile selector rather than
	/// a capability mask.
	#[must_use]
	pub fn single_format(&self) -> Option<TileFormat> {
		let mut iter = self.0.iter();
		let first = iter.next()?;
		if iter.next().is_some() { None } else { Some(first) }
	}
}

impl From<TileFormat> for ProtoFmt {
	fn from(format: TileFormat) -> Self {
		ProtoFmt::single(format)
	}
}
