//! Primitives shared by the whole storage algebra: tile addressing, the
//! format bitset, the metatile container codec, HTTP-date parsing, and the
//! configuration-tree flattening helper. No I/O lives here — backends live
//! in `tilestore_storage`.

mod blob;
mod config;
pub mod http_date;
mod metatile;
pub mod types;

pub use blob::Blob;
pub use config::ConfigTree;
pub use metatile::{METATILE_DIM, METATILE_TILE_COUNT, Metatile, MetatileSection, tile_index};
pub use types::*;
