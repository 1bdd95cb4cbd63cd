mod proto_fmt;
mod tile_address;

pub use proto_fmt::{ProtoFmt, TileFormat};
pub use tile_address::{Command, TileProtocol};
