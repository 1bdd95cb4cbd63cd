//! One module per subcommand, mirroring the teacher's `tools::{convert,
//! probe, serve}` split.

pub mod expire;
pub mod get;
pub mod probe;
pub mod put;

use anyhow::{Result, bail};
use clap::Args;
use tilestore_core::{Command, ProtoFmt, TileFormat, TileProtocol};

/// The tile-address arguments shared by `get`, `put`, and `expire`.
#[derive(Args, Debug)]
pub struct TileArgs {
	/// Path to the flat key=value configuration file describing the storage graph.
	#[arg(long)]
	pub config: std::path::PathBuf,

	#[arg(long)]
	pub style: String,

	#[arg(long)]
	pub x: u32,

	#[arg(long)]
	pub y: u32,

	#[arg(long)]
	pub z: u8,

	/// One of png, jpeg, gif, json.
	#[arg(long)]
	pub format: String,
}

impl TileArgs {
	pub fn tile(&self, command: Command) -> Result<TileProtocol> {
		let format = parse_format(&self.format)?;
		Ok(TileProtocol::new(command, self.x, self.y, self.z, &self.style, ProtoFmt::single(format)))
	}
}

fn parse_format(value: &str) -> Result<TileFormat> {
	match value {
		"png" => Ok(TileFormat::Png),
		"jpeg" | "jpg" => Ok(TileFormat::Jpeg),
		"gif" => Ok(TileFormat::Gif),
		"json" => Ok(TileFormat::Json),
		_ => bail!("unrecognized tile format '{value}', expected one of png|jpeg|gif|json"),
	}
}
