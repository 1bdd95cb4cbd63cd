use super::TileArgs;
use crate::config_file;
use anyhow::{Context, Result, bail};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use tilestore_core::{Blob, Command};
use tilestore_storage::{RuntimeContext, StorageRegistry};

#[derive(Args, Debug)]
pub struct Subcommand {
	#[command(flatten)]
	pub tile: TileArgs,

	/// Path to a metatile container file to write.
	#[arg(long)]
	pub file: PathBuf,
}

pub fn run(args: &Subcommand) -> Result<()> {
	let config = config_file::load(&args.tile.config)?;
	let registry = StorageRegistry::with_builtins();
	let storage = registry.build(&config, &RuntimeContext::default())?;

	let tile = args.tile.tile(Command::Render)?;
	let bytes = fs::read(&args.file).with_context(|| format!("reading metatile file {}", args.file.display()))?;
	if !storage.put_meta(&tile, &Blob::from(bytes)) {
		bail!("put_meta failed for style={} x={} y={} z={}", tile.style, tile.x, tile.y, tile.z);
	}
	println!("ok");
	Ok(())
}
