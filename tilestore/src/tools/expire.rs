use super::TileArgs;
use crate::config_file;
use anyhow::{Result, bail};
use clap::Args;
use tilestore_core::Command;
use tilestore_storage::{RuntimeContext, StorageRegistry};

#[derive(Args, Debug)]
pub struct Subcommand {
	#[command(flatten)]
	pub tile: TileArgs,
}

pub fn run(args: &Subcommand) -> Result<()> {
	let config = config_file::load(&args.tile.config)?;
	let registry = StorageRegistry::with_builtins();
	let storage = registry.build(&config, &RuntimeContext::default())?;

	let tile = args.tile.tile(Command::Dirty)?;
	if !storage.expire(&tile) {
		bail!("expire failed for style={} x={} y={} z={}", tile.style, tile.x, tile.y, tile.z);
	}
	println!("ok");
	Ok(())
}
