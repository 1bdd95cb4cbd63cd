use super::TileArgs;
use crate::config_file;
use anyhow::Result;
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

	let tile = args.tile.tile(Command::Render)?;
	let handle = storage.get(&tile);
	if handle.exists() {
		let len = handle.data().map(<[u8]>::len).unwrap_or(0);
		println!("exists=true last_modified={} expired={} bytes={len}", handle.last_modified(), handle.expired());
	} else {
		println!("exists=false");
	}
	Ok(())
}
