mod config_file;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Resolve a tile address against the configured storage graph
	Get(tools::get::Subcommand),

	/// Write a metatile container file into the configured storage graph
	Put(tools::put::Subcommand),

	/// Mark a tile's covering metatile dirty
	Expire(tools::expire::Subcommand),

	/// Print a summary of the constructed storage graph
	Probe(tools::probe::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new().filter_level(cli.verbose.log_level_filter()).format_timestamp(None).init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Get(arguments) => tools::get::run(arguments),
		Commands::Put(arguments) => tools::put::run(arguments),
		Commands::Expire(arguments) => tools::expire::run(arguments),
		Commands::Probe(arguments) => tools::probe::run(arguments),
	}
}

#[cfg(test)]
mod tests {
	use crate::{Cli, run};
	use anyhow::Result;
	use clap::Parser;

	pub fn run_command(arg_vec: Vec<&str>) -> Result<String> {
		let cli = Cli::try_parse_from(arg_vec)?;
		let msg = format!("{cli:?}");
		run(cli)?;
		Ok(msg)
	}

	#[test]
	fn help() {
		let err = run_command(vec!["tilestore"]).unwrap_err().to_string();
		assert!(err.contains("\nUsage: tilestore [OPTIONS] <COMMAND>"));
	}

	#[test]
	fn version() {
		let err = run_command(vec!["tilestore", "-V"]).unwrap_err().to_string();
		assert!(err.starts_with("tilestore "));
	}

	#[test]
	fn get_requires_tile_arguments() {
		let err = run_command(vec!["tilestore", "get"]).unwrap_err().to_string();
		assert!(err.contains("--config"));
	}

	#[test]
	fn probe_requires_config() {
		let err = run_command(vec!["tilestore", "probe"]).unwrap_err().to_string();
		assert!(err.contains("--config"));
	}
}
