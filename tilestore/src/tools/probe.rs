use crate::config_file;
use anyhow::Result;
use clap::Args;
use tilestore_core::ConfigTree;
use tilestore_storage::{RuntimeContext, StorageRegistry};

#[derive(Args, Debug)]
pub struct Subcommand {
	#[arg(long)]
	pub config: std::path::PathBuf,
}

/// The child-key names each composite type resolves its children under —
/// used only to walk the configuration tree for display, not to build
/// anything.
fn child_keys(type_tag: &str) -> &'static [&'static str] {
	match type_tag {
		"compositing" => &["under", "over"],
		_ => &[],
	}
}

/// The key holding a single named child's subtree name, for backends that
/// indirect through a name rather than nesting the child directly.
fn named_child_key(type_tag: &str) -> Option<&'static str> {
	match type_tag {
		"expiry_overlay" => Some("storage"),
		_ => None,
	}
}

fn list_keys(type_tag: &str) -> Option<&'static str> {
	match type_tag {
		"union" => Some("storages"),
		"per_style" => Some("styles"),
		_ => None,
	}
}

fn print_node(config: &ConfigTree, depth: usize) {
	let indent = "  ".repeat(depth);
	let Some(type_tag) = config.get("type") else {
		println!("{indent}<missing type>");
		return;
	};
	println!("{indent}{type_tag}");

	for key in child_keys(type_tag) {
		print_node(&config.get_subtree(key), depth + 1);
	}
	if let Some(name_key) = named_child_key(type_tag) {
		if let Some(name) = config.get(name_key) {
			print_node(&config.get_subtree(name), depth + 1);
		}
	}
	if let Some(list_key) = list_keys(type_tag) {
		if let Some(list) = config.get(list_key) {
			for name in ConfigTree::split_list(list) {
				print!("{indent}  {name}: ");
				print_node_inline(&config.get_subtree(&name), depth + 1);
			}
		}
		if type_tag == "per_style" {
			let default = config.get_subtree("default");
			if default.get("type").is_some() {
				print!("{indent}  default: ");
				print_node_inline(&default, depth + 1);
			}
		}
	}
}

fn print_node_inline(config: &ConfigTree, depth: usize) {
	match config.get("type") {
		Some(type_tag) => {
			println!("{type_tag}");
			for key in child_keys(type_tag) {
				print_node(&config.get_subtree(key), depth + 1);
			}
			if let Some(name_key) = named_child_key(type_tag) {
				if let Some(name) = config.get(name_key) {
					print_node(&config.get_subtree(name), depth + 1);
				}
			}
		}
		None => println!("<missing type>"),
	}
}

pub fn run(args: &Subcommand) -> Result<()> {
	let config = config_file::load(&args.config)?;
	// Building validates the graph actually constructs, surfacing
	// configuration errors the same way `get`/`put`/`expire` would.
	StorageRegistry::with_builtins().build(&config, &RuntimeContext::default())?;
	print_node(&config, 0);
	Ok(())
}
