//! The backend registry and factory: a process-wide map from a type tag to
//! the constructor that builds it, so storage graphs of arbitrary depth can
//! be built from configuration alone (§4.8).

use crate::backends::{CompositingConfig, CompositingStorage, DiskStorage, ExpiryOverlay, NullStorage, PerStyleStorage, UnionStorage};
use crate::collaborators::{GrayscaleAlphaCodec, InMemoryExpiryService};
use crate::{ExpiryService, ImageCodec, Storage};
use anyhow::{Context, Result, bail, ensure};
use std::collections::HashMap;
use std::sync::Arc;
use tilestore_core::{ConfigTree, ProtoFmt, TileFormat};

/// Collaborators a backend needs but cannot derive from configuration alone.
/// Defaults to the crate's own in-process implementations so a graph can
/// still be built — and tested — without wiring a real image codec or
/// remote expiry service.
#[derive(Clone)]
pub struct RuntimeContext {
	pub codec: Arc<dyn ImageCodec>,
	pub expiry_service: Arc<dyn ExpiryService>,
}

impl Default for RuntimeContext {
	fn default() -> RuntimeContext {
		RuntimeContext {
			codec: Arc::new(GrayscaleAlphaCodec),
			expiry_service: Arc::new(InMemoryExpiryService::new()),
		}
	}
}

type Constructor = Box<dyn Fn(&StorageRegistry, &ConfigTree, &RuntimeContext) -> Result<Box<dyn Storage>> + Send + Sync>;

/// Maps a `type` tag to the constructor that builds it. Registration is an
/// explicit build step (`with_builtins`), not implicit registration at
/// module load.
#[derive(Default)]
pub struct StorageRegistry {
	constructors: HashMap<String, Constructor>,
}

impl StorageRegistry {
	#[must_use]
	pub fn new() -> StorageRegistry {
		StorageRegistry::default()
	}

	pub fn register<F>(&mut self, type_tag: &str, constructor: F)
	where
		F: Fn(&StorageRegistry, &ConfigTree, &RuntimeContext) -> Result<Box<dyn Storage>> + Send + Sync + 'static,
	{
		self.constructors.insert(type_tag.to_string(), Box::new(constructor));
	}

	/// Builds a registry carrying every backend this crate implements:
	/// `null`, `disk`, `union`, `per_style`, `compositing`, `expiry_overlay`.
	#[must_use]
	pub fn with_builtins() -> StorageRegistry {
		let mut registry = StorageRegistry::new();

		registry.register("null", |_registry, _config, _context| Ok(Box::new(NullStorage) as Box<dyn Storage>));

		registry.register("disk", |_registry, config, _context| {
			let tile_dir = config.get_required("tile_dir")?;
			Ok(Box::new(DiskStorage::new(tile_dir)) as Box<dyn Storage>)
		});

		registry.register("union", |registry, config, context| {
			let list = config.get_required("storages")?;
			let mut children = Vec::new();
			for name in ConfigTree::split_list(list) {
				let subtree = config.get_subtree(&name);
				ensure!(subtree.get("type").is_some(), "union: no configuration found for child '{name}'");
				children.push(registry.build(&subtree, context)?);
			}
			ensure!(!children.is_empty(), "union backend configured with no children");
			Ok(Box::new(UnionStorage::new(children)) as Box<dyn Storage>)
		});

		registry.register("per_style", |registry, config, context| {
			let list = config.get_required("styles")?;
			let mut routes = HashMap::new();
			for name in ConfigTree::split_list(list) {
				let subtree = config.get_subtree(&name);
				ensure!(subtree.get("type").is_some(), "per_style: no configuration found for style '{name}'");
				routes.insert(name.clone(), registry.build(&subtree, context)?);
			}
			let default_subtree = config.get_subtree("default");
			let default = match default_subtree.get("type") {
				Some(_) => Some(registry.build(&default_subtree, context)?),
				None => None,
			};
			Ok(Box::new(PerStyleStorage::new(routes, default)) as Box<dyn Storage>)
		});

		registry.register("compositing", |registry, config, context| {
			let under_subtree = config.get_subtree("under");
			let over_subtree = config.get_subtree("over");
			ensure!(under_subtree.get("type").is_some(), "compositing: missing 'under' child");
			ensure!(over_subtree.get("type").is_some(), "compositing: missing 'over' child");
			let under = registry.build(&under_subtree, context)?;
			let over = registry.build(&over_subtree, context)?;

			// Overlay-definition options (`under_format`, the producible mask,
			// style overrides, expire flags) live in their own `config` subtree,
			// separate from the `under`/`over` child subtrees.
			let cfg_subtree = config.get_subtree("config");

			let under_format = parse_format(cfg_subtree.get_required("under_format")?)?;
			let over_format = parse_format(cfg_subtree.get_required("over_format")?)?;

			let mut producible = ProtoFmt::empty();
			for (key, format) in [("png", TileFormat::Png), ("jpeg", TileFormat::Jpeg), ("gif", TileFormat::Gif)] {
				if cfg_subtree.get_bool(key, false) {
					producible.insert(format);
				}
			}
			ensure!(!producible.is_empty(), "compositing backend requires at least one of jpeg|gif|png");

			let cfg = CompositingConfig {
				under_format,
				over_format,
				under_style: cfg_subtree.get("under_style").map(str::to_string),
				over_style: cfg_subtree.get("over_style").map(str::to_string),
				producible,
				expire_under: cfg_subtree.get_bool("expire_under", false),
				expire_over: cfg_subtree.get_bool("expire_over", false),
			};
			Ok(Box::new(CompositingStorage::new(under, over, context.codec.clone(), cfg)?) as Box<dyn Storage>)
		});

		registry.register("expiry_overlay", |registry, config, context| {
			let storage_name = config.get_required("storage")?;
			let child_subtree = config.get_subtree(storage_name);
			ensure!(child_subtree.get("type").is_some(), "expiry_overlay: no configuration found for storage '{storage_name}'");
			let child = registry.build(&child_subtree, context)?;
			Ok(Box::new(ExpiryOverlay::new(child, context.expiry_service.clone())) as Box<dyn Storage>)
		});

		registry
	}

	/// Builds a storage graph from `config`: reads `type`, looks up its
	/// constructor, and invokes it. Composite constructors recurse back into
	/// this method for their own children.
	pub fn build(&self, config: &ConfigTree, context: &RuntimeContext) -> Result<Box<dyn Storage>> {
		let type_tag = config.get_required("type")?;
		let constructor = self.constructors.get(type_tag).with_context(|| format!("unknown storage backend type '{type_tag}'"))?;
		constructor(self, config, context)
	}
}

fn parse_format(value: &str) -> Result<TileFormat> {
	match value {
		"png" => Ok(TileFormat::Png),
		"jpeg" | "jpg" => Ok(TileFormat::Jpeg),
		"gif" => Ok(TileFormat::Gif),
		"json" => Ok(TileFormat::Json),
		_ => bail!("unrecognized tile format '{value}'"),
	}
}
