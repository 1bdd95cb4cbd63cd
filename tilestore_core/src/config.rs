//! A small configuration tree, loadable either as nested subtrees or as a
//! flat table of dotted keys, per the nested-configuration flattening rule
//! every composite backend shares (§4.8).
//!
//! ```rust
//! use tilestore_core::ConfigTree;
//!
//! let pt = ConfigTree::from_flat_pairs([
//!     ("type".to_string(), "union".to_string()),
//!     ("storages".to_string(), "a, b".to_string()),
//!     ("a.type".to_string(), "null".to_string()),
//!     ("b.type".to_string(), "null".to_string()),
//! ]);
//! assert_eq!(pt.get("type"), Some("union"));
//! assert_eq!(pt.get_subtree("a").get("type"), Some("null"));
//! assert_eq!(ConfigTree::split_list("a, b ,,c"), vec!["a", "b", "c"]);
//! ```

use anyhow::{Result, anyhow};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
	values: HashMap<String, String>,
	children: HashMap<String, ConfigTree>,
}

impl ConfigTree {
	#[must_use]
	pub fn new() -> ConfigTree {
		ConfigTree::default()
	}

	/// Builds a tree from a flat `"a.b.c" = "value"` table, as if read from
	/// an INI-style config source. No nesting is performed eagerly; nesting
	/// happens lazily in [`ConfigTree::get_subtree`].
	pub fn from_flat_pairs<I: IntoIterator<Item = (String, String)>>(pairs: I) -> ConfigTree {
		ConfigTree {
			values: pairs.into_iter().collect(),
			children: HashMap::new(),
		}
	}

	#[must_use]
	pub fn with_child(mut self, name: &str, child: ConfigTree) -> ConfigTree {
		self.children.insert(name.to_string(), child);
		self
	}

	#[must_use]
	pub fn with_value(mut self, key: &str, value: impl Into<String>) -> ConfigTree {
		self.values.insert(key.to_string(), value.into());
		self
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&str> {
		self.values.get(key).map(String::as_str)
	}

	pub fn get_required(&self, key: &str) -> Result<&str> {
		self.get(key).ok_or_else(|| anyhow!("missing required config key '{key}'"))
	}

	#[must_use]
	pub fn get_bool(&self, key: &str, default: bool) -> bool {
		match self.get(key) {
			Some(v) => matches!(v, "1" | "true" | "yes"),
			None => default,
		}
	}

	/// Resolves the subtree a composite named `name` should see: the nested
	/// subtree at key `name` if one was attached directly, merged with every
	/// flat key prefixed `name.` or `name;` (`;` is the alternate separator
	/// used when `.` would collide with a flat source's own syntax).
	#[must_use]
	pub fn get_subtree(&self, name: &str) -> ConfigTree {
		let mut sub = self.children.get(name).cloned().unwrap_or_default();
		let prefix_dot = format!("{name}.");
		let prefix_semi = format!("{name};");
		for (key, val) in &self.values {
			if let Some(rest) = key.strip_prefix(&prefix_dot).or_else(|| key.strip_prefix(&prefix_semi)) {
				sub.values.insert(rest.to_string(), val.clone());
			}
		}
		sub
	}

	/// Splits a comma-or-space separated list, dropping empty items —
	/// `union`'s `storages` key and `per_style`'s `styles` key are read this
	/// way.
	#[must_use]
	pub fn split_list(value: &str) -> Vec<String> {
		value
			.split([',', ' '])
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
			.collect()
	}
}
