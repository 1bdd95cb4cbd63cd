//! Loads the flat `key=value` text format the `--config` flag points at:
//! one dotted key per line, blank lines and `#`-prefixed comments ignored.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tilestore_core::ConfigTree;

pub fn load(path: &Path) -> Result<ConfigTree> {
	let text = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
	let mut pairs = Vec::new();
	for (line_no, raw_line) in text.lines().enumerate() {
		let line = raw_line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		let Some((key, value)) = line.split_once('=') else {
			bail!("{}:{}: expected 'key=value', got {raw_line:?}", path.display(), line_no + 1);
		};
		pairs.push((key.trim().to_string(), value.trim().to_string()));
	}
	Ok(ConfigTree::from_flat_pairs(pairs))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn parses_flat_pairs_and_skips_comments() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "# a comment\ntype=union\nstorages = a, b\n\na.type=null").unwrap();
		let config = load(file.path()).unwrap();
		assert_eq!(config.get("type"), Some("union"));
		assert_eq!(config.get("storages"), Some("a, b"));
		assert_eq!(config.get_subtree("a").get("type"), Some("null"));
	}

	#[test]
	fn rejects_a_line_without_equals() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "not-a-pair").unwrap();
		assert!(load(file.path()).is_err());
	}
}
