//! Runtime configuration for the completion stream.
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! enabled = true
//! reset-marker = "%%reset"
//! manual-flush = true
//! max-snapshot-blocks = 64
//! ```
//!
//! The debounce interval is deliberately absent; it is
//! [`DEBOUNCE`](crate::DEBOUNCE).

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default block-content marker that starts a new session.
pub const DEFAULT_RESET_MARKER: &str = "%%reset";

/// Completion stream settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GhostConfig {
	/// When false, edits are observed but never forwarded.
	pub enabled: bool,
	/// Active-block text that rotates the session when it first appears.
	pub reset_marker: String,
	/// Whether manually triggered events skip the debounce window.
	pub manual_flush: bool,
	/// Upper bound on blocks sent in a full-context snapshot.
	pub max_snapshot_blocks: Option<usize>,
}

impl Default for GhostConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			reset_marker: DEFAULT_RESET_MARKER.to_string(),
			manual_flush: true,
			max_snapshot_blocks: None,
		}
	}
}

impl GhostConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	/// Checks cross-field constraints serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.reset_marker.trim().is_empty() {
			return Err(ConfigError::InvalidValue {
				field: "reset-marker",
				reason: "must not be empty".into(),
			});
		}
		if self.max_snapshot_blocks == Some(0) {
			return Err(ConfigError::InvalidValue {
				field: "max-snapshot-blocks",
				reason: "must be at least 1".into(),
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		assert_eq!(GhostConfig::from_toml_str("").unwrap(), GhostConfig::default());
	}

	#[test]
	fn parses_kebab_case_fields() {
		let config = GhostConfig::from_toml_str(
			r#"
			enabled = false
			reset-marker = "@@new"
			manual-flush = false
			max-snapshot-blocks = 8
			"#,
		)
		.unwrap();
		assert!(!config.enabled);
		assert_eq!(config.reset_marker, "@@new");
		assert!(!config.manual_flush);
		assert_eq!(config.max_snapshot_blocks, Some(8));
	}

	#[test]
	fn rejects_unknown_and_invalid_values() {
		assert!(matches!(GhostConfig::from_toml_str("debounce-ms = 10"), Err(ConfigError::Parse(_))));
		assert!(matches!(
			GhostConfig::from_toml_str("reset-marker = \"  \""),
			Err(ConfigError::InvalidValue { field: "reset-marker", .. })
		));
		assert!(matches!(
			GhostConfig::from_toml_str("max-snapshot-blocks = 0"),
			Err(ConfigError::InvalidValue {
				field: "max-snapshot-blocks",
				..
			})
		));
	}

	#[test]
	fn load_reads_file_and_reports_missing_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "manual-flush = false").unwrap();
		let config = GhostConfig::load(file.path()).unwrap();
		assert!(!config.manual_flush);

		let missing = file.path().with_extension("absent");
		assert!(matches!(GhostConfig::load(&missing), Err(ConfigError::Io { .. })));
	}
}
