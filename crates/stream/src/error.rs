//! Error types for the completion stream.

use std::path::PathBuf;

use ghostline_notebook::HostError;
use ghostline_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while loading or validating [`GhostConfig`](crate::GhostConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The configuration file could not be read.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path of the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The configuration is not valid TOML for the expected schema.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A field holds a value outside its allowed range.
	#[error("invalid value for {field}: {reason}")]
	InvalidValue {
		/// Offending field.
		field: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
}

/// Errors surfaced by the completion stream.
///
/// Most failures inside the pipeline are logged and absorbed at the component
/// boundary; these are the ones returned to the embedding editor.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// Configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The wire protocol failed.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),

	/// The editor host refused an operation.
	#[error(transparent)]
	Host(#[from] HostError),

	/// The stream has been disposed.
	#[error("completion stream disposed")]
	Disposed,
}

/// Result alias with [`enum@Error`] as the default error.
pub type Result<T, E = Error> = std::result::Result<T, E>;
