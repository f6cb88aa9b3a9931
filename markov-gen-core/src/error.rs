//! Error handling shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = MarkovError> = std::result::Result<T, E>;

/// Failures surfaced by model operations, generation and persistence.
///
/// Recoverable conditions (floating-point weight drift while sampling,
/// absorption reached mid-walk with restart enabled) are handled inside the
/// model and never reach this enum.
#[derive(Debug, Error)]
pub enum MarkovError {
	/// An operation required at least one observed token but the table is empty.
	#[error("model is empty: no tokens have been observed")]
	EmptyModel,
	/// A root token was explicitly requested but is absent from the table.
	#[error("root token {0:?} is not present in the model")]
	NoRoot(String),
	/// Best-successor selection was requested on a token without successors.
	#[error("token {0:?} has no successors")]
	NoSuccessor(String),
	/// Attempt to persist a model with no observations.
	#[error("refusing to save an empty model")]
	EmptySave,
	/// A persisted table was malformed or violated a model invariant.
	#[error("corrupt model data in {path:?}: {reason}")]
	Corrupt {
		/// File the corrupt document was read from.
		path: PathBuf,
		/// What the validation found.
		reason: String,
	},
	/// Filesystem IO error with optional context path.
	#[error("io error while processing {path:?}: {source}")]
	Io {
		/// Underlying IO error returned by the standard library.
		source: std::io::Error,
		/// Target path associated with the IO failure if available.
		path: Option<PathBuf>,
	},
	/// Serialization or deserialization failure.
	#[error("serialization error: {0}")]
	Serialization(String),
	/// Catch-all variant for invariants that should not break.
	#[error("internal error: {0}")]
	Internal(String),
}

impl From<serde_json::Error> for MarkovError {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

impl From<postcard::Error> for MarkovError {
	fn from(err: postcard::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

impl MarkovError {
	/// Helper constructor that attaches an optional path when wrapping IO errors.
	pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
		Self::Io { source, path }
	}

	/// Helper constructor for corrupt persisted data.
	pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
		Self::Corrupt { path: path.into(), reason: reason.into() }
	}
}
