use thiserror::Error;

/// Errors raised synchronously by binding and scanning operations.
///
/// HTTP outcomes are never reported through this type. They arrive as [`Failure`](`crate::request::Failure`) values in the
/// per-request error continuation instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	/// A required configuration value or selector target is missing.
	#[error("configuration error: {0}")]
	Config(String),

	/// A selector didn't match anything it was required to match, or couldn't be parsed.
	#[error("selector error: {0}")]
	Selector(String),

	/// A search candidate lacks the `[data-name]` field it is matched against.
	#[error("[data-name={field:?}] attribute not found on search container {container}")]
	MissingField { field: String, container: String },

	/// A search query isn't a valid regular expression.
	#[error("invalid search pattern {pattern:?}: {message}")]
	Pattern { pattern: String, message: String },

	#[error("JSON error: {0}")]
	Json(String),

	/// The platform (usually JavaScript) rejected an operation.
	#[error("platform error: {0}")]
	Platform(String),
}

impl From<serde_json::Error> for Error {
	fn from(error: serde_json::Error) -> Self {
		Self::Json(error.to_string())
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
