use thiserror::Error;

/// Errors surfaced by the transition store and the sentence generator.
///
/// `NoContinuation` is an expected, frequent outcome of walking the chain;
/// the generator converts it into an abandoned generation rather than
/// passing it to callers. Everything else is surfaced unchanged.
#[derive(Debug, Error)]
pub enum ModelError {
	/// The token stream ended before a single (first, second, result)
	/// window could be formed. The store is left untouched.
	#[error("token stream too short: expected at least 3 tokens, got {got}")]
	InputTooShort { got: usize },

	/// The store holds no sentence-start transition to seed a sentence from.
	/// Train the model before generating.
	#[error("empty model: no sentence-start transition recorded")]
	EmptyModel,

	/// No continuation is recorded for the given two-word context
	/// (a dead end in the chain).
	#[error("no continuation recorded for context ({first:?}, {second:?})")]
	NoContinuation { first: String, second: String },

	/// Two stores with different sentence-end sets cannot be merged.
	#[error("sentence-end set mismatch: {ours:?} vs {theirs:?}")]
	ConfigMismatch { ours: String, theirs: String },

	/// Underlying storage failure while reading or writing a model file.
	#[error("storage error: {0}")]
	Storage(#[from] std::io::Error),

	/// A model file could not be encoded or decoded.
	#[error("model codec error: {0}")]
	Codec(#[from] postcard::Error),
}
