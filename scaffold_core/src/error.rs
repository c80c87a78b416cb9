use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ScaffoldError {
	#[error(transparent)]
	#[diagnostic(code(scaffold::io_error))]
	Io(#[from] std::io::Error),

	#[error("invalid `{operation}` operation: {reason}")]
	#[diagnostic(
		code(scaffold::authoring),
		help("check the operation configuration of this template")
	)]
	Authoring { operation: String, reason: String },

	#[error("failed to generate content for `{file}` in `{operation}` at byte {offset}")]
	#[diagnostic(code(scaffold::content_generation), help("near: {snippet:?}"))]
	ContentGeneration {
		file: String,
		operation: String,
		offset: u64,
		snippet: String,
		#[source]
		source: Box<ScaffoldError>,
	},

	#[error("invalid condition `{expression}`: {reason}")]
	#[diagnostic(
		code(scaffold::invalid_condition),
		help("conditions support identifiers, literals, `!`, `&&`, `||`, comparisons and parentheses")
	)]
	InvalidCondition { expression: String, reason: String },

	#[error("unable to include `{path}`: {reason}")]
	#[diagnostic(code(scaffold::include_unavailable))]
	IncludeUnavailable { path: String, reason: String },

	#[error("failed to parse operation configuration: {0}")]
	#[diagnostic(
		code(scaffold::config_parse),
		help("the configuration must be a JSON object with an `operations` array")
	)]
	ConfigParse(String),
}

impl ScaffoldError {
	pub(crate) fn authoring(operation: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Authoring {
			operation: operation.into(),
			reason: reason.into(),
		}
	}
}

pub type ScaffoldResult<T> = Result<T, ScaffoldError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
