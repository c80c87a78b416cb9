use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::RunContext;
use crate::ScaffoldError;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::Token;

fn default_true() -> bool {
	true
}

/// Token text in a configuration. Either plain text where every character is
/// significant, or a value with surrounding context that has to be present
/// for the token to match but is left untouched.
///
/// ```json
/// "%NAME%"
/// { "value": "NAME", "before": "${", "after": "}" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenSpec {
	Plain(String),
	Contextual {
		value: String,
		#[serde(default)]
		before: String,
		#[serde(default)]
		after: String,
	},
}

impl TokenSpec {
	/// The significant text.
	pub fn value(&self) -> &str {
		match self {
			Self::Plain(value) | Self::Contextual { value, .. } => value,
		}
	}

	pub fn compile(&self, encoding: TextEncoding) -> Token {
		match self {
			Self::Plain(value) => Token::encode(encoding, value),
			Self::Contextual {
				value,
				before,
				after,
			} => {
				Token::with_context(
					&encoding.encode(before),
					&encoding.encode(value),
					&encoding.encode(after),
				)
			}
		}
	}
}

impl From<&str> for TokenSpec {
	fn from(value: &str) -> Self {
		Self::Plain(value.to_string())
	}
}

impl Default for TokenSpec {
	fn default() -> Self {
		Self::Plain(String::new())
	}
}

/// One configured operation.
///
/// Operations are compared and hashed structurally: two processors built from
/// equal operation lists share the same compiled trie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum OperationSpec {
	Replacement(ReplacementSpec),
	Conditional(ConditionalSpec),
	BalancedNesting(BalancedNestingSpec),
	Region(RegionSpec),
	Include(IncludeSpec),
	SetFlag(SetFlagSpec),
	PositionTracker(PositionTrackerSpec),
}

impl OperationSpec {
	/// Name of the operation type as written in the configuration.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Replacement(_) => "replacement",
			Self::Conditional(_) => "conditional",
			Self::BalancedNesting(_) => "balanced_nesting",
			Self::Region(_) => "region",
			Self::Include(_) => "include",
			Self::SetFlag(_) => "set_flag",
			Self::PositionTracker(_) => "position_tracker",
		}
	}

	/// The flag that switches this operation on and off.
	pub fn id(&self) -> Option<&str> {
		match self {
			Self::Replacement(spec) => spec.id.as_deref(),
			Self::Conditional(spec) => spec.id.as_deref(),
			Self::BalancedNesting(spec) => spec.id.as_deref(),
			Self::Region(spec) => spec.id.as_deref(),
			Self::Include(spec) => spec.id.as_deref(),
			Self::SetFlag(spec) => spec.id.as_deref(),
			Self::PositionTracker(spec) => spec.id.as_deref(),
		}
	}

	/// Initial value of the operation's flag when the caller did not set it.
	pub fn on_by_default(&self) -> bool {
		match self {
			Self::Replacement(spec) => spec.on_by_default,
			Self::Conditional(spec) => spec.on_by_default,
			Self::BalancedNesting(spec) => spec.on_by_default,
			Self::Region(spec) => spec.on_by_default,
			Self::Include(spec) => spec.on_by_default,
			Self::SetFlag(spec) => spec.on_by_default,
			Self::PositionTracker(spec) => spec.on_by_default,
		}
	}

	/// Name used in diagnostics: the id when there is one.
	pub fn label(&self) -> &str {
		self.id().unwrap_or_else(|| self.kind())
	}

	/// Reject configurations that can never match anything.
	pub fn validate(&self) -> ScaffoldResult<()> {
		let kind = self.kind();
		let require = |name: &str, text: &str| {
			if text.is_empty() {
				Err(ScaffoldError::authoring(kind, format!("`{name}` must not be empty")))
			} else {
				Ok(())
			}
		};

		if self.id().is_some_and(str::is_empty) {
			return Err(ScaffoldError::authoring(kind, "`id` must not be empty"));
		}

		match self {
			Self::Replacement(spec) => require("token", spec.token.value()),
			Self::Conditional(spec) => {
				if spec.if_tokens.is_empty() && spec.actionable_if.is_empty() {
					return Err(ScaffoldError::authoring(kind, "at least one `if` token is required"));
				}

				if spec.endif.is_empty() {
					return Err(ScaffoldError::authoring(kind, "at least one `endif` token is required"));
				}

				spec.all_tokens()
					.try_for_each(|token| require("conditional token", token))
			}
			Self::BalancedNesting(spec) => {
				require("start", &spec.start)?;
				require("real_end", &spec.real_end)?;
				require("pseudo_end", &spec.pseudo_end)
			}
			Self::Region(spec) => {
				require("start", &spec.start)?;
				spec.end.as_deref().map_or(Ok(()), |end| require("end", end))
			}
			Self::Include(spec) => {
				require("start", &spec.start)?;
				require("end", &spec.end)
			}
			Self::SetFlag(spec) => {
				require("name", &spec.name)?;
				let mut tokens = spec.tokens().peekable();

				if tokens.peek().is_none() {
					return Err(ScaffoldError::authoring(
						kind,
						"at least one of `on`, `off`, `on_no_emit` or `off_no_emit` is required",
					));
				}

				tokens.try_for_each(|(token, ..)| require("flag token", token))
			}
			Self::PositionTracker(spec) => {
				if spec.tokens.is_empty() {
					return Err(ScaffoldError::authoring(kind, "`tokens` must not be empty"));
				}

				spec.tokens
					.iter()
					.try_for_each(|token| require("tokens", token))
			}
		}
	}
}

/// Replace one token with fixed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplacementSpec {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default = "default_true")]
	pub on_by_default: bool,
	pub token: TokenSpec,
	#[serde(default)]
	pub replacement: String,
}

impl ReplacementSpec {
	pub fn new(token: impl Into<TokenSpec>, replacement: impl Into<String>) -> Self {
		Self {
			id: None,
			on_by_default: true,
			token: token.into(),
			replacement: replacement.into(),
		}
	}

	#[must_use]
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}
}

/// `if` / `elseif` / `else` / `endif` blocks.
///
/// The text following an `if` or `elseif` token up to the end of the line is
/// the condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionalSpec {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default = "default_true")]
	pub on_by_default: bool,
	#[serde(rename = "if", default)]
	pub if_tokens: Vec<String>,
	#[serde(default)]
	pub elseif: Vec<String>,
	#[serde(rename = "else", default)]
	pub else_tokens: Vec<String>,
	#[serde(default)]
	pub endif: Vec<String>,
	/// Variants that also switch on `actionable_operations` while their
	/// branch is live.
	#[serde(default)]
	pub actionable_if: Vec<String>,
	#[serde(default)]
	pub actionable_elseif: Vec<String>,
	#[serde(default)]
	pub actionable_else: Vec<String>,
	#[serde(default)]
	pub actionable_operations: Vec<String>,
	#[serde(default = "default_true")]
	pub whole_line: bool,
	#[serde(default = "default_true")]
	pub trim_whitespace: bool,
}

impl Default for ConditionalSpec {
	fn default() -> Self {
		Self {
			id: None,
			on_by_default: true,
			if_tokens: Vec::new(),
			elseif: Vec::new(),
			else_tokens: Vec::new(),
			endif: Vec::new(),
			actionable_if: Vec::new(),
			actionable_elseif: Vec::new(),
			actionable_else: Vec::new(),
			actionable_operations: Vec::new(),
			whole_line: true,
			trim_whitespace: true,
		}
	}
}

impl ConditionalSpec {
	pub fn new(if_token: &str, elseif: &str, else_token: &str, endif: &str) -> Self {
		Self {
			if_tokens: vec![if_token.to_string()],
			elseif: vec![elseif.to_string()],
			else_tokens: vec![else_token.to_string()],
			endif: vec![endif.to_string()],
			..Self::default()
		}
	}

	/// `#if` / `#elseif` / `#else` / `#endif` directives.
	pub fn cpp_style() -> Self {
		Self::new("#if", "#elseif", "#else", "#endif")
	}

	fn all_tokens(&self) -> impl Iterator<Item = &str> {
		self.if_tokens
			.iter()
			.chain(&self.elseif)
			.chain(&self.else_tokens)
			.chain(&self.endif)
			.chain(&self.actionable_if)
			.chain(&self.actionable_elseif)
			.chain(&self.actionable_else)
			.map(String::as_str)
	}
}

/// Depth tracking of nested comment markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalancedNestingSpec {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default = "default_true")]
	pub on_by_default: bool,
	pub start: String,
	pub real_end: String,
	pub pseudo_end: String,
	/// Flag that, when set, resets the depth at the next match.
	#[serde(default)]
	pub reset_flag: Option<String>,
}

impl BalancedNestingSpec {
	pub fn new(start: &str, real_end: &str, pseudo_end: &str) -> Self {
		Self {
			id: None,
			on_by_default: true,
			start: start.to_string(),
			real_end: real_end.to_string(),
			pseudo_end: pseudo_end.to_string(),
			reset_flag: None,
		}
	}
}

/// Keep or drop everything between two markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionSpec {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default = "default_true")]
	pub on_by_default: bool,
	pub start: String,
	/// Without an end marker (or with one equal to `start`) the start marker
	/// toggles the region.
	#[serde(default)]
	pub end: Option<String>,
	#[serde(default)]
	pub include: bool,
	#[serde(default)]
	pub whole_line: bool,
	#[serde(default)]
	pub trim: bool,
}

impl RegionSpec {
	pub fn new(start: &str, end: Option<&str>, include: bool) -> Self {
		Self {
			id: None,
			on_by_default: true,
			start: start.to_string(),
			end: end.map(ToString::to_string),
			include,
			whole_line: false,
			trim: false,
		}
	}
}

/// Splice the contents of another file in place of a directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludeSpec {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default = "default_true")]
	pub on_by_default: bool,
	pub start: String,
	pub end: String,
}

impl IncludeSpec {
	pub fn new(start: &str, end: &str) -> Self {
		Self {
			id: None,
			on_by_default: true,
			start: start.to_string(),
			end: end.to_string(),
		}
	}
}

/// Directives that switch a named flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetFlagSpec {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default = "default_true")]
	pub on_by_default: bool,
	pub name: String,
	#[serde(default)]
	pub on: Option<String>,
	#[serde(default)]
	pub off: Option<String>,
	/// Like `on` but a directive alone on its line removes that line.
	#[serde(default)]
	pub on_no_emit: Option<String>,
	#[serde(default)]
	pub off_no_emit: Option<String>,
	/// Value of the flag at the start of a run unless the caller set it.
	#[serde(default)]
	pub default: Option<bool>,
}

impl Default for SetFlagSpec {
	fn default() -> Self {
		Self {
			id: None,
			on_by_default: true,
			name: String::new(),
			on: None,
			off: None,
			on_no_emit: None,
			off_no_emit: None,
			default: None,
		}
	}
}

impl SetFlagSpec {
	pub fn new(name: &str, on: &str, off: &str) -> Self {
		Self {
			name: name.to_string(),
			on: Some(on.to_string()),
			off: Some(off.to_string()),
			..Self::default()
		}
	}

	/// Configured tokens with the value they set and whether they emit.
	pub(crate) fn tokens(&self) -> impl Iterator<Item = (&str, bool, bool)> {
		[
			(self.on.as_deref(), true, true),
			(self.off.as_deref(), false, true),
			(self.on_no_emit.as_deref(), true, false),
			(self.off_no_emit.as_deref(), false, false),
		]
		.into_iter()
		.filter_map(|(token, value, emit)| token.map(|token| (token, value, emit)))
	}
}

/// Records where its tokens were found without changing them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionTrackerSpec {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default = "default_true")]
	pub on_by_default: bool,
	pub tokens: Vec<String>,
}

impl PositionTrackerSpec {
	pub fn new(tokens: &[&str]) -> Self {
		Self {
			id: None,
			on_by_default: true,
			tokens: tokens.iter().map(ToString::to_string).collect(),
		}
	}
}

impl From<ReplacementSpec> for OperationSpec {
	fn from(spec: ReplacementSpec) -> Self {
		Self::Replacement(spec)
	}
}

impl From<ConditionalSpec> for OperationSpec {
	fn from(spec: ConditionalSpec) -> Self {
		Self::Conditional(spec)
	}
}

impl From<BalancedNestingSpec> for OperationSpec {
	fn from(spec: BalancedNestingSpec) -> Self {
		Self::BalancedNesting(spec)
	}
}

impl From<RegionSpec> for OperationSpec {
	fn from(spec: RegionSpec) -> Self {
		Self::Region(spec)
	}
}

impl From<IncludeSpec> for OperationSpec {
	fn from(spec: IncludeSpec) -> Self {
		Self::Include(spec)
	}
}

impl From<SetFlagSpec> for OperationSpec {
	fn from(spec: SetFlagSpec) -> Self {
		Self::SetFlag(spec)
	}
}

impl From<PositionTrackerSpec> for OperationSpec {
	fn from(spec: PositionTrackerSpec) -> Self {
		Self::PositionTracker(spec)
	}
}

/// An operation list with the flags and variables of a run, loaded from
/// JSON.
///
/// ```json
/// {
///   "operations": [
///     { "type": "replacement", "token": "%NAME%", "replacement": "Acme" },
///     { "type": "conditional", "if": ["#if"], "else": ["#else"], "endif": ["#endif"] }
///   ],
///   "flags": { "replace": true },
///   "variables": { "framework": "net8.0" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
	pub operations: Vec<OperationSpec>,
	pub flags: HashMap<String, bool>,
	pub variables: HashMap<String, serde_json::Value>,
	pub buffer_size: Option<usize>,
	pub flush_threshold: Option<usize>,
}

impl ScaffoldConfig {
	pub fn from_json(content: &str) -> ScaffoldResult<Self> {
		serde_json::from_str(content).map_err(|error| ScaffoldError::ConfigParse(error.to_string()))
	}

	/// Load a configuration file.
	pub fn load(path: impl AsRef<Path>) -> ScaffoldResult<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::from_json(&content)
	}

	/// A fresh run context seeded with the configured flags and variables.
	pub fn run_context(&self) -> RunContext {
		RunContext::new()
			.with_flags(self.flags.clone())
			.with_variables(self.variables.clone())
	}
}
