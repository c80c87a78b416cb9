use std::sync::Arc;

use super::Handled;
use super::MatchContext;
use crate::ScaffoldResult;
use crate::SetFlagSpec;
use crate::TextEncoding;
use crate::Token;

#[derive(Debug, Clone, Copy)]
struct FlagAction {
	value: bool,
	emit: bool,
}

/// Switches a named flag. The directive itself never reaches the output;
/// the no-emit variants also remove its line when nothing but whitespace
/// precedes them on it.
#[derive(Debug, Clone)]
pub(crate) struct SetFlag {
	name: Arc<str>,
	tokens: Arc<[Token]>,
	actions: Arc<[FlagAction]>,
}

impl SetFlag {
	pub fn new(spec: &SetFlagSpec, encoding: TextEncoding) -> Self {
		let (tokens, actions): (Vec<_>, Vec<_>) = spec
			.tokens()
			.map(|(text, value, emit)| (Token::encode(encoding, text), FlagAction { value, emit }))
			.unzip();

		Self {
			name: Arc::from(spec.name.as_str()),
			tokens: Arc::from(tokens),
			actions: Arc::from(actions),
		}
	}

	pub fn tokens(&self) -> &[Token] {
		&self.tokens
	}

	pub fn handle_match(
		&self,
		cx: &mut MatchContext<'_, '_>,
		position: usize,
		token: usize,
	) -> ScaffoldResult<Handled> {
		let action = self.actions[token];
		cx.run.flags.set(&*self.name, action.value);
		tracing::trace!(flag = %self.name, value = action.value, "flag switched");

		if action.emit {
			return Ok(Handled::rewritten(position, 0));
		}

		cx.cursor.trim_back_whitespace()?;

		if !cx.cursor.at_line_start()? {
			return Ok(Handled::rewritten(position, 0));
		}

		let position = cx.cursor.consume_through_eol(position)?;
		Ok(Handled::rewritten(position, 0))
	}
}
