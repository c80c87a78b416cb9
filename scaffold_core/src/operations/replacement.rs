use std::sync::Arc;

use super::Handled;
use super::MatchContext;
use crate::ReplacementSpec;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::Token;

/// Writes fixed bytes in place of its token.
#[derive(Debug, Clone)]
pub(crate) struct Replacement {
	tokens: Arc<[Token]>,
	replacement: Arc<[u8]>,
}

impl Replacement {
	pub fn new(spec: &ReplacementSpec, encoding: TextEncoding) -> Self {
		Self {
			tokens: Arc::from([spec.token.compile(encoding)]),
			replacement: Arc::from(encoding.encode(&spec.replacement)),
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
		let written = cx.cursor.write(&self.replacement)?;
		let modified = self.tokens[token].significant() != &*self.replacement;

		Ok(Handled {
			position,
			written,
			modified,
		})
	}
}
