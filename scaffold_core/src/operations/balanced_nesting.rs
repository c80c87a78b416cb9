use std::sync::Arc;

use super::Handled;
use super::MatchContext;
use super::pass_through;
use crate::BalancedNestingSpec;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::Token;

const START: usize = 0;
const REAL_END: usize = 1;

#[derive(Debug)]
struct NestingMarkers {
	/// `start`, `real_end`, `pseudo_end`.
	tokens: [Token; 3],
	reset_flag: Option<String>,
}

/// Tracks how deeply comment markers are nested and turns the pseudo end
/// marker that closes the outermost level into a real one.
///
/// Templates that put conditional blocks inside comments write the inner
/// closers as pseudo ends (`-- >`) so that editors don't end the comment
/// early.
#[derive(Debug, Clone)]
pub(crate) struct BalancedNesting {
	markers: Arc<NestingMarkers>,
	depth: usize,
}

impl BalancedNesting {
	pub fn new(spec: &BalancedNestingSpec, encoding: TextEncoding) -> Self {
		Self {
			markers: Arc::new(NestingMarkers {
				tokens: [
					Token::encode(encoding, &spec.start),
					Token::encode(encoding, &spec.real_end),
					Token::encode(encoding, &spec.pseudo_end),
				],
				reset_flag: spec.reset_flag.clone(),
			}),
			depth: 0,
		}
	}

	pub fn tokens(&self) -> &[Token] {
		&self.markers.tokens
	}

	pub fn handle_match(
		&mut self,
		cx: &mut MatchContext<'_, '_>,
		position: usize,
		token: usize,
	) -> ScaffoldResult<Handled> {
		if let Some(flag) = &self.markers.reset_flag {
			if cx.run.flags.is_enabled(flag) {
				self.depth = 0;
				cx.run.flags.remove(flag);
			}
		}

		match token {
			START => {
				self.depth += 1;
				pass_through(cx, position, &self.markers.tokens[START])
			}
			REAL_END => {
				self.depth = self.depth.saturating_sub(1);
				pass_through(cx, position, &self.markers.tokens[REAL_END])
			}
			_ => {
				let outermost = self.depth == 1;
				self.depth = self.depth.saturating_sub(1);

				if !outermost {
					return pass_through(cx, position, &self.markers.tokens[token]);
				}

				let written = cx.cursor.write(self.markers.tokens[REAL_END].significant())?;
				Ok(Handled::rewritten(position, written))
			}
		}
	}
}
