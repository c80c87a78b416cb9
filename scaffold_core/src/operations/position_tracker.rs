use std::sync::Arc;

use serde::Serialize;

use super::Handled;
use super::MatchContext;
use super::pass_through;
use crate::PositionTrackerSpec;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::Token;

/// Where a tracked token was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedPosition {
	/// The token text.
	pub token: String,
	/// Offset of the token in the source, byte-order mark included.
	pub source_offset: u64,
	/// Offset of the token in the target.
	pub target_offset: u64,
}

/// Leaves its tokens in place and records their offsets.
#[derive(Debug, Clone)]
pub(crate) struct PositionTracker {
	tokens: Arc<[Token]>,
}

impl PositionTracker {
	pub fn new(spec: &PositionTrackerSpec, encoding: TextEncoding) -> Self {
		Self {
			tokens: spec
				.tokens
				.iter()
				.map(|token| Token::encode(encoding, token))
				.collect(),
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
		let token = &self.tokens[token];
		let significant = token.significant();
		let source_offset = cx.cursor.sequence_at(position - significant.len());
		let target_offset = cx.cursor.target_len()?;

		cx.tracked.push(TrackedPosition {
			token: cx.cursor.encoding().decode_lossy(significant),
			source_offset,
			target_offset,
		});

		pass_through(cx, position, token)
	}
}
