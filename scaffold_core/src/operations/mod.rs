//! The operations a processor dispatches matches to.
//!
//! Every operation contributes tokens to the shared trie. When one of them
//! matches, the processor writes everything in front of the token's
//! significant span and calls [`Operation::handle_match`] with the buffer
//! position right after that span. The handler may read further input, write
//! to the target, or rewrite what was already written, and returns the
//! position scanning resumes from.
//!
//! Compiled operations are shared between runs; the immutable parts live
//! behind an `Arc` and cloning an operation yields fresh per-run state.

pub(crate) use balanced_nesting::*;
pub(crate) use conditional::*;
pub(crate) use include::*;
pub(crate) use position_tracker::PositionTracker;
pub use position_tracker::TrackedPosition;
pub(crate) use region::*;
pub(crate) use replacement::*;
pub(crate) use set_flag::*;

use crate::OperationSpec;
use crate::RunContext;
use crate::ScaffoldResult;
use crate::StreamCursor;
use crate::TextEncoding;
use crate::Token;

mod balanced_nesting;
mod conditional;
mod include;
mod position_tracker;
mod region;
mod replacement;
mod set_flag;

/// Everything a handler may touch while processing a match.
pub(crate) struct MatchContext<'c, 'io> {
	pub cursor: &'c mut StreamCursor<'io>,
	pub run: &'c mut RunContext,
	pub tracked: &'c mut Vec<TrackedPosition>,
}

/// Outcome of a handled match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Handled {
	/// Buffer position to resume scanning from.
	pub position: usize,
	/// Bytes written to the target, for flush accounting.
	pub written: usize,
	/// Whether the output differs from the input.
	pub modified: bool,
}

impl Handled {
	pub fn rewritten(position: usize, written: usize) -> Self {
		Self {
			position,
			written,
			modified: true,
		}
	}

	pub fn unchanged(position: usize, written: usize) -> Self {
		Self {
			position,
			written,
			modified: false,
		}
	}
}

#[derive(Debug, Clone)]
pub(crate) enum Operation {
	Replacement(Replacement),
	Conditional(Conditional),
	BalancedNesting(BalancedNesting),
	Region(Region),
	Include(Include),
	SetFlag(SetFlag),
	PositionTracker(PositionTracker),
}

impl Operation {
	/// Encode the tokens of `spec` for files in `encoding`.
	pub fn compile(spec: &OperationSpec, encoding: TextEncoding) -> ScaffoldResult<Self> {
		spec.validate()?;

		let operation = match spec {
			OperationSpec::Replacement(spec) => Self::Replacement(Replacement::new(spec, encoding)),
			OperationSpec::Conditional(spec) => Self::Conditional(Conditional::new(spec, encoding)),
			OperationSpec::BalancedNesting(spec) => {
				Self::BalancedNesting(BalancedNesting::new(spec, encoding))
			}
			OperationSpec::Region(spec) => Self::Region(Region::new(spec, encoding)),
			OperationSpec::Include(spec) => Self::Include(Include::new(spec, encoding)),
			OperationSpec::SetFlag(spec) => Self::SetFlag(SetFlag::new(spec, encoding)),
			OperationSpec::PositionTracker(spec) => {
				Self::PositionTracker(PositionTracker::new(spec, encoding))
			}
		};

		Ok(operation)
	}

	pub fn tokens(&self) -> &[Token] {
		match self {
			Self::Replacement(operation) => operation.tokens(),
			Self::Conditional(operation) => operation.tokens(),
			Self::BalancedNesting(operation) => operation.tokens(),
			Self::Region(operation) => operation.tokens(),
			Self::Include(operation) => operation.tokens(),
			Self::SetFlag(operation) => operation.tokens(),
			Self::PositionTracker(operation) => operation.tokens(),
		}
	}

	/// Bytes that must fit in the buffer at once: the longest token, or the
	/// closing marker an include directive scans for.
	pub fn lookahead_length(&self) -> usize {
		let longest = self.tokens().iter().map(Token::len).max().unwrap_or(0);

		match self {
			Self::Include(operation) => longest.max(operation.end_length()),
			_ => longest,
		}
	}

	/// Handle a match of `self.tokens()[token]` whose significant span ends
	/// at `position`.
	pub fn handle_match(
		&mut self,
		cx: &mut MatchContext<'_, '_>,
		position: usize,
		token: usize,
	) -> ScaffoldResult<Handled> {
		match self {
			Self::Replacement(operation) => operation.handle_match(cx, position, token),
			Self::Conditional(operation) => operation.handle_match(cx, position, token),
			Self::BalancedNesting(operation) => operation.handle_match(cx, position, token),
			Self::Region(operation) => operation.handle_match(cx, position, token),
			Self::Include(operation) => operation.handle_match(cx, position, token),
			Self::SetFlag(operation) => operation.handle_match(cx, position, token),
			Self::PositionTracker(operation) => operation.handle_match(cx, position, token),
		}
	}
}

/// Write the significant span of `token` back out unchanged.
pub(crate) fn pass_through(
	cx: &mut MatchContext<'_, '_>,
	position: usize,
	token: &Token,
) -> ScaffoldResult<Handled> {
	let written = cx.cursor.write(token.significant())?;
	Ok(Handled::unchanged(position, written))
}

/// Remove the text written in front of a directive: the whole line when
/// `whole_line` is set, otherwise only trailing spaces and tabs when `trim`
/// is set.
pub(crate) fn trim_before(
	cx: &mut MatchContext<'_, '_>,
	whole_line: bool,
	trim: bool,
) -> ScaffoldResult<()> {
	if whole_line {
		cx.cursor.trim_back_to_previous_eol()?;
	} else if trim {
		cx.cursor.trim_back_whitespace()?;
	}

	Ok(())
}

/// Skip the input following a directive: through the end of line when
/// `whole_line` is set, otherwise over spaces and tabs when `trim` is set.
pub(crate) fn trim_after(
	cx: &mut MatchContext<'_, '_>,
	position: usize,
	whole_line: bool,
	trim: bool,
) -> ScaffoldResult<usize> {
	if whole_line {
		return Ok(cx.cursor.consume_through_eol(position)?);
	}

	if trim {
		let markers = cx.cursor.markers();
		return Ok(cx.cursor.seek_forward_while(&markers.whitespace, position)?);
	}

	Ok(position)
}
