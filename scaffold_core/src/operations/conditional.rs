use std::sync::Arc;

use super::Handled;
use super::MatchContext;
use super::pass_through;
use super::trim_before;
use crate::ByteTrie;
use crate::ConditionalSpec;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::Token;
use crate::expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
	If,
	ElseIf,
	Else,
	EndIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirectiveKind {
	directive: Directive,
	actionable: bool,
}

#[derive(Debug)]
struct ConditionalDirectives {
	tokens: Vec<Token>,
	kinds: Vec<DirectiveKind>,
	/// The same tokens, scanned for while skipping a branch.
	skip_trie: ByteTrie<DirectiveKind>,
	actionable_operations: Vec<String>,
	whole_line: bool,
	trim_whitespace: bool,
}

/// State of one open `if` block.
#[derive(Debug, Clone, Copy, Default)]
struct EvaluationState {
	branch_taken: bool,
	/// The live branch was entered through an actionable directive.
	actionable_live: bool,
}

/// `if` / `elseif` / `else` / `endif` blocks with arbitrary nesting.
///
/// Live branches are left to the processor so other operations still apply
/// inside them. Dead branches are skipped here by scanning for directives
/// only, so nothing inside them is evaluated or written. Directive lines
/// never reach the output.
#[derive(Debug, Clone)]
pub(crate) struct Conditional {
	directives: Arc<ConditionalDirectives>,
	blocks: Vec<EvaluationState>,
}

impl Conditional {
	pub fn new(spec: &ConditionalSpec, encoding: TextEncoding) -> Self {
		let groups = [
			(&spec.if_tokens, Directive::If, false),
			(&spec.elseif, Directive::ElseIf, false),
			(&spec.else_tokens, Directive::Else, false),
			(&spec.endif, Directive::EndIf, false),
			(&spec.actionable_if, Directive::If, true),
			(&spec.actionable_elseif, Directive::ElseIf, true),
			(&spec.actionable_else, Directive::Else, true),
		];

		let mut tokens = Vec::new();
		let mut kinds = Vec::new();
		let mut skip_trie = ByteTrie::new();

		for (texts, directive, actionable) in groups {
			for text in texts {
				let token = Token::encode(encoding, text);
				let kind = DirectiveKind {
					directive,
					actionable,
				};
				skip_trie.add_path(token.bytes(), kind);
				tokens.push(token);
				kinds.push(kind);
			}
		}

		Self {
			directives: Arc::new(ConditionalDirectives {
				tokens,
				kinds,
				skip_trie,
				actionable_operations: spec.actionable_operations.clone(),
				whole_line: spec.whole_line,
				trim_whitespace: spec.trim_whitespace,
			}),
			blocks: Vec::new(),
		}
	}

	pub fn tokens(&self) -> &[Token] {
		&self.directives.tokens
	}

	pub fn handle_match(
		&mut self,
		cx: &mut MatchContext<'_, '_>,
		position: usize,
		token: usize,
	) -> ScaffoldResult<Handled> {
		let directives = Arc::clone(&self.directives);
		let kind = directives.kinds[token];

		if kind.directive != Directive::If && self.blocks.is_empty() {
			return pass_through(cx, position, &directives.tokens[token]);
		}

		trim_before(cx, directives.whole_line, directives.trim_whitespace)?;

		let position = match kind.directive {
			Directive::If => {
				self.blocks.push(EvaluationState::default());
				self.evaluate_branch(cx, position, kind)?
			}
			// Reaching another branch from a live one: the block is done.
			Directive::ElseIf | Directive::Else => {
				if let Some(block) = self.blocks.last_mut() {
					block.actionable_live = false;
				}
				self.sync_actionable_flags(cx);
				self.skip(cx, position)?
			}
			Directive::EndIf => {
				self.blocks.pop();
				self.sync_actionable_flags(cx);
				self.after_directive(cx, position)?
			}
		};

		Ok(Handled::rewritten(position, 0))
	}

	/// Read and evaluate the condition following an `if` or `elseif`, then
	/// either enter the branch or skip it.
	fn evaluate_branch(
		&mut self,
		cx: &mut MatchContext<'_, '_>,
		position: usize,
		kind: DirectiveKind,
	) -> ScaffoldResult<usize> {
		let mut line = Vec::new();
		let position = cx.cursor.read_line(position, &mut line)?;
		let condition = cx.cursor.encoding().decode_lossy(&line);
		let taken = expression::evaluate(&condition, &cx.run.variables, &cx.run.flags)?;
		tracing::trace!(condition = condition.trim(), taken, "evaluated condition");

		if taken {
			self.take_branch(cx, kind);
			return Ok(position);
		}

		self.skip(cx, position)
	}

	fn take_branch(&mut self, cx: &mut MatchContext<'_, '_>, kind: DirectiveKind) {
		if let Some(block) = self.blocks.last_mut() {
			block.branch_taken = true;
			block.actionable_live = kind.actionable;
		}

		self.sync_actionable_flags(cx);
	}

	/// Drop input until a branch of the innermost block is taken or the
	/// block ends. Nested blocks inside the skipped text are skipped whole.
	fn skip(&mut self, cx: &mut MatchContext<'_, '_>, position: usize) -> ScaffoldResult<usize> {
		let directives = Arc::clone(&self.directives);
		let mut position = position;
		let mut depth = 0usize;

		loop {
			let (next, found) = cx
				.cursor
				.seek_forward_through(&directives.skip_trie, position)?;
			position = next;

			let Some(kind) = found else {
				// End of input closes the block.
				self.blocks.pop();
				self.sync_actionable_flags(cx);
				return Ok(position);
			};

			let branch_taken = self.blocks.last().is_some_and(|block| block.branch_taken);

			match kind.directive {
				Directive::If => depth += 1,
				Directive::EndIf if depth > 0 => depth -= 1,
				Directive::EndIf => {
					self.blocks.pop();
					self.sync_actionable_flags(cx);
					return self.after_directive(cx, position);
				}
				Directive::ElseIf if depth == 0 && !branch_taken => {
					let mut line = Vec::new();
					position = cx.cursor.read_line(position, &mut line)?;
					let condition = cx.cursor.encoding().decode_lossy(&line);

					if expression::evaluate(&condition, &cx.run.variables, &cx.run.flags)? {
						self.take_branch(cx, kind);
						return Ok(position);
					}
				}
				Directive::Else if depth == 0 && !branch_taken => {
					self.take_branch(cx, kind);
					return self.after_directive(cx, position);
				}
				Directive::ElseIf | Directive::Else => {}
			}
		}
	}

	fn after_directive(&self, cx: &mut MatchContext<'_, '_>, position: usize) -> ScaffoldResult<usize> {
		if self.directives.whole_line {
			return Ok(cx.cursor.consume_through_eol(position)?);
		}

		Ok(position)
	}

	/// Switch the actionable operations on while any open block is in an
	/// actionable branch.
	fn sync_actionable_flags(&self, cx: &mut MatchContext<'_, '_>) {
		if self.directives.actionable_operations.is_empty() {
			return;
		}

		let live = self.blocks.iter().any(|block| block.actionable_live);

		for id in &self.directives.actionable_operations {
			cx.run.flags.set(id.as_str(), live);
		}
	}
}
