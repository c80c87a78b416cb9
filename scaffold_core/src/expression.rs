//! C-style boolean conditions used by conditional directives.
//!
//! ```text
//! #if (framework == "net8.0" && !minimal) || legacy
//! ```
//!
//! Identifiers are looked up in the run's variables first and in its flags
//! second; unknown identifiers are null. Evaluation stops at the end of the
//! first complete expression so trailing text such as the `-->` of an HTML
//! comment directive is ignored. Trailing text that starts like an operator
//! (`&`, `|`, `=`, `<`, `>`) is an error.

use std::cmp::Ordering;
use std::collections::HashMap;

use logos::Logos;
use serde_json::Value;

use crate::Flags;
use crate::ScaffoldError;
use crate::ScaffoldResult;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum ConditionToken {
	#[token("(")]
	OpenParen,
	#[token(")")]
	CloseParen,
	#[token("!")]
	Not,
	#[token("&&")]
	And,
	#[token("||")]
	Or,
	#[token("==")]
	Equal,
	#[token("!=")]
	NotEqual,
	#[token("<")]
	Less,
	#[token("<=")]
	LessOrEqual,
	#[token(">")]
	Greater,
	#[token(">=")]
	GreaterOrEqual,
	#[token("true", |_| true)]
	#[token("false", |_| false)]
	Bool(bool),
	#[regex(r"[A-Za-z_][A-Za-z0-9_.]*", |lex| lex.slice().to_string())]
	Ident(String),
	#[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
	Number(f64),
	#[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
	#[regex(r"'([^'\\]|\\.)*'", |lex| unquote(lex.slice()))]
	Str(String),
}

/// Strip the quotes and resolve backslash escapes.
fn unquote(quoted: &str) -> String {
	let inner = &quoted[1..quoted.len() - 1];
	let mut result = String::with_capacity(inner.len());
	let mut chars = inner.chars();

	while let Some(ch) = chars.next() {
		if ch != '\\' {
			result.push(ch);
			continue;
		}

		match chars.next() {
			Some('n') => result.push('\n'),
			Some('t') => result.push('\t'),
			Some(other) => result.push(other),
			None => result.push('\\'),
		}
	}

	result
}

/// Characters that begin an operator. Unrecognized text starting with one
/// of them is a malformed operator rather than a trailer.
const OPERATOR_STARTS: [char; 5] = ['&', '|', '=', '<', '>'];

/// Evaluate `expression` to a boolean.
pub fn evaluate(
	expression: &str,
	variables: &HashMap<String, Value>,
	flags: &Flags,
) -> ScaffoldResult<bool> {
	let mut lexer = ConditionToken::lexer(expression);
	let mut tokens = Vec::new();
	let mut stray = None;

	while let Some(token) = lexer.next() {
		match token {
			Ok(token) => tokens.push(token),
			Err(()) => {
				stray = lexer.slice().chars().next();
				break;
			}
		}
	}

	let mut parser = ConditionParser {
		expression,
		tokens,
		stray,
		index: 0,
		variables,
		flags,
	};

	if parser.tokens.is_empty() && parser.stray.is_none() {
		return Err(parser.error("the condition is empty"));
	}

	let value = parser.or()?;

	if let Some(stray) = parser.stray.filter(|ch| OPERATOR_STARTS.contains(ch)) {
		return Err(parser.error(format!("unexpected character `{stray}`")));
	}

	Ok(truthy(&value))
}

/// Recursive descent with one method per precedence level, evaluating as it
/// goes.
struct ConditionParser<'a> {
	expression: &'a str,
	tokens: Vec<ConditionToken>,
	/// First character the lexer did not recognize. Lexing stops there.
	stray: Option<char>,
	index: usize,
	variables: &'a HashMap<String, Value>,
	flags: &'a Flags,
}

impl ConditionParser<'_> {
	fn error(&self, reason: impl Into<String>) -> ScaffoldError {
		ScaffoldError::InvalidCondition {
			expression: self.expression.trim().to_string(),
			reason: reason.into(),
		}
	}

	fn peek(&self) -> Option<&ConditionToken> {
		self.tokens.get(self.index)
	}

	fn eat(&mut self, token: &ConditionToken) -> bool {
		if self.peek() == Some(token) {
			self.index += 1;
			true
		} else {
			false
		}
	}

	fn or(&mut self) -> ScaffoldResult<Value> {
		let mut left = self.and()?;

		while self.eat(&ConditionToken::Or) {
			let right = self.and()?;
			left = Value::Bool(truthy(&left) || truthy(&right));
		}

		Ok(left)
	}

	fn and(&mut self) -> ScaffoldResult<Value> {
		let mut left = self.equality()?;

		while self.eat(&ConditionToken::And) {
			let right = self.equality()?;
			left = Value::Bool(truthy(&left) && truthy(&right));
		}

		Ok(left)
	}

	fn equality(&mut self) -> ScaffoldResult<Value> {
		let mut left = self.relational()?;

		loop {
			let negate = match self.peek() {
				Some(ConditionToken::Equal) => false,
				Some(ConditionToken::NotEqual) => true,
				_ => return Ok(left),
			};
			self.index += 1;

			let right = self.relational()?;
			left = Value::Bool(loose_equals(&left, &right) != negate);
		}
	}

	fn relational(&mut self) -> ScaffoldResult<Value> {
		let mut left = self.unary()?;

		loop {
			let accepts: fn(Ordering) -> bool = match self.peek() {
				Some(ConditionToken::Less) => Ordering::is_lt,
				Some(ConditionToken::LessOrEqual) => Ordering::is_le,
				Some(ConditionToken::Greater) => Ordering::is_gt,
				Some(ConditionToken::GreaterOrEqual) => Ordering::is_ge,
				_ => return Ok(left),
			};
			self.index += 1;

			let right = self.unary()?;
			let ordering = compare(&left, &right)
				.ok_or_else(|| self.error(format!("cannot compare {left} with {right}")))?;
			left = Value::Bool(accepts(ordering));
		}
	}

	fn unary(&mut self) -> ScaffoldResult<Value> {
		if self.eat(&ConditionToken::Not) {
			let value = self.unary()?;
			return Ok(Value::Bool(!truthy(&value)));
		}

		self.primary()
	}

	fn primary(&mut self) -> ScaffoldResult<Value> {
		let Some(token) = self.tokens.get(self.index).cloned() else {
			return Err(match self.stray {
				Some(stray) => self.error(format!("unexpected character `{stray}`")),
				None => self.error("unexpected end of condition"),
			});
		};
		self.index += 1;

		match token {
			ConditionToken::OpenParen => {
				let value = self.or()?;

				if !self.eat(&ConditionToken::CloseParen) {
					return Err(self.error("missing `)`"));
				}

				Ok(value)
			}
			ConditionToken::Bool(value) => Ok(Value::Bool(value)),
			ConditionToken::Number(value) => {
				Ok(serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number))
			}
			ConditionToken::Str(value) => Ok(Value::String(value)),
			ConditionToken::Ident(name) => Ok(self.lookup(&name)),
			other => Err(self.error(format!("unexpected {other:?}"))),
		}
	}

	fn lookup(&self, name: &str) -> Value {
		if let Some(value) = self.variables.get(name) {
			return value.clone();
		}

		self.flags
			.get(name)
			.map_or(Value::Null, |value| Value::Bool(*value))
	}
}

/// Whether a value counts as true in a condition.
pub fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(value) => *value,
		Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
		Value::String(text) => {
			if text.eq_ignore_ascii_case("true") {
				true
			} else if text.eq_ignore_ascii_case("false") {
				false
			} else {
				!text.is_empty()
			}
		}
		Value::Array(items) => !items.is_empty(),
		Value::Object(entries) => !entries.is_empty(),
	}
}

/// Equality that coerces strings to the type of the other side. Strings
/// compare case-insensitively.
fn loose_equals(left: &Value, right: &Value) -> bool {
	match (left, right) {
		(Value::String(left), Value::String(right)) => left.eq_ignore_ascii_case(right),
		(Value::Number(_), Value::Number(_)) => left.as_f64() == right.as_f64(),
		(Value::Bool(left), other) | (other, Value::Bool(left)) => *left == truthy(other),
		(Value::Number(number), Value::String(text)) | (Value::String(text), Value::Number(number)) => {
			text.trim().parse::<f64>().ok() == number.as_f64()
		}
		_ => left == right,
	}
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
	match (left, right) {
		(Value::String(left), Value::String(right)) => {
			Some(left.to_ascii_lowercase().cmp(&right.to_ascii_lowercase()))
		}
		_ => as_number(left)?.partial_cmp(&as_number(right)?),
	}
}

fn as_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}
