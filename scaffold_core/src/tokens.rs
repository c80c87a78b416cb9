use std::fmt::Display;

use crate::TextEncoding;

/// A literal byte sequence watched for by an operation.
///
/// Only the `[start, end)` span is significant. Bytes before `start` are
/// leading context that must precede the match and are written through as
/// ordinary text. Bytes after `end` are trailing context that must follow it
/// and are scanned again once the operation has run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
	bytes: Vec<u8>,
	start: usize,
	end: usize,
}

impl Token {
	/// A token where every byte is significant.
	pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
		let bytes = bytes.into();
		let end = bytes.len();

		Self {
			bytes,
			start: 0,
			end,
		}
	}

	/// A token with leading and trailing context around its value.
	pub fn with_context(before: &[u8], value: &[u8], after: &[u8]) -> Self {
		let mut bytes = Vec::with_capacity(before.len() + value.len() + after.len());
		bytes.extend_from_slice(before);
		bytes.extend_from_slice(value);
		bytes.extend_from_slice(after);

		Self {
			bytes,
			start: before.len(),
			end: before.len() + value.len(),
		}
	}

	/// Encode a plain text token.
	pub fn encode(encoding: TextEncoding, text: &str) -> Self {
		Self::literal(encoding.encode(text))
	}

	/// Every byte that has to match, context included.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// The part of the token the operation acts on.
	pub fn significant(&self) -> &[u8] {
		&self.bytes[self.start..self.end]
	}

	pub fn start(&self) -> usize {
		self.start
	}

	pub fn end(&self) -> usize {
		self.end
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}
}

impl Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", String::from_utf8_lossy(self.significant()))
	}
}
