use std::sync::Arc;

use super::Handled;
use super::MatchContext;
use super::pass_through;
use super::trim_after;
use super::trim_before;
use crate::RegionSpec;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::Token;

const START: usize = 0;

#[derive(Debug)]
struct RegionMarkers {
	/// The start marker, followed by the end marker unless it toggles.
	tokens: Vec<Token>,
	/// Bytes that close the region; equal to the start marker when toggling.
	end: Vec<u8>,
	toggle: bool,
	include: bool,
	whole_line: bool,
	trim: bool,
}

/// Keeps or drops the content between two markers. The markers themselves
/// are always removed.
#[derive(Debug, Clone)]
pub(crate) struct Region {
	markers: Arc<RegionMarkers>,
	inside: bool,
}

impl Region {
	pub fn new(spec: &RegionSpec, encoding: TextEncoding) -> Self {
		let start = Token::encode(encoding, &spec.start);
		let end = spec
			.end
			.as_deref()
			.filter(|end| *end != spec.start)
			.map(|end| Token::encode(encoding, end));
		let toggle = end.is_none();
		let end_bytes = end.as_ref().unwrap_or(&start).significant().to_vec();
		let tokens = std::iter::once(start).chain(end).collect();

		Self {
			markers: Arc::new(RegionMarkers {
				tokens,
				end: end_bytes,
				toggle,
				include: spec.include,
				whole_line: spec.whole_line,
				trim: spec.trim,
			}),
			inside: false,
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
		let markers = Arc::clone(&self.markers);
		let opens = token == START && (!markers.toggle || !self.inside);

		// An end marker outside of a region is ordinary text.
		if !opens && !self.inside {
			return pass_through(cx, position, &markers.tokens[token]);
		}

		trim_before(cx, markers.whole_line, markers.trim)?;

		if markers.include {
			self.inside = opens;
			let position = trim_after(cx, position, markers.whole_line, markers.trim)?;
			return Ok(Handled::rewritten(position, 0));
		}

		let (position, found) = cx
			.cursor
			.scan_for_literal(position, &markers.end, true, None)?;

		if !found {
			tracing::debug!("region is not closed, dropped the rest of the input");
			return Ok(Handled::rewritten(position, 0));
		}

		let position = trim_after(cx, position, markers.whole_line, markers.trim)?;
		Ok(Handled::rewritten(position, 0))
	}
}
