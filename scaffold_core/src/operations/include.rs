use std::io;
use std::io::Read;
use std::sync::Arc;

use super::Handled;
use super::MatchContext;
use crate::IncludeSpec;
use crate::ScaffoldError;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::Token;

const COPY_CHUNK: usize = 8 * 1024;

#[derive(Debug)]
struct IncludeMarkers {
	tokens: [Token; 1],
	end: Vec<u8>,
}

/// Replaces `start path end` with the contents of the file at `path`.
#[derive(Debug, Clone)]
pub(crate) struct Include {
	markers: Arc<IncludeMarkers>,
}

impl Include {
	pub fn new(spec: &IncludeSpec, encoding: TextEncoding) -> Self {
		Self {
			markers: Arc::new(IncludeMarkers {
				tokens: [Token::encode(encoding, &spec.start)],
				end: encoding.encode(&spec.end),
			}),
		}
	}

	pub fn tokens(&self) -> &[Token] {
		&self.markers.tokens
	}

	pub fn end_length(&self) -> usize {
		self.markers.end.len()
	}

	pub fn handle_match(
		&self,
		cx: &mut MatchContext<'_, '_>,
		position: usize,
		_token: usize,
	) -> ScaffoldResult<Handled> {
		let mut raw_path = Vec::new();
		let (position, found) =
			cx.cursor
				.scan_for_literal(position, &self.markers.end, true, Some(&mut raw_path))?;
		let path = cx.cursor.encoding().decode_lossy(&raw_path);
		let path = path.trim();

		if !found {
			return Err(ScaffoldError::IncludeUnavailable {
				path: path.to_string(),
				reason: "the include directive is not closed".to_string(),
			});
		}

		let mut reader = cx.run.open(path)?;
		let written = copy_without_bom(&mut reader, cx)?;
		tracing::debug!(path, written, "included file");

		Ok(Handled::rewritten(position, written))
	}
}

/// Stream `reader` into the target, dropping a leading byte-order mark.
fn copy_without_bom(reader: &mut dyn Read, cx: &mut MatchContext<'_, '_>) -> io::Result<usize> {
	let mut chunk = vec![0; COPY_CHUNK];
	let mut head = 0;

	// Read enough to recognize the longest byte-order mark.
	while head < 4 {
		match reader.read(&mut chunk[head..]) {
			Ok(0) => break,
			Ok(read) => head += read,
			Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
			Err(error) => return Err(error),
		}
	}

	let (_, bom_length) = TextEncoding::detect(&chunk[..head]);
	let mut written = cx.cursor.write(&chunk[bom_length..head])?;

	loop {
		match reader.read(&mut chunk) {
			Ok(0) => return Ok(written),
			Ok(read) => written += cx.cursor.write(&chunk[..read])?,
			Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
			Err(error) => return Err(error),
		}
	}
}
