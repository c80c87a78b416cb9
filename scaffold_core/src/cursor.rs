use std::io;
use std::io::Read;
use std::sync::Arc;

use memchr::memmem;

use crate::ByteTrie;
use crate::RewindableTarget;
use crate::TextEncoding;

/// The smallest buffer that can hold any byte-order mark.
pub const MIN_BUFFER_SIZE: usize = 4;

/// Bytes read back from the target per step when scanning backward.
const BACKWARD_WINDOW: u64 = 4096;

/// Bytes of context on either side of a failure included in diagnostics.
const SNIPPET_RADIUS: usize = 32;

/// End-of-line and whitespace tokens in one encoding.
#[derive(Debug)]
pub struct LineMarkers {
	pub eol: ByteTrie<()>,
	pub whitespace: ByteTrie<()>,
}

impl LineMarkers {
	pub fn new(encoding: TextEncoding) -> Self {
		let mut eol = ByteTrie::new();
		for text in ["\r\n", "\n", "\r"] {
			eol.add_path(&encoding.encode(text), ());
		}

		let mut whitespace = ByteTrie::new();
		for text in [" ", "\t"] {
			whitespace.add_path(&encoding.encode(text), ());
		}

		Self { eol, whitespace }
	}

	pub fn max_length(&self) -> usize {
		self.eol.max_length().max(self.whitespace.max_length())
	}
}

/// A fixed-size window over the source stream paired with the destination.
///
/// Positions handed to and returned from the cursor's methods are indexes
/// into the current buffer. Every method that may refill the buffer returns
/// the updated position; positions held from before a refill are stale.
/// Sequence numbers count bytes from the start of the source and survive
/// refills.
pub struct StreamCursor<'io> {
	source: &'io mut dyn Read,
	target: &'io mut dyn RewindableTarget,
	buffer: Vec<u8>,
	length: usize,
	base_sequence: u64,
	source_exhausted: bool,
	encoding: TextEncoding,
	bom_length: usize,
	target_floor: u64,
	flush_threshold: usize,
	written_since_flush: usize,
	markers: Arc<LineMarkers>,
}

impl std::fmt::Debug for StreamCursor<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StreamCursor")
			.field("capacity", &self.buffer.len())
			.field("length", &self.length)
			.field("base_sequence", &self.base_sequence)
			.field("encoding", &self.encoding)
			.field("bom_length", &self.bom_length)
			.finish_non_exhaustive()
	}
}

impl<'io> StreamCursor<'io> {
	/// Read the first buffer, detect the encoding and copy the byte-order
	/// mark straight to the target.
	pub fn new(
		source: &'io mut dyn Read,
		target: &'io mut dyn RewindableTarget,
		buffer_size: usize,
		flush_threshold: usize,
	) -> io::Result<Self> {
		let target_origin = target.written_len()?;
		let mut cursor = Self {
			source,
			target,
			buffer: vec![0; buffer_size.max(MIN_BUFFER_SIZE)],
			length: 0,
			base_sequence: 0,
			source_exhausted: false,
			encoding: TextEncoding::default(),
			bom_length: 0,
			target_floor: target_origin,
			flush_threshold,
			written_since_flush: 0,
			markers: Arc::new(LineMarkers::new(TextEncoding::default())),
		};

		cursor.fill()?;
		let (encoding, bom_length) = TextEncoding::detect(&cursor.buffer[..cursor.length]);

		if bom_length > 0 {
			cursor.target.write_all(&cursor.buffer[..bom_length])?;
			cursor.target_floor += bom_length as u64;
			cursor.record_written(bom_length)?;
		}

		if encoding != TextEncoding::default() {
			cursor.markers = Arc::new(LineMarkers::new(encoding));
		}

		cursor.encoding = encoding;
		cursor.bom_length = bom_length;

		Ok(cursor)
	}

	pub fn encoding(&self) -> TextEncoding {
		self.encoding
	}

	/// Length of the byte-order mark at the start of the source.
	pub fn bom_length(&self) -> usize {
		self.bom_length
	}

	pub fn markers(&self) -> Arc<LineMarkers> {
		Arc::clone(&self.markers)
	}

	pub fn capacity(&self) -> usize {
		self.buffer.len()
	}

	/// Number of valid bytes in the buffer.
	pub fn len(&self) -> usize {
		self.length
	}

	pub fn is_empty(&self) -> bool {
		self.length == 0
	}

	pub fn byte_at(&self, position: usize) -> u8 {
		self.buffer[position]
	}

	pub fn sequence_at(&self, position: usize) -> u64 {
		self.base_sequence + position as u64
	}

	/// Buffer position of a sequence number that is still buffered.
	pub fn position_of(&self, sequence: u64) -> usize {
		debug_assert!(sequence >= self.base_sequence, "sequence {sequence} was discarded");
		(sequence.saturating_sub(self.base_sequence)) as usize
	}

	/// Grow the buffer so that it holds at least `capacity` bytes and top it
	/// up from the source.
	pub fn ensure_capacity(&mut self, capacity: usize) -> io::Result<()> {
		if self.buffer.len() < capacity {
			self.buffer.resize(capacity, 0);
			self.fill()?;
		}

		Ok(())
	}

	/// Slide the bytes from `retain_from` to the head of the buffer and read
	/// more from the source behind them.
	///
	/// Returns `false` when the source produced no new bytes. The retained
	/// bytes stay available either way and start at position zero.
	pub fn advance_buffer(&mut self, retain_from: usize) -> io::Result<bool> {
		let retain_from = retain_from.min(self.length);
		self.buffer.copy_within(retain_from..self.length, 0);
		self.length -= retain_from;
		self.base_sequence += retain_from as u64;

		Ok(self.fill()? > 0)
	}

	/// Make sure `needed` bytes from `position` are buffered when the source
	/// still has them. Returns the (possibly moved) position.
	pub fn ensure_available(&mut self, position: usize, needed: usize) -> io::Result<usize> {
		if self.length - position >= needed || self.source_exhausted {
			return Ok(position);
		}

		self.advance_buffer(position)?;
		Ok(0)
	}

	fn fill(&mut self) -> io::Result<usize> {
		let mut total = 0;

		while !self.source_exhausted && self.length < self.buffer.len() {
			match self.source.read(&mut self.buffer[self.length..]) {
				Ok(0) => self.source_exhausted = true,
				Ok(read) => {
					self.length += read;
					total += read;
				}
				Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
				Err(error) => return Err(error),
			}
		}

		Ok(total)
	}

	/// Write bytes to the target. Returns how many were written so callers
	/// can report them for flush accounting.
	pub fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
		self.target.write_all(bytes)?;
		Ok(bytes.len())
	}

	/// Write the buffered bytes in `[from, to)` to the target.
	pub fn write_range(&mut self, from: usize, to: usize) -> io::Result<usize> {
		if to <= from {
			return Ok(0);
		}

		self.target.write_all(&self.buffer[from..to])?;
		Ok(to - from)
	}

	/// Account for bytes written since the last flush and flush the target
	/// once the threshold is exceeded.
	pub fn record_written(&mut self, written: usize) -> io::Result<()> {
		self.written_since_flush += written;

		if self.written_since_flush > self.flush_threshold {
			self.target.flush()?;
			self.written_since_flush = 0;
		}

		Ok(())
	}

	/// Flush unconditionally at the end of a run.
	pub fn finish(&mut self) -> io::Result<()> {
		self.target.flush()?;
		self.written_since_flush = 0;
		Ok(())
	}

	/// Current length of the target.
	pub fn target_len(&mut self) -> io::Result<u64> {
		self.target.written_len()
	}

	/// Scan the already written output backward for the last token of
	/// `trie` and truncate the target right after it, or at its start when
	/// `consume` is set. Without a match the output is cut back to the
	/// byte-order mark. Returns whether a token was found.
	pub fn seek_back_until<T>(&mut self, trie: &ByteTrie<T>, consume: bool) -> io::Result<bool> {
		let end = self.target.written_len()?;
		let floor = self.target_floor;

		if end <= floor {
			return Ok(false);
		}

		let overlap = trie.max_length().saturating_sub(1) as u64;
		let mut window = Vec::new();
		// Matches starting at or after this offset have been examined.
		let mut scanned_from = end;

		while scanned_from > floor && !trie.is_empty() {
			let window_start = scanned_from.saturating_sub(BACKWARD_WINDOW).max(floor);
			let window_end = (scanned_from + overlap).min(end);
			window.resize((window_end - window_start) as usize, 0);
			self.target.read_at(window_start, &mut window)?;

			// The match that ends last wins, then the longest one.
			let mut found: Option<(usize, usize)> = None;
			for index in (0..(scanned_from - window_start) as usize).rev() {
				let Some((_, length)) = trie.match_at(&window, index) else {
					continue;
				};

				if found.is_none_or(|(start, len)| index + length >= start + len) {
					found = Some((index, length));
				}
			}

			if let Some((index, length)) = found {
				let keep = if consume { index } else { index + length };
				self.target.truncate_to(window_start + keep as u64)?;
				return Ok(true);
			}

			scanned_from = window_start;
		}

		self.target.truncate_to(floor)?;
		Ok(false)
	}

	/// Remove a maximal run of `trie` tokens from the end of the output.
	/// Returns the number of bytes removed.
	pub fn seek_back_while<T>(&mut self, trie: &ByteTrie<T>) -> io::Result<u64> {
		let mut removed = 0;
		let mut window = vec![0; trie.max_length()];

		loop {
			let end = self.target.written_len()?;
			let available = end.saturating_sub(self.target_floor).min(window.len() as u64) as usize;

			if available == 0 {
				break;
			}

			let tail = &mut window[..available];
			self.target.read_at(end - available as u64, tail)?;

			let suffix = (0..available).find(|&index| {
				trie.match_at(tail, index)
					.is_some_and(|(_, length)| index + length == available)
			});

			let Some(index) = suffix else {
				break;
			};

			let cut = (available - index) as u64;
			self.target.truncate_to(end - cut)?;
			removed += cut;
		}

		Ok(removed)
	}

	/// Remove everything written since the last end of line, keeping the end
	/// of line itself.
	pub fn trim_back_to_previous_eol(&mut self) -> io::Result<bool> {
		let markers = self.markers();
		self.seek_back_until(&markers.eol, false)
	}

	/// Whether the output written in this run is empty or ends with an end
	/// of line.
	pub fn at_line_start(&mut self) -> io::Result<bool> {
		let markers = self.markers();
		let end = self.target.written_len()?;
		let available = end
			.saturating_sub(self.target_floor)
			.min(markers.eol.max_length() as u64) as usize;

		if available == 0 {
			return Ok(true);
		}

		let mut tail = vec![0; available];
		self.target.read_at(end - available as u64, &mut tail)?;

		Ok((0..available).any(|index| {
			markers
				.eol
				.match_at(&tail, index)
				.is_some_and(|(_, length)| index + length == available)
		}))
	}

	/// Remove trailing spaces and tabs from the output.
	pub fn trim_back_whitespace(&mut self) -> io::Result<u64> {
		let markers = self.markers();
		self.seek_back_while(&markers.whitespace)
	}

	/// Skip source bytes until a token of `trie` is found. Returns the
	/// position of the token (after it when `consume` is set) and its
	/// terminal, or the end of the source and `None`.
	pub fn seek_forward_until<T: Copy>(
		&mut self,
		trie: &ByteTrie<T>,
		position: usize,
		consume: bool,
	) -> io::Result<(usize, Option<T>)> {
		self.scan_forward(trie, position, consume, None)
	}

	/// Skip source bytes through the next token of `trie`.
	pub fn seek_forward_through<T: Copy>(
		&mut self,
		trie: &ByteTrie<T>,
		position: usize,
	) -> io::Result<(usize, Option<T>)> {
		self.scan_forward(trie, position, true, None)
	}

	/// Like [`StreamCursor::seek_forward_until`], collecting the bytes in
	/// front of the token into `out`.
	pub fn read_until<T: Copy>(
		&mut self,
		trie: &ByteTrie<T>,
		position: usize,
		consume: bool,
		out: &mut Vec<u8>,
	) -> io::Result<(usize, Option<T>)> {
		self.scan_forward(trie, position, consume, Some(out))
	}

	/// Skip a maximal run of `trie` tokens starting at `position`.
	pub fn seek_forward_while<T>(&mut self, trie: &ByteTrie<T>, position: usize) -> io::Result<usize> {
		let mut position = position;

		loop {
			position = self.ensure_available(position, trie.max_length())?;

			match trie.match_at(&self.buffer[..self.length], position) {
				Some((_, length)) => position += length,
				None => return Ok(position),
			}
		}
	}

	/// Skip the rest of the current line, end of line included.
	pub fn consume_through_eol(&mut self, position: usize) -> io::Result<usize> {
		let markers = self.markers();
		let (position, _) = self.seek_forward_through(&markers.eol, position)?;
		Ok(position)
	}

	/// Collect the rest of the current line into `out` (without the end of
	/// line) and skip past it.
	pub fn read_line(&mut self, position: usize, out: &mut Vec<u8>) -> io::Result<usize> {
		let markers = self.markers();
		let (position, _) = self.read_until(&markers.eol, position, true, out)?;
		Ok(position)
	}

	fn scan_forward<T: Copy>(
		&mut self,
		trie: &ByteTrie<T>,
		position: usize,
		consume: bool,
		mut collect: Option<&mut Vec<u8>>,
	) -> io::Result<(usize, Option<T>)> {
		let mut evaluator = trie.evaluator();
		let mut position = position;
		// Bytes before `mark` have been collected or dropped.
		let mut mark = position;

		loop {
			while position < self.length {
				let sequence = self.sequence_at(position);
				let byte = self.buffer[position];
				position += 1;

				if let Some(found) = evaluator.accept(byte, sequence) {
					let start = self.position_of(found.start);
					let end = self.position_of(found.end);

					if let Some(out) = collect.as_deref_mut() {
						out.extend_from_slice(&self.buffer[mark..start]);
					}

					return Ok((if consume { end } else { start }, Some(*found.terminal)));
				}
			}

			let retain_from = if evaluator.in_progress() {
				self.position_of(evaluator.oldest_required_sequence())
			} else {
				position
			}
			.max(mark);

			if let Some(out) = collect.as_deref_mut() {
				out.extend_from_slice(&self.buffer[mark..retain_from]);
			}

			let refilled = self.advance_buffer(retain_from)?;
			position -= retain_from;
			mark = 0;

			if !refilled {
				if let Some(found) = evaluator.finalize() {
					let start = self.position_of(found.start);
					let end = self.position_of(found.end);

					if let Some(out) = collect.as_deref_mut() {
						out.extend_from_slice(&self.buffer[mark..start]);
					}

					return Ok((if consume { end } else { start }, Some(*found.terminal)));
				}

				if let Some(out) = collect.as_deref_mut() {
					out.extend_from_slice(&self.buffer[mark..self.length]);
				}

				return Ok((self.length, None));
			}
		}
	}

	/// Plain substring scan for `needle` from `position`, refilling as
	/// needed. Returns the position of the needle (after it when `consume` is
	/// set) and whether it was found; when it is not, the whole remaining
	/// source has been skipped. Skipped bytes are collected into `collect`.
	pub fn scan_for_literal(
		&mut self,
		position: usize,
		needle: &[u8],
		consume: bool,
		mut collect: Option<&mut Vec<u8>>,
	) -> io::Result<(usize, bool)> {
		let mut position = position;

		loop {
			if let Some(offset) = memmem::find(&self.buffer[position..self.length], needle) {
				let start = position + offset;

				if let Some(out) = collect.as_deref_mut() {
					out.extend_from_slice(&self.buffer[position..start]);
				}

				return Ok((if consume { start + needle.len() } else { start }, true));
			}

			// A needle split across the refill starts in the last
			// `needle.len() - 1` bytes.
			let retain_from = self
				.length
				.saturating_sub(needle.len().saturating_sub(1))
				.max(position);

			if let Some(out) = collect.as_deref_mut() {
				out.extend_from_slice(&self.buffer[position..retain_from]);
			}

			let refilled = self.advance_buffer(retain_from)?;
			position = 0;

			if !refilled {
				if let Some(out) = collect.as_deref_mut() {
					out.extend_from_slice(&self.buffer[..self.length]);
				}

				return Ok((self.length, false));
			}
		}
	}

	/// Decoded text around a sequence number, for diagnostics.
	pub fn snippet_around(&self, sequence: u64) -> String {
		let center = (sequence.saturating_sub(self.base_sequence) as usize).min(self.length);
		let unit = self.encoding.unit_size();
		// Keep the window aligned to code units.
		let start = center.saturating_sub(SNIPPET_RADIUS) / unit * unit;
		let end = (center + SNIPPET_RADIUS).min(self.length);
		let end = start + (end - start) / unit * unit;

		self.encoding.decode_lossy(&self.buffer[start..end])
	}
}
