/// A prefix tree over byte strings.
///
/// The trie is built once with [`ByteTrie::add_path`] and then only read.
/// Matching state lives in a [`TrieEvaluator`], so a single trie can be shared
/// by any number of concurrent evaluations.
#[derive(Debug, Clone)]
pub struct ByteTrie<T> {
	nodes: Vec<TrieNode<T>>,
	len: usize,
	max_length: usize,
	min_length: usize,
}

#[derive(Debug, Clone)]
struct TrieNode<T> {
	/// Sorted by byte.
	children: Vec<(u8, usize)>,
	terminal: Option<T>,
}

impl<T> TrieNode<T> {
	fn empty() -> Self {
		Self {
			children: Vec::new(),
			terminal: None,
		}
	}

	fn child(&self, byte: u8) -> Option<usize> {
		self.children
			.binary_search_by_key(&byte, |(key, _)| *key)
			.ok()
			.map(|index| self.children[index].1)
	}
}

impl<T> Default for ByteTrie<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> ByteTrie<T> {
	pub fn new() -> Self {
		Self {
			nodes: vec![TrieNode::empty()],
			len: 0,
			max_length: 0,
			min_length: 0,
		}
	}

	/// Insert `bytes` with the given terminal value.
	///
	/// Returns `false` when the path is empty or already ends in a terminal.
	/// In that case the earlier terminal is kept, so when two tokens share the
	/// exact same bytes the one registered first wins.
	pub fn add_path(&mut self, bytes: &[u8], terminal: T) -> bool {
		if bytes.is_empty() {
			return false;
		}

		let mut node = 0;
		for &byte in bytes {
			node = match self.nodes[node]
				.children
				.binary_search_by_key(&byte, |(key, _)| *key)
			{
				Ok(index) => self.nodes[node].children[index].1,
				Err(index) => {
					let child = self.nodes.len();
					self.nodes.push(TrieNode::empty());
					self.nodes[node].children.insert(index, (byte, child));
					child
				}
			};
		}

		if self.nodes[node].terminal.is_some() {
			return false;
		}

		self.nodes[node].terminal = Some(terminal);
		self.min_length = if self.len == 0 {
			bytes.len()
		} else {
			self.min_length.min(bytes.len())
		};
		self.max_length = self.max_length.max(bytes.len());
		self.len += 1;
		true
	}

	/// Number of distinct paths in the trie.
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Length of the longest path.
	pub fn max_length(&self) -> usize {
		self.max_length
	}

	/// Length of the shortest path.
	pub fn min_length(&self) -> usize {
		self.min_length
	}

	/// Find the longest path that starts exactly at `bytes[index]` and fits
	/// inside `bytes`. Returns the terminal and the matched length.
	pub fn match_at(&self, bytes: &[u8], index: usize) -> Option<(&T, usize)> {
		let mut node = 0;
		let mut best = None;

		for (offset, &byte) in bytes.get(index..)?.iter().enumerate() {
			let Some(child) = self.nodes[node].child(byte) else {
				break;
			};
			node = child;

			if let Some(terminal) = &self.nodes[node].terminal {
				best = Some((terminal, offset + 1));
			}
		}

		best
	}

	/// Start a streaming evaluation over this trie.
	pub fn evaluator(&self) -> TrieEvaluator<'_, T> {
		TrieEvaluator::new(self)
	}
}

/// A completed match reported by a [`TrieEvaluator`].
///
/// `start` and `end` are sequence numbers (byte offsets from the start of the
/// evaluated stream); `end` is exclusive.
#[derive(Debug)]
pub struct TerminalMatch<'t, T> {
	pub terminal: &'t T,
	pub start: u64,
	pub end: u64,
}

impl<T> TerminalMatch<'_, T> {
	pub fn len(&self) -> usize {
		(self.end - self.start) as usize
	}

	pub fn is_empty(&self) -> bool {
		self.end == self.start
	}
}

#[derive(Debug, Clone, Copy)]
struct Traversal {
	node: usize,
	start: u64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
	node: usize,
	start: u64,
	end: u64,
}

impl Candidate {
	/// Leftmost start wins, then the longest match at that start.
	fn beats(&self, other: &Candidate) -> bool {
		self.start < other.start || (self.start == other.start && self.end > other.end)
	}
}

/// Streaming matcher that accepts one byte at a time.
///
/// Several traversals may be open at once because a new match can begin at
/// every byte while an older one is still in progress. A terminal reached by
/// a traversal becomes a candidate; it is only reported once no open
/// traversal could still produce a better one (an earlier start, or a longer
/// match at the same start).
#[derive(Debug)]
pub struct TrieEvaluator<'t, T> {
	trie: &'t ByteTrie<T>,
	open: Vec<Traversal>,
	next: Vec<Traversal>,
	best: Option<Candidate>,
	next_sequence: u64,
}

impl<'t, T> TrieEvaluator<'t, T> {
	pub fn new(trie: &'t ByteTrie<T>) -> Self {
		Self {
			trie,
			open: Vec::new(),
			next: Vec::new(),
			best: None,
			next_sequence: 0,
		}
	}

	/// Feed the byte found at `sequence`.
	pub fn accept(&mut self, byte: u8, sequence: u64) -> Option<TerminalMatch<'t, T>> {
		let trie = self.trie;
		let nodes = &trie.nodes;
		self.next_sequence = sequence + 1;
		self.next.clear();

		let mut best = self.best;
		// Nothing starting here can beat a candidate that is already waiting.
		let fresh = best.is_none().then_some(Traversal {
			node: 0,
			start: sequence,
		});

		for traversal in self.open.iter().copied().chain(fresh) {
			let Some(node) = nodes[traversal.node].child(byte) else {
				continue;
			};

			if nodes[node].terminal.is_some() {
				let candidate = Candidate {
					node,
					start: traversal.start,
					end: sequence + 1,
				};

				if best.is_none_or(|current| candidate.beats(&current)) {
					best = Some(candidate);
				}
			}

			if !nodes[node].children.is_empty() {
				self.next.push(Traversal {
					node,
					start: traversal.start,
				});
			}
		}

		if let Some(candidate) = best {
			self.next.retain(|traversal| traversal.start <= candidate.start);
		}

		std::mem::swap(&mut self.open, &mut self.next);
		self.best = best;

		if self.open.is_empty() {
			return self.take_best();
		}

		None
	}

	/// Report the pending candidate, if any, at the end of the stream. No
	/// further bytes will arrive to extend the open traversals.
	pub fn finalize(&mut self) -> Option<TerminalMatch<'t, T>> {
		let found = self.take_best();
		self.open.clear();
		found
	}

	/// Drop every open traversal and pending candidate.
	pub fn reset(&mut self) {
		self.open.clear();
		self.best = None;
	}

	/// Whether a match is partially recognized.
	pub fn in_progress(&self) -> bool {
		!self.open.is_empty() || self.best.is_some()
	}

	/// The earliest sequence number that must still be buffered. When nothing
	/// is in progress this is the sequence after the last accepted byte.
	pub fn oldest_required_sequence(&self) -> u64 {
		self.open
			.iter()
			.map(|traversal| traversal.start)
			.chain(self.best.map(|candidate| candidate.start))
			.min()
			.unwrap_or(self.next_sequence)
	}

	fn take_best(&mut self) -> Option<TerminalMatch<'t, T>> {
		let candidate = self.best.take()?;
		self.open.clear();
		let terminal = self.trie.nodes[candidate.node].terminal.as_ref()?;

		Some(TerminalMatch {
			terminal,
			start: candidate.start,
			end: candidate.end,
		})
	}
}
