use std::collections::HashMap;
use std::hash::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::ByteTrie;
use crate::OperationSpec;
use crate::ScaffoldResult;
use crate::TextEncoding;
use crate::operations::Operation;

/// Identifies the token that completed a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OperationTerminal {
	/// Index into the operation list.
	pub operation: usize,
	/// Index into the operation's tokens.
	pub token: usize,
	/// The significant span of the token.
	pub start: usize,
	pub end: usize,
}

/// Operations with their tokens encoded for one encoding, merged into a
/// single trie.
#[derive(Debug)]
pub(crate) struct CompiledOperations {
	specs: Arc<[OperationSpec]>,
	trie: ByteTrie<OperationTerminal>,
	operations: Vec<Operation>,
}

impl CompiledOperations {
	pub fn compile(specs: Arc<[OperationSpec]>, encoding: TextEncoding) -> ScaffoldResult<Self> {
		let operations = specs
			.iter()
			.map(|spec| Operation::compile(spec, encoding))
			.collect::<ScaffoldResult<Vec<_>>>()?;

		let mut trie = ByteTrie::new();
		for (operation_index, operation) in operations.iter().enumerate() {
			for (token_index, token) in operation.tokens().iter().enumerate() {
				let terminal = OperationTerminal {
					operation: operation_index,
					token: token_index,
					start: token.start(),
					end: token.end(),
				};

				if !trie.add_path(token.bytes(), terminal) {
					tracing::debug!(
						operation = specs[operation_index].label(),
						token = %token,
						"token is already registered, the earlier operation handles it"
					);
				}
			}
		}

		Ok(Self {
			specs,
			trie,
			operations,
		})
	}

	pub fn trie(&self) -> &ByteTrie<OperationTerminal> {
		&self.trie
	}

	pub fn operations(&self) -> &[Operation] {
		&self.operations
	}

	/// Bytes the buffer must hold at once for every operation to work.
	pub fn max_token_length(&self) -> usize {
		self.operations
			.iter()
			.map(Operation::lookahead_length)
			.max()
			.unwrap_or(0)
	}
}

type CacheKey = (u64, TextEncoding);

static COMPILED: LazyLock<RwLock<HashMap<CacheKey, Arc<CompiledOperations>>>> =
	LazyLock::new(RwLock::default);

/// Structural hash of an operation list.
pub(crate) fn fingerprint(specs: &[OperationSpec]) -> u64 {
	let mut hasher = DefaultHasher::new();
	specs.hash(&mut hasher);
	hasher.finish()
}

/// Get the compiled form of `specs` for `encoding`, compiling it on first
/// use. Equal operation lists share one compiled instance for the lifetime
/// of the process.
pub(crate) fn compiled(
	specs: &Arc<[OperationSpec]>,
	fingerprint: u64,
	encoding: TextEncoding,
) -> ScaffoldResult<Arc<CompiledOperations>> {
	let key = (fingerprint, encoding);

	{
		let cache = COMPILED.read().unwrap_or_else(PoisonError::into_inner);
		if let Some(entry) = cache.get(&key) {
			if entry.specs == *specs {
				tracing::debug!(%encoding, "reusing compiled operations");
				return Ok(Arc::clone(entry));
			}

			// A fingerprint collision: compile without caching.
			return Ok(Arc::new(CompiledOperations::compile(Arc::clone(specs), encoding)?));
		}
	}

	let compiled = Arc::new(CompiledOperations::compile(Arc::clone(specs), encoding)?);
	let mut cache = COMPILED.write().unwrap_or_else(PoisonError::into_inner);
	let entry = cache.entry(key).or_insert(compiled);

	Ok(Arc::clone(entry))
}
