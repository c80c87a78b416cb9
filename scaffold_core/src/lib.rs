//! `scaffold_core` is the streaming text processor behind the scaffold
//! template engine. It recognizes a set of byte-string tokens in an input
//! stream of any size and hands each match to the operation that owns the
//! token, all in a single pass over a fixed-size buffer.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Operation specs (JSON or Rust)
//!   → Compile (encode tokens for the file's encoding, merge into one trie, cached)
//!   → Stream cursor (fill buffer, detect BOM, write it through)
//!   → Trie evaluator (byte by byte, leftmost then longest match)
//!   → Operation (replace, skip, rewind the output, include a file, switch a flag)
//!   → Target (rewindable destination, flushed on a threshold)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Serde operation specs and JSON loading.
//! - [`expression`]: The condition language of conditional directives.
//!
//! ## Key Types
//!
//! - [`Processor`]: Validates an operation list and runs it over streams.
//! - [`RunContext`]: Flags, variables and the include file opener of a run.
//! - [`ByteTrie`]: Multi-pattern matcher with a streaming [`TrieEvaluator`].
//! - [`StreamCursor`]: Buffered source window with forward and backward
//!   scans.
//! - [`RewindableTarget`]: Destination that can be read back and truncated.
//!
//! ## Quick Start
//!
//! ```rust
//! use scaffold_core::ConditionalSpec;
//! use scaffold_core::Processor;
//! use scaffold_core::ReplacementSpec;
//! use scaffold_core::RunContext;
//!
//! let processor = Processor::new(vec![
//! 	ReplacementSpec::new("%NAME%", "Acme").into(),
//! 	ConditionalSpec::cpp_style().into(),
//! ])
//! .unwrap();
//!
//! let mut cx = RunContext::new().with_variable("greet", true);
//! let mut output = Vec::new();
//! let input = "#if greet\nHello %NAME%!\n#endif\n";
//! let modified = processor.run(input.as_bytes(), &mut output, &mut cx).unwrap();
//!
//! assert!(modified);
//! assert_eq!(output, b"Hello Acme!\n");
//! ```

pub use config::*;
pub use context::*;
pub use cursor::*;
pub use encoding::*;
pub use error::*;
pub use operations::TrackedPosition;
pub use processor::*;
pub use target::*;
pub use tokens::*;
pub use trie::*;

mod cache;
pub mod config;
mod context;
mod cursor;
mod encoding;
#[allow(unused_assignments)]
mod error;
pub mod expression;
pub(crate) mod operations;
mod processor;
mod target;
mod tokens;
mod trie;

#[cfg(test)]
mod __fixtures;
