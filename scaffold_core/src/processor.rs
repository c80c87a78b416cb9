use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::OperationSpec;
use crate::RewindableTarget;
use crate::RunContext;
use crate::ScaffoldConfig;
use crate::ScaffoldError;
use crate::ScaffoldResult;
use crate::SpooledTarget;
use crate::StreamCursor;
use crate::TextEncoding;
use crate::Token;
use crate::cache;
use crate::cache::CompiledOperations;
use crate::cache::OperationTerminal;
use crate::operations::MatchContext;
use crate::operations::Operation;
use crate::operations::TrackedPosition;

/// Default size of the read buffer (8 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Default number of bytes written between flushes of the target (8 MiB).
pub const DEFAULT_FLUSH_THRESHOLD: usize = 8 * 1024 * 1024;

/// Per-run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
	pub buffer_size: usize,
	pub flush_threshold: usize,
	/// Name of the processed file, used in error messages.
	pub file: Option<PathBuf>,
}

impl Default for RunOptions {
	fn default() -> Self {
		Self {
			buffer_size: DEFAULT_BUFFER_SIZE,
			flush_threshold: DEFAULT_FLUSH_THRESHOLD,
			file: None,
		}
	}
}

impl RunOptions {
	#[must_use]
	pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
		self.buffer_size = buffer_size;
		self
	}

	#[must_use]
	pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
		self.flush_threshold = flush_threshold;
		self
	}

	#[must_use]
	pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
		self.file = Some(file.into());
		self
	}
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
	/// Whether the output differs from the input.
	pub modified: bool,
	pub encoding: TextEncoding,
	/// Offsets recorded by position trackers, in match order.
	pub tracked: Vec<TrackedPosition>,
}

/// Applies a fixed list of operations to streams.
///
/// The processor itself is immutable and cheap to clone; the compiled tries
/// are shared through a process-wide cache and all per-file state is created
/// for each run.
#[derive(Debug, Clone)]
pub struct Processor {
	specs: Arc<[OperationSpec]>,
	fingerprint: u64,
}

impl Processor {
	/// Validate the operations. Configuration errors surface here, before
	/// any input is read.
	pub fn new(specs: Vec<OperationSpec>) -> ScaffoldResult<Self> {
		for spec in &specs {
			spec.validate()?;
		}

		let fingerprint = cache::fingerprint(&specs);

		Ok(Self {
			specs: Arc::from(specs),
			fingerprint,
		})
	}

	pub fn from_config(config: &ScaffoldConfig) -> ScaffoldResult<Self> {
		Self::new(config.operations.clone())
	}

	pub fn specs(&self) -> &[OperationSpec] {
		&self.specs
	}

	/// The tokens watched for in files of `encoding`, labelled with their
	/// operation.
	pub fn tokens(&self, encoding: TextEncoding) -> ScaffoldResult<Vec<(String, Token)>> {
		let compiled = self.compiled(encoding)?;
		let tokens = compiled
			.operations()
			.iter()
			.zip(self.specs.iter())
			.flat_map(|(operation, spec)| {
				operation
					.tokens()
					.iter()
					.map(move |token| (spec.label().to_string(), token.clone()))
			})
			.collect();

		Ok(tokens)
	}

	pub(crate) fn compiled(&self, encoding: TextEncoding) -> ScaffoldResult<Arc<CompiledOperations>> {
		cache::compiled(&self.specs, self.fingerprint, encoding)
	}

	/// Process `source` into `target` with the default buffer size and flush
	/// threshold. Returns whether anything was changed.
	pub fn run(
		&self,
		source: impl Read,
		target: impl RewindableTarget,
		cx: &mut RunContext,
	) -> ScaffoldResult<bool> {
		let report = self.run_with_options(source, target, cx, &RunOptions::default())?;
		Ok(report.modified)
	}

	/// Process into a writer that cannot be rewound by spooling the output in
	/// memory and copying it at the end.
	pub fn run_to_writer(
		&self,
		source: impl Read,
		mut writer: impl Write,
		cx: &mut RunContext,
		options: &RunOptions,
	) -> ScaffoldResult<RunReport> {
		let mut spooled = SpooledTarget::new();
		let report = self.run_with_options(source, &mut spooled, cx, options)?;
		spooled.copy_to(&mut writer)?;

		Ok(report)
	}

	/// Process the file at `input` into the file at `output`.
	///
	/// When both paths name the same file the output is spooled in memory and
	/// written once the input has been read in full.
	pub fn process_file(
		&self,
		input: impl AsRef<Path>,
		output: impl AsRef<Path>,
		cx: &mut RunContext,
		options: &RunOptions,
	) -> ScaffoldResult<RunReport> {
		let input = input.as_ref();
		let output = output.as_ref();

		let mut options = options.clone();
		if options.file.is_none() {
			options.file = Some(input.to_path_buf());
		}

		let source = File::open(input)?;

		if is_same_file(input, output)? {
			tracing::debug!(file = %input.display(), "rewriting file in place");
			let mut spooled = SpooledTarget::new();
			let report = self.run_with_options(source, &mut spooled, cx, &options)?;
			fs::write(output, spooled.into_inner())?;

			return Ok(report);
		}

		let target = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(true)
			.open(output)?;

		self.run_with_options(source, target, cx, &options)
	}

	pub fn run_with_options(
		&self,
		mut source: impl Read,
		mut target: impl RewindableTarget,
		cx: &mut RunContext,
		options: &RunOptions,
	) -> ScaffoldResult<RunReport> {
		let mut cursor = StreamCursor::new(
			&mut source,
			&mut target,
			options.buffer_size,
			options.flush_threshold,
		)?;
		let encoding = cursor.encoding();
		let compiled = self.compiled(encoding)?;
		let lookahead = compiled
			.max_token_length()
			.max(cursor.markers().max_length());
		cursor.ensure_capacity(lookahead + 1)?;
		self.seed_flags(cx);

		tracing::debug!(
			%encoding,
			operations = self.specs.len(),
			capacity = cursor.capacity(),
			"processing stream"
		);

		let mut run = Run {
			processor: self,
			options,
			operations: compiled.operations().to_vec(),
			tracked: Vec::new(),
			modified: false,
		};
		let mut evaluator = compiled.trie().evaluator();
		let mut position = cursor.bom_length();
		let mut last_written = position;

		loop {
			while position < cursor.len() {
				let sequence = cursor.sequence_at(position);
				let byte = cursor.byte_at(position);
				position += 1;

				let Some(found) = evaluator.accept(byte, sequence) else {
					continue;
				};

				let terminal = *found.terminal;
				let start = cursor.position_of(found.start);
				evaluator.reset();
				position = run.dispatch(&mut cursor, cx, last_written, start, terminal)?;
				last_written = position;
			}

			// Everything in front of the oldest partial match can go out.
			let retain_from = if evaluator.in_progress() {
				cursor.position_of(evaluator.oldest_required_sequence())
			} else {
				position
			}
			.max(last_written);
			let written = cursor.write_range(last_written, retain_from)?;
			cursor.record_written(written)?;

			let refilled = cursor.advance_buffer(retain_from)?;
			position -= retain_from;
			last_written = 0;

			if refilled {
				continue;
			}

			if let Some(found) = evaluator.finalize() {
				let terminal = *found.terminal;
				let start = cursor.position_of(found.start);
				evaluator.reset();
				position = run.dispatch(&mut cursor, cx, last_written, start, terminal)?;
				last_written = position;
				continue;
			}

			let written = cursor.write_range(last_written, cursor.len())?;
			cursor.record_written(written)?;
			break;
		}

		cursor.finish()?;
		tracing::debug!(modified = run.modified, "finished processing stream");

		Ok(RunReport {
			modified: run.modified,
			encoding,
			tracked: run.tracked,
		})
	}

	/// Give every operation flag and `set_flag` default its initial value
	/// unless the caller already chose one.
	fn seed_flags(&self, cx: &mut RunContext) {
		for spec in self.specs.iter() {
			if let Some(id) = spec.id() {
				cx.flags
					.entry(id.to_string())
					.or_insert(spec.on_by_default());
			}

			if let OperationSpec::SetFlag(set_flag) = spec {
				if let Some(default) = set_flag.default {
					cx.flags.entry(set_flag.name.clone()).or_insert(default);
				}
			}
		}
	}
}

/// Whether `output` already exists and is the same file as `input`.
fn is_same_file(input: &Path, output: &Path) -> io::Result<bool> {
	if !output.exists() {
		return Ok(false);
	}

	Ok(fs::canonicalize(input)? == fs::canonicalize(output)?)
}

/// Mutable state of one run.
struct Run<'p> {
	processor: &'p Processor,
	options: &'p RunOptions,
	operations: Vec<Operation>,
	tracked: Vec<TrackedPosition>,
	modified: bool,
}

impl Run<'_> {
	/// Write the text in front of a match and hand the match to its
	/// operation. Returns the position to resume scanning from.
	fn dispatch(
		&mut self,
		cursor: &mut StreamCursor<'_>,
		cx: &mut RunContext,
		last_written: usize,
		start: usize,
		terminal: OperationTerminal,
	) -> ScaffoldResult<usize> {
		let spec = &self.processor.specs[terminal.operation];
		let significant_start = start + terminal.start;
		let handoff = start + terminal.end;
		let offset = cursor.sequence_at(significant_start);

		let written = cursor.write_range(last_written, significant_start)?;
		cursor.record_written(written)?;

		if spec.id().is_some_and(|id| !cx.flags.is_enabled(id)) {
			tracing::trace!(operation = spec.label(), offset, "operation disabled, token kept");
			let written = cursor.write_range(significant_start, handoff)?;
			cursor.record_written(written)?;
			return Ok(handoff);
		}

		tracing::trace!(operation = spec.label(), offset, "token matched");

		let mut context = MatchContext {
			cursor: &mut *cursor,
			run: &mut *cx,
			tracked: &mut self.tracked,
		};
		let result =
			self.operations[terminal.operation].handle_match(&mut context, handoff, terminal.token);

		let handled = match result {
			Ok(handled) => handled,
			Err(source) => {
				return Err(ScaffoldError::ContentGeneration {
					file: self
						.options
						.file
						.as_ref()
						.map_or_else(|| "<stream>".to_string(), |file| file.display().to_string()),
					operation: spec.label().to_string(),
					offset,
					snippet: cursor.snippet_around(offset),
					source: Box::new(source),
				});
			}
		};

		cursor.record_written(handled.written)?;
		self.modified |= handled.modified;

		Ok(handled.position)
	}
}
