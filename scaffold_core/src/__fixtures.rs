use std::io;
use std::io::Write;

use crate::*;

/// Buffer sizes every streaming behaviour must be independent of. The last
/// one holds any test input at once.
pub const BUFFER_SIZES: [usize; 4] = [4, 16, 1024, 64 * 1024];

pub fn name_replacement(replacement: &str) -> OperationSpec {
	ReplacementSpec::new("%NAME%", replacement).into()
}

pub fn processor(specs: Vec<OperationSpec>) -> Processor {
	Processor::new(specs).unwrap_or_else(|e| panic!("invalid operations: {e}"))
}

pub fn template_processor() -> Processor {
	processor(vec![
		name_replacement("Acme"),
		ConditionalSpec::cpp_style().into(),
	])
}

pub fn variables(pairs: &[(&str, bool)]) -> RunContext {
	pairs
		.iter()
		.fold(RunContext::new(), |cx, (name, value)| cx.with_variable(*name, *value))
}

/// Run `input` through `processor` with the given buffer size.
pub fn process_bytes(
	processor: &Processor,
	input: &[u8],
	cx: &mut RunContext,
	buffer_size: usize,
) -> ScaffoldResult<(Vec<u8>, RunReport)> {
	let mut output = Vec::new();
	let options = RunOptions::default().with_buffer_size(buffer_size);
	let report = processor.run_with_options(input, &mut output, cx, &options)?;

	Ok((output, report))
}

pub fn process_str(
	processor: &Processor,
	input: &str,
	cx: &mut RunContext,
	buffer_size: usize,
) -> ScaffoldResult<(String, bool)> {
	let (output, report) = process_bytes(processor, input.as_bytes(), cx, buffer_size)?;
	let output = String::from_utf8(output).unwrap_or_else(|e| panic!("output is not utf-8: {e}"));

	Ok((output, report.modified))
}

pub fn utf16le_with_bom(text: &str) -> Vec<u8> {
	let mut bytes = TextEncoding::Utf16Le.bom().to_vec();
	bytes.extend(TextEncoding::Utf16Le.encode(text));
	bytes
}

/// A rewindable target that counts flushes.
#[derive(Debug, Default)]
pub struct CountingTarget {
	pub bytes: Vec<u8>,
	pub flushes: usize,
}

impl Write for CountingTarget {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.bytes.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.flushes += 1;
		Ok(())
	}
}

impl RewindableTarget for CountingTarget {
	fn written_len(&mut self) -> io::Result<u64> {
		self.bytes.written_len()
	}

	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		self.bytes.read_at(offset, buf)
	}

	fn truncate_to(&mut self, len: u64) -> io::Result<()> {
		self.bytes.truncate_to(len)
	}
}
