use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

/// A destination that can be appended to, read back and truncated.
///
/// Operations that un-emit output (trimming a directive line, removing
/// trailing whitespace) scan backward over what was already written and cut
/// the destination short. Plain sinks such as sockets cannot do that; wrap
/// them in a [`SpooledTarget`] and copy the result out at the end.
pub trait RewindableTarget: Write {
	/// Total number of bytes currently held by the destination.
	fn written_len(&mut self) -> io::Result<u64>;

	/// Fill `buf` with the bytes starting at `offset`. The write position is
	/// left at the end of the destination.
	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

	/// Discard everything from `len` onward and continue writing there.
	fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl RewindableTarget for Vec<u8> {
	fn written_len(&mut self) -> io::Result<u64> {
		Ok(self.len() as u64)
	}

	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		let start = usize::try_from(offset).map_err(io::Error::other)?;
		let slice = self
			.get(start..start + buf.len())
			.ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
		buf.copy_from_slice(slice);
		Ok(())
	}

	fn truncate_to(&mut self, len: u64) -> io::Result<()> {
		let len = usize::try_from(len).map_err(io::Error::other)?;
		self.truncate(len);
		Ok(())
	}
}

impl RewindableTarget for File {
	fn written_len(&mut self) -> io::Result<u64> {
		self.stream_position()
	}

	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		let end = self.stream_position()?;
		self.seek(SeekFrom::Start(offset))?;
		let result = self.read_exact(buf);
		self.seek(SeekFrom::Start(end))?;
		result
	}

	fn truncate_to(&mut self, len: u64) -> io::Result<()> {
		self.flush()?;
		self.set_len(len)?;
		self.seek(SeekFrom::Start(len))?;
		Ok(())
	}
}

impl<T: RewindableTarget + ?Sized> RewindableTarget for &mut T {
	fn written_len(&mut self) -> io::Result<u64> {
		(**self).written_len()
	}

	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		(**self).read_at(offset, buf)
	}

	fn truncate_to(&mut self, len: u64) -> io::Result<()> {
		(**self).truncate_to(len)
	}
}

/// In-memory target that is copied to a plain writer once processing ends.
#[derive(Debug, Default, Clone)]
pub struct SpooledTarget {
	buffer: Vec<u8>,
}

impl SpooledTarget {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.buffer
	}

	pub fn into_inner(self) -> Vec<u8> {
		self.buffer
	}

	/// Copy the spooled bytes to `writer` and flush it.
	pub fn copy_to(&self, writer: &mut impl Write) -> io::Result<u64> {
		writer.write_all(&self.buffer)?;
		writer.flush()?;
		Ok(self.buffer.len() as u64)
	}
}

impl Write for SpooledTarget {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl RewindableTarget for SpooledTarget {
	fn written_len(&mut self) -> io::Result<u64> {
		self.buffer.written_len()
	}

	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		self.buffer.read_at(offset, buf)
	}

	fn truncate_to(&mut self, len: u64) -> io::Result<()> {
		self.buffer.truncate_to(len)
	}
}
