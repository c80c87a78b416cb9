use serde::Deserialize;
use serde::Serialize;

/// The text encoding of a processed file, detected from its byte-order mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
	#[default]
	#[serde(rename = "utf-8")]
	Utf8,
	#[serde(rename = "utf-16le")]
	Utf16Le,
	#[serde(rename = "utf-16be")]
	Utf16Be,
	#[serde(rename = "utf-32le")]
	Utf32Le,
	#[serde(rename = "utf-32be")]
	Utf32Be,
}

impl TextEncoding {
	/// Detect the encoding from the first bytes of a stream. Returns the
	/// encoding and the length of the byte-order mark (zero when there is
	/// none). Streams without a recognized mark are treated as UTF-8.
	pub fn detect(bytes: &[u8]) -> (Self, usize) {
		// UTF-32LE must be checked before UTF-16LE, they share a prefix.
		match bytes {
			[0xFF, 0xFE, 0x00, 0x00, ..] => (Self::Utf32Le, 4),
			[0x00, 0x00, 0xFE, 0xFF, ..] => (Self::Utf32Be, 4),
			[0xEF, 0xBB, 0xBF, ..] => (Self::Utf8, 3),
			[0xFF, 0xFE, ..] => (Self::Utf16Le, 2),
			[0xFE, 0xFF, ..] => (Self::Utf16Be, 2),
			_ => (Self::Utf8, 0),
		}
	}

	pub fn bom(self) -> &'static [u8] {
		match self {
			Self::Utf8 => &[0xEF, 0xBB, 0xBF],
			Self::Utf16Le => &[0xFF, 0xFE],
			Self::Utf16Be => &[0xFE, 0xFF],
			Self::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
			Self::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
		}
	}

	/// Number of bytes in one code unit.
	pub fn unit_size(self) -> usize {
		match self {
			Self::Utf8 => 1,
			Self::Utf16Le | Self::Utf16Be => 2,
			Self::Utf32Le | Self::Utf32Be => 4,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Utf8 => "utf-8",
			Self::Utf16Le => "utf-16le",
			Self::Utf16Be => "utf-16be",
			Self::Utf32Le => "utf-32le",
			Self::Utf32Be => "utf-32be",
		}
	}

	/// Encode configured token text into this encoding (without a BOM).
	pub fn encode(self, text: &str) -> Vec<u8> {
		match self {
			Self::Utf8 => text.as_bytes().to_vec(),
			Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
			Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
			Self::Utf32Le => text.chars().flat_map(|ch| u32::from(ch).to_le_bytes()).collect(),
			Self::Utf32Be => text.chars().flat_map(|ch| u32::from(ch).to_be_bytes()).collect(),
		}
	}

	/// Decode bytes for diagnostics and directive arguments. Invalid
	/// sequences are replaced rather than rejected.
	pub fn decode_lossy(self, bytes: &[u8]) -> String {
		match self {
			Self::Utf8 => encoding_rs::UTF_8.decode_without_bom_handling(bytes).0.into_owned(),
			Self::Utf16Le => encoding_rs::UTF_16LE
				.decode_without_bom_handling(bytes)
				.0
				.into_owned(),
			Self::Utf16Be => encoding_rs::UTF_16BE
				.decode_without_bom_handling(bytes)
				.0
				.into_owned(),
			Self::Utf32Le | Self::Utf32Be => {
				bytes
					.chunks(4)
					.map(|chunk| {
						let mut unit = [0u8; 4];
						unit[..chunk.len()].copy_from_slice(chunk);
						let value = if self == Self::Utf32Le {
							u32::from_le_bytes(unit)
						} else {
							u32::from_be_bytes(unit)
						};
						char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
					})
					.collect()
			}
		}
	}
}

impl std::fmt::Display for TextEncoding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}
