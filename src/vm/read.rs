//! Wire-format primitive readers
//!
//! The engine is implemented generically on any [`std::io::Read`]; values
//! are deposited owned, so no borrowed-slice plumbing is needed here.

use super::DecodeError;

use integer_encoding::VarIntReader;

/// Strings and bytes must fit a reasonable array index; a length beyond
/// this bound means the input is malformed
const MAX_LENGTH: i64 = i32::MAX as i64;

pub(crate) trait ReadInput: std::io::Read + Sized {
	fn read_bool(&mut self) -> Result<bool, DecodeError> {
		Ok(self.read_const_size_buf::<1>()?[0] != 0)
	}

	fn read_int(&mut self) -> Result<i32, DecodeError> {
		VarIntReader::read_varint(self).map_err(DecodeError::io)
	}

	fn read_long(&mut self) -> Result<i64, DecodeError> {
		VarIntReader::read_varint(self).map_err(DecodeError::io)
	}

	fn read_float(&mut self) -> Result<f32, DecodeError> {
		Ok(f32::from_le_bytes(self.read_const_size_buf::<4>()?))
	}

	fn read_double(&mut self) -> Result<f64, DecodeError> {
		Ok(f64::from_le_bytes(self.read_const_size_buf::<8>()?))
	}

	fn read_string(&mut self) -> Result<String, DecodeError> {
		let buf = self.read_length_prefixed()?;
		String::from_utf8(buf)
			.map_err(|_| DecodeError::new("String on the wire is not valid UTF-8"))
	}

	fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
		self.read_length_prefixed()
	}

	fn read_fixed(&mut self, size: usize) -> Result<Vec<u8>, DecodeError> {
		let mut buf = vec![0u8; size];
		self.read_exact(&mut buf).map_err(DecodeError::io)?;
		Ok(buf)
	}

	fn read_length_prefixed(&mut self) -> Result<Vec<u8>, DecodeError> {
		let len = self.read_long()?;
		if !(0..=MAX_LENGTH).contains(&len) {
			return Err(DecodeError::custom(format_args!(
				"Length on the wire is out of range: {len}"
			)));
		}
		let mut buf = vec![0u8; len as usize];
		self.read_exact(&mut buf).map_err(DecodeError::io)?;
		Ok(buf)
	}

	fn read_const_size_buf<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
		let mut buf = [0u8; N];
		self.read_exact(&mut buf).map_err(DecodeError::io)?;
		Ok(buf)
	}
}

impl<R: std::io::Read> ReadInput for R {}
