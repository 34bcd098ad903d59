use std::borrow::Cow;

/// Any error that may happen while a program runs over input bytes
#[derive(thiserror::Error)]
#[error("{}", inner.value)]
pub struct DecodeError {
	inner: Box<ErrorInner>,
}

impl std::fmt::Debug for DecodeError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.inner.io_error.as_ref() {
			Some(io_error) => write!(f, "{}: {}", self.inner.value, io_error),
			None => std::fmt::Debug::fmt(&*self.inner.value, f),
		}
	}
}

struct ErrorInner {
	value: Cow<'static, str>,
	io_error: Option<std::io::Error>,
}

impl DecodeError {
	/// If you need a dynamic string use `DecodeError::custom(format_args!(...))`
	pub(crate) fn new(s: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(s),
				io_error: None,
			}),
		}
	}

	pub(crate) fn custom(msg: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
				io_error: None,
			}),
		}
	}

	pub(crate) fn unexpected_eof() -> Self {
		Self::new("Unexpected end of input while decoding")
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		if io_error.kind() == std::io::ErrorKind::UnexpectedEof {
			return Self::unexpected_eof();
		}
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed("Encountered IO error when attempting to read for decoding"),
				io_error: Some(io_error),
			}),
		}
	}

	pub(crate) fn halted(message: &str) -> Self {
		Self::custom(format_args!("execution halted: {message}"))
	}

	/// If this error was caused by an IO error, return it
	pub fn io_error(&self) -> Option<&std::io::Error> {
		self.inner.io_error.as_ref()
	}
}

impl From<super::setters::BindingError> for DecodeError {
	fn from(binding_error: super::setters::BindingError) -> Self {
		Self::custom(binding_error)
	}
}
