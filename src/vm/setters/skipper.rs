use super::{BindingError, InitArg, Op, Setter, Value};

/// A sentinel setter that accepts any operation, never reports exhaustion,
/// yields itself as its own inner, and performs no writes
///
/// The VM drives `discard record` and `discard block` subroutines against
/// it, draining bytes without any target.
pub struct SkipperSetter;

impl Setter for SkipperSetter {
	fn init(&mut self, _arg: InitArg<'_>) -> Result<(), BindingError> {
		Ok(())
	}

	fn execute(&mut self, _op: Op, _value: Value) -> Result<(), BindingError> {
		Ok(())
	}

	fn is_exhausted(&self) -> bool {
		false
	}

	fn get_inner(&mut self) -> Result<Box<dyn Setter + '_>, BindingError> {
		Ok(Box::new(SkipperSetter))
	}

	fn on_inner_exhausted(&mut self) -> Result<(), BindingError> {
		Ok(())
	}
}
