use super::{Bind, BindingError, FieldListSetter, InitArg, Op, Setter, Value};

/// Setter over a growable slice target
///
/// `init(count)` reserves for the upcoming block run; `get_inner` hands out
/// a one-slot setter over an owned element scratch; each completion
/// notification moves the element into place.
pub struct SliceSetter<'a, T: Bind + Default> {
	vec: &'a mut Vec<T>,
	remaining: usize,
	item: T,
}

impl<'a, T: Bind + Default> SliceSetter<'a, T> {
	pub fn new(vec: &'a mut Vec<T>) -> Self {
		Self {
			vec,
			remaining: 0,
			item: T::default(),
		}
	}
}

impl<T: Bind + Default> Setter for SliceSetter<'_, T> {
	fn init(&mut self, arg: InitArg<'_>) -> Result<(), BindingError> {
		match arg {
			InitArg::Count(count) => {
				self.remaining = count;
				self.vec.reserve(count.min(1024));
				Ok(())
			}
			InitArg::Order(_) => Err(BindingError::BadInit),
		}
	}

	fn execute(&mut self, _op: Op, _value: Value) -> Result<(), BindingError> {
		// Elements only flow through the per-element setter
		Err(BindingError::Unsupported)
	}

	fn is_exhausted(&self) -> bool {
		self.remaining == 0
	}

	fn get_inner(&mut self) -> Result<Box<dyn Setter + '_>, BindingError> {
		Ok(Box::new(FieldListSetter::new(vec![self.item.bind()])))
	}

	fn on_inner_exhausted(&mut self) -> Result<(), BindingError> {
		self.vec.push(std::mem::take(&mut self.item));
		self.remaining = self.remaining.saturating_sub(1);
		Ok(())
	}
}
