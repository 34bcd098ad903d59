use super::{Bind, Binding, BindingError, FieldListSetter, InitArg, Op, Setter, Value};

use std::collections::HashMap;

/// Setter over a string-keyed map target
///
/// `init(count)` announces the upcoming block run; `get_inner` hands out a
/// key/value pair setter over owned scratch; each completion notification
/// commits the pair into the map and decrements the remaining count.
pub struct MapSetter<'a, V: Bind + Default> {
	map: &'a mut HashMap<String, V>,
	remaining: usize,
	key: String,
	value: V,
}

impl<'a, V: Bind + Default> MapSetter<'a, V> {
	pub fn new(map: &'a mut HashMap<String, V>) -> Self {
		Self {
			map,
			remaining: 0,
			key: String::new(),
			value: V::default(),
		}
	}
}

impl<V: Bind + Default> Setter for MapSetter<'_, V> {
	fn init(&mut self, arg: InitArg<'_>) -> Result<(), BindingError> {
		match arg {
			InitArg::Count(count) => {
				self.remaining = count;
				// Correctness never depends on the reservation, so a
				// hostile count cannot force a huge allocation
				self.map.reserve(count.min(1024));
				Ok(())
			}
			InitArg::Order(_) => Err(BindingError::BadInit),
		}
	}

	fn execute(&mut self, _op: Op, _value: Value) -> Result<(), BindingError> {
		// Entries only flow through the key/value pair setter
		Err(BindingError::Unsupported)
	}

	fn is_exhausted(&self) -> bool {
		self.remaining == 0
	}

	fn get_inner(&mut self) -> Result<Box<dyn Setter + '_>, BindingError> {
		let Self { key, value, .. } = self;
		Ok(Box::new(FieldListSetter::new(vec![
			Binding::String(key),
			value.bind(),
		])))
	}

	fn on_inner_exhausted(&mut self) -> Result<(), BindingError> {
		self.map.insert(
			std::mem::take(&mut self.key),
			std::mem::take(&mut self.value),
		);
		self.remaining = self.remaining.saturating_sub(1);
		Ok(())
	}
}
