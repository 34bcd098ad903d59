use super::{Binding, BindingError, InitArg, Op, Setter, Value};

/// Setter over an ordered list of field slots: records, key/value pairs,
/// and one-slot roots
///
/// Maintains a current position and a permutation installed by the last
/// reorder (identity by default): position `i` addresses
/// `fields[order[i]]`, so a program reading in writer order deposits into
/// reader slots exactly as the permutation dictates.
pub struct FieldListSetter<'a> {
	fields: Vec<Binding<'a>>,
	order: Vec<usize>,
	current: usize,
	// Whether the current child has consumed at least one operation.
	// Decides whether reorders, get_inner and completion notifications
	// drill into the child (an in-progress union) or apply to this list.
	child_touched: bool,
}

impl<'a> FieldListSetter<'a> {
	pub fn new(fields: Vec<Binding<'a>>) -> Self {
		let order = (0..fields.len()).collect();
		Self {
			fields,
			order,
			current: 0,
			child_touched: false,
		}
	}

	/// Install a permutation: the given positions fill the first
	/// `positions.len()` slots, the not-yet-referenced originals follow in
	/// order of appearance
	fn sort(&mut self, positions: &[u32]) -> Result<(), BindingError> {
		if positions.len() > self.fields.len() {
			return Err(BindingError::SortOutOfRange);
		}
		let mut visited = vec![false; self.fields.len()];
		for (i, &position) in positions.iter().enumerate() {
			let position = position as usize;
			if position >= self.fields.len() || std::mem::replace(&mut visited[position], true) {
				return Err(BindingError::SortOutOfRange);
			}
			self.order[i] = position;
		}
		let mut next = positions.len();
		for (i, visited) in visited.into_iter().enumerate() {
			if !visited {
				self.order[next] = i;
				next += 1;
			}
		}
		Ok(())
	}

	fn advance(&mut self) {
		self.current += 1;
		self.child_touched = false;
	}

	fn current_idx(&self) -> Result<usize, BindingError> {
		self.order
			.get(self.current)
			.copied()
			.ok_or(BindingError::Exhausted)
	}
}

impl Setter for FieldListSetter<'_> {
	fn init(&mut self, arg: InitArg<'_>) -> Result<(), BindingError> {
		match arg {
			InitArg::Order(positions) => {
				if self.child_touched {
					// A reorder arriving while a child is mid-consumption
					// targets that child (union tag translation), not this
					// list
					let idx = self.current_idx()?;
					return match &mut self.fields[idx] {
						Binding::Nested(child) | Binding::Block(child) => {
							child.init(InitArg::Order(positions))
						}
						_ => Err(BindingError::NotASetter),
					};
				}
				self.sort(positions)
			}
			InitArg::Count(_) => Err(BindingError::BadInit),
		}
	}

	fn execute(&mut self, op: Op, value: Value) -> Result<(), BindingError> {
		let idx = self.current_idx()?;
		match op {
			// A skip always passes one whole slot, composite or not
			Op::SkipField => {
				self.advance();
				Ok(())
			}
			Op::SetField => match &mut self.fields[idx] {
				Binding::Nested(child) | Binding::Block(child) => {
					child.execute(op, value)?;
					let done = child.is_exhausted();
					self.child_touched = true;
					if done {
						self.advance();
					}
					Ok(())
				}
				slot => {
					slot.assign(value)?;
					self.advance();
					Ok(())
				}
			},
		}
	}

	fn is_exhausted(&self) -> bool {
		self.current >= self.fields.len()
	}

	fn get_inner(&mut self) -> Result<Box<dyn Setter + '_>, BindingError> {
		let idx = self.current_idx()?;
		let touched = self.child_touched;
		match &mut self.fields[idx] {
			Binding::Nested(child) | Binding::Block(child) => {
				if touched {
					child.get_inner()
				} else {
					Ok(Box::new(child.as_mut()))
				}
			}
			_ => Err(BindingError::NotASetter),
		}
	}

	fn on_inner_exhausted(&mut self) -> Result<(), BindingError> {
		let Ok(idx) = self.current_idx() else {
			return Ok(());
		};
		let touched = self.child_touched;
		let done = match &mut self.fields[idx] {
			Binding::Nested(child) | Binding::Block(child) => {
				if touched {
					child.on_inner_exhausted()?;
				}
				child.is_exhausted()
			}
			_ => false,
		};
		if done {
			self.advance();
		}
		Ok(())
	}
}
