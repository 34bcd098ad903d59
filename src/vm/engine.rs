use super::{
	instruction::{Instruction, VmType},
	program::Program,
	read::ReadInput,
	setters::{Bind, Binding, FieldListSetter, InitArg, Op, Setter, SkipperSetter, Value},
	DecodeError,
};

/// Default ceiling on subroutine nesting, so that hand-crafted bytecode
/// cannot overflow the host stack
pub const DEFAULT_MAX_CALL_DEPTH: usize = 4096;

/// Executes a [`Program`] over input bytes, driving a setter tree for
/// output
///
/// Strictly single-threaded per run: one program counter, one reader over
/// one input stream, one target tree. The engine itself is immutable, so
/// one `Engine` may serve any number of concurrent runs.
pub struct Engine {
	pub program: Program,
	/// Annotate errors with `at pc N: '<instruction>'` for every unwinding
	/// frame
	pub stack_traces: bool,
	/// Ceiling on `record` subroutine nesting
	pub max_call_depth: usize,
}

enum Flow {
	Next,
	Jump(i32),
	Return,
}

impl Engine {
	pub fn new(program: Program) -> Self {
		Self {
			program,
			stack_traces: false,
			max_call_depth: DEFAULT_MAX_CALL_DEPTH,
		}
	}

	/// Run the program over `input`, depositing decoded values into
	/// `target`
	///
	/// Errors terminate the run immediately; no partially-filled target is
	/// considered valid.
	pub fn run<R: std::io::Read>(
		&self,
		mut input: R,
		target: &mut dyn Bind,
	) -> Result<(), DecodeError> {
		match target.bind() {
			Binding::Nested(mut root) => self.run_at(0, &mut input, root.as_mut(), 0),
			// Primitive and map/slice roots get a one-slot enclosing list,
			// so `mov` and `block` find the slot they expect
			other => {
				let mut root = FieldListSetter::new(vec![other]);
				self.run_at(0, &mut input, &mut root, 0)
			}
		}
	}

	fn run_at<R: std::io::Read>(
		&self,
		mut pc: usize,
		input: &mut R,
		setter: &mut dyn Setter,
		depth: usize,
	) -> Result<(), DecodeError> {
		if depth > self.max_call_depth {
			return Err(DecodeError::custom(format_args!(
				"Maximum call depth ({}) exceeded",
				self.max_call_depth
			)));
		}
		let mut acc: i64 = 0;
		loop {
			let inst = match self.program.instructions.get(pc) {
				Some(inst) => inst,
				// Both mains and promoted mains must tolerate lacking an
				// explicit final ret
				None if depth == 0 => return Ok(()),
				None => return Err(DecodeError::new("Program ran past the end of a subroutine")),
			};
			match self.exec(inst, pc, &mut acc, input, setter, depth) {
				Ok(Flow::Next) => pc += 1,
				Ok(Flow::Jump(rel)) => {
					pc = jump_target(pc, rel).map_err(|e| self.trace(e, pc, inst))?
				}
				Ok(Flow::Return) => return Ok(()),
				Err(e) => return Err(self.trace(e, pc, inst)),
			}
		}
	}

	fn exec<R: std::io::Read>(
		&self,
		inst: &Instruction,
		pc: usize,
		acc: &mut i64,
		input: &mut R,
		setter: &mut dyn Setter,
		depth: usize,
	) -> Result<Flow, DecodeError> {
		Ok(match *inst {
			Instruction::Ret => Flow::Return,
			Instruction::EndBlock => {
				if depth == 0 {
					return Err(DecodeError::new("Cannot endBlock from the main flow"));
				}
				Flow::Return
			}
			Instruction::Halt(code) => {
				let message = self
					.program
					.errors
					.get(code as usize)
					.map(|s| s.as_str())
					.unwrap_or("unknown error");
				return Err(DecodeError::halted(message));
			}
			Instruction::Sort(ref order) => {
				setter.init(InitArg::Order(order))?;
				Flow::Next
			}
			Instruction::Load => {
				*acc = input.read_long()?;
				Flow::Next
			}
			Instruction::Mov(t) => {
				let value = read_value(input, t, *acc)?;
				setter.execute(Op::SetField, value)?;
				Flow::Next
			}
			Instruction::Discard(t) => {
				read_value(input, t, *acc)?;
				Flow::Next
			}
			Instruction::DiscardRecord(pos) => {
				let target = jump_target(pc, pos)?;
				self.run_at(target, input, &mut SkipperSetter, depth + 1)?;
				Flow::Next
			}
			Instruction::DiscardBlock(pos) => {
				self.run_discard_block(pc, input, depth)?;
				Flow::Jump(pos)
			}
			Instruction::Skip => {
				setter.execute(Op::SkipField, Value::Null)?;
				Flow::Next
			}
			Instruction::Jmp(pos) => Flow::Jump(pos),
			Instruction::Case(value, pos) => {
				if *acc == value {
					Flow::Jump(pos)
				} else {
					Flow::Next
				}
			}
			Instruction::SkipCase(value, pos) => {
				if *acc == value {
					setter.execute(Op::SkipField, Value::Null)?;
					Flow::Jump(pos)
				} else {
					Flow::Next
				}
			}
			Instruction::Record(pos) => {
				let target = jump_target(pc, pos)?;
				{
					let mut inner = setter.get_inner()?;
					self.run_at(target, input, inner.as_mut(), depth + 1)?;
				}
				setter.on_inner_exhausted()?;
				Flow::Next
			}
			Instruction::Block(pos) => {
				self.run_block(pc, input, setter, depth)?;
				setter.on_inner_exhausted()?;
				Flow::Jump(pos)
			}
		})
	}

	/// Drive one block-encoded sequence: runs of `(count, items...)`
	/// terminated by a zero count, a negative count carrying a byte-length
	/// hint
	fn run_block<R: std::io::Read>(
		&self,
		pc: usize,
		input: &mut R,
		setter: &mut dyn Setter,
		depth: usize,
	) -> Result<(), DecodeError> {
		let body = pc + 1;
		loop {
			let count = read_block_count(input)?;
			if count == 0 {
				return Ok(());
			}
			let mut inner = setter.get_inner()?;
			inner.init(InitArg::Count(count as usize))?;
			for _ in 0..count {
				{
					let mut item = inner.get_inner()?;
					self.run_at(body, input, item.as_mut(), depth + 1)?;
				}
				inner.on_inner_exhausted()?;
			}
		}
	}

	fn run_discard_block<R: std::io::Read>(
		&self,
		pc: usize,
		input: &mut R,
		depth: usize,
	) -> Result<(), DecodeError> {
		let body = pc + 1;
		loop {
			let count = read_block_count(input)?;
			if count == 0 {
				return Ok(());
			}
			for _ in 0..count {
				self.run_at(body, input, &mut SkipperSetter, depth + 1)?;
			}
		}
	}

	fn trace(&self, e: DecodeError, pc: usize, inst: &Instruction) -> DecodeError {
		if self.stack_traces {
			DecodeError::custom(format_args!("{e}, at pc {pc}: '{inst}'"))
		} else {
			e
		}
	}
}

/// Read the next run count; a negative count means the producer prefixed
/// the run with a byte-length hint, which single-pass decoding reads and
/// drops
fn read_block_count<R: std::io::Read>(input: &mut R) -> Result<i64, DecodeError> {
	let count = input.read_long()?;
	if count >= 0 {
		return Ok(count);
	}
	let _byte_length_hint = input.read_long()?;
	count
		.checked_neg()
		.ok_or_else(|| DecodeError::new("Block count out of range"))
}

fn read_value<R: std::io::Read>(input: &mut R, t: VmType, acc: i64) -> Result<Value, DecodeError> {
	Ok(match t {
		VmType::Bool => Value::Boolean(input.read_bool()?),
		VmType::Int => Value::Int(input.read_int()?),
		VmType::Long => Value::Long(input.read_long()?),
		VmType::Float => Value::Float(input.read_float()?),
		VmType::Double => Value::Double(input.read_double()?),
		VmType::String => Value::String(input.read_string()?),
		VmType::Bytes => Value::Bytes(input.read_bytes()?),
		VmType::Fixed(size) => Value::Bytes(input.read_fixed(size as usize)?),
		VmType::Acc => Value::Long(acc),
	})
}

fn jump_target(pc: usize, rel: i32) -> Result<usize, DecodeError> {
	usize::try_from(pc as i64 + 1 + i64::from(rel))
		.map_err(|_| DecodeError::new("Jump target out of range"))
}
