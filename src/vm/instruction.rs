//! The closed instruction set executed by the [`Engine`](super::Engine)

/// The data type tag carried by `mov` and `discard` instructions
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VmType {
	Bool,
	/// 32-bit zig-zag varint
	Int,
	/// 64-bit zig-zag varint
	Long,
	/// 32-bit little-endian IEEE-754
	Float,
	/// 64-bit little-endian IEEE-754
	Double,
	/// Length-prefixed UTF-8
	String,
	/// Length-prefixed raw bytes
	Bytes,
	/// Exactly N raw bytes
	Fixed(u32),
	/// Deposit the accumulator contents instead of reading input
	Acc,
}

impl std::fmt::Display for VmType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			VmType::Bool => f.write_str("bool"),
			VmType::Int => f.write_str("int"),
			VmType::Long => f.write_str("long"),
			VmType::Float => f.write_str("float"),
			VmType::Double => f.write_str("double"),
			VmType::String => f.write_str("string"),
			VmType::Bytes => f.write_str("bytes"),
			VmType::Fixed(n) => write!(f, "fixed({})", n),
			VmType::Acc => f.write_str("acc"),
		}
	}
}

/// A single VM instruction
///
/// Jump displacements are relative to the instruction *following* the jump:
/// the VM first adds the displacement to the program counter, then performs
/// its normal increment.
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
	/// Return from a subroutine (or end the run, from the main flow)
	Ret,
	/// Abort with the program error table entry at this index
	Halt(u32),
	/// Tell the current setter to reorder its fields
	Sort(Vec<u32>),
	/// Read a zig-zag long from input into the accumulator
	Load,
	/// Read a value of the given type from input and deposit it through the
	/// current setter
	Mov(VmType),
	/// Read a value of the given type from input and drop it
	Discard(VmType),
	/// Call the subroutine at the relative position to drain a record
	/// without depositing
	DiscardRecord(i32),
	/// Run the block loop at the relative position with a skipper setter
	DiscardBlock(i32),
	/// Advance the current setter past one slot
	Skip,
	/// Unconditional relative jump
	Jmp(i32),
	/// If the accumulator equals the value, jump
	Case(i64, i32),
	/// If the accumulator equals the value, skip the current slot and jump
	SkipCase(i64, i32),
	/// Obtain the inner setter and call the subroutine at the relative
	/// position with it
	Record(i32),
	/// Run the block loop over the body that follows, then jump past it
	Block(i32),
	/// Return from one block body iteration
	EndBlock,
}

impl Instruction {
	/// Whether this instruction calls a subroutine for either reading or
	/// discarding a record (the only call sites the linker rewrites)
	pub(crate) fn is_record_call(&self) -> bool {
		matches!(self, Instruction::Record(_) | Instruction::DiscardRecord(_))
	}

	/// Set the relative displacement of a record-call instruction
	///
	/// # Panics
	/// If this is not a record-call instruction.
	pub(crate) fn set_pos(&mut self, pos: i32) {
		match self {
			Instruction::Record(p) | Instruction::DiscardRecord(p) => *p = pos,
			other => panic!("{} is not a record-call instruction", other),
		}
	}
}

impl std::fmt::Display for Instruction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Instruction::Ret => f.write_str("ret"),
			Instruction::Halt(code) => write!(f, "halt ({})", code),
			Instruction::Sort(order) => write!(f, "sort {:?}", order),
			Instruction::Load => f.write_str("load"),
			Instruction::Mov(t) => write!(f, "mov {}", t),
			Instruction::Discard(t) => write!(f, "discard {}", t),
			Instruction::DiscardRecord(pos) => write!(f, "discard record\t--> {}", pos),
			Instruction::DiscardBlock(pos) => write!(f, "discard block\t--> {}", pos),
			Instruction::Skip => f.write_str("skip"),
			Instruction::Jmp(pos) => write!(f, "jmp\t--> {}", pos),
			Instruction::Case(val, pos) => write!(f, "case {}\t--> {}", val, pos),
			Instruction::SkipCase(val, pos) => write!(f, "skipCase {}\t--> {}", val, pos),
			Instruction::Record(pos) => write!(f, "record\t--> {}", pos),
			Instruction::Block(pos) => write!(f, "block\t--> {}", pos),
			Instruction::EndBlock => f.write_str("endBlock"),
		}
	}
}
