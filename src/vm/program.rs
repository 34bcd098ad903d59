//! [`Program`] and its compact bytecode serialization

use super::instruction::{Instruction, VmType};

use integer_encoding::VarInt;

/// A linked, runnable bytecode program
///
/// Immutable after linking; may be shared freely across concurrent runs,
/// each with its own input and target.
#[derive(Clone, PartialEq, Debug)]
pub struct Program {
	pub(crate) instructions: Vec<Instruction>,
	// Messages that can be triggered by halt(x), where x is an index in
	// this table
	pub(crate) errors: Vec<String>,
}

impl Program {
	pub fn new(instructions: Vec<Instruction>, errors: Vec<String>) -> Self {
		Self {
			instructions,
			errors,
		}
	}

	pub fn instructions(&self) -> &[Instruction] {
		&self.instructions
	}

	pub fn errors(&self) -> &[String] {
		&self.errors
	}

	/// Serialize to the compact bytecode form: one-byte opcode, optional
	/// type byte, varint operands (displacements zig-zag encoded), followed
	/// by the halt error table
	pub fn bytecode(&self) -> Vec<u8> {
		let mut buf = Vec::new();
		write_varint(&mut buf, self.instructions.len() as u32);
		for inst in &self.instructions {
			write_instruction(&mut buf, inst);
		}
		write_varint(&mut buf, self.errors.len() as u32);
		for error in &self.errors {
			write_varint(&mut buf, error.len() as u32);
			buf.extend_from_slice(error.as_bytes());
		}
		buf
	}

	/// Deserialize a program previously produced by
	/// [`bytecode`](Program::bytecode)
	///
	/// Round-trips instruction-for-instruction, error table included.
	pub fn from_bytecode(bytes: &[u8]) -> Result<Self, BytecodeError> {
		let mut reader = BytecodeReader { bytes, at: 0 };
		let instruction_count: u32 = reader.varint()?;
		let mut instructions = Vec::with_capacity(instruction_count.min(1024) as usize);
		for _ in 0..instruction_count {
			instructions.push(reader.instruction()?);
		}
		let error_count: u32 = reader.varint()?;
		let mut errors = Vec::with_capacity(error_count.min(1024) as usize);
		for _ in 0..error_count {
			let len: u32 = reader.varint()?;
			let raw = reader.take(len as usize)?;
			errors.push(
				std::str::from_utf8(raw)
					.map_err(|_| BytecodeError::InvalidErrorTable)?
					.to_owned(),
			);
		}
		if reader.at != bytes.len() {
			return Err(BytecodeError::TrailingBytes { at: reader.at });
		}
		Ok(Self {
			instructions,
			errors,
		})
	}
}

impl std::fmt::Display for Program {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (i, inst) in self.instructions.iter().enumerate() {
			writeln!(f, "{}:\t{}", i, inst)?;
		}
		for (i, error) in self.errors.iter().enumerate() {
			writeln!(f, "error {}:\t{}", i, error)?;
		}
		Ok(())
	}
}

/// Any error that may happen when decoding a [`Program`] from bytecode
#[derive(thiserror::Error, Debug)]
pub enum BytecodeError {
	#[error("Bytecode ended in the middle of an instruction (at byte {at})")]
	UnexpectedEnd { at: usize },
	#[error("Bad opcode {opcode:#04x} at byte {at}")]
	InvalidOpcode { opcode: u8, at: usize },
	#[error("Bad type tag {type_tag:#04x} at byte {at}")]
	InvalidType { type_tag: u8, at: usize },
	#[error("Error table contains invalid UTF-8")]
	InvalidErrorTable,
	#[error("Trailing bytes after the end of the program (at byte {at})")]
	TrailingBytes { at: usize },
}

// Opcode bytes of the serialized form. Zero is reserved so that a
// zero-filled buffer can never decode as a valid program.
mod op {
	pub(super) const RET: u8 = 1;
	pub(super) const HALT: u8 = 2;
	pub(super) const SORT: u8 = 3;
	pub(super) const LOAD: u8 = 4;
	pub(super) const MOV: u8 = 5;
	pub(super) const DISCARD: u8 = 6;
	pub(super) const DISCARD_RECORD: u8 = 7;
	pub(super) const DISCARD_BLOCK: u8 = 8;
	pub(super) const SKIP: u8 = 9;
	pub(super) const JMP: u8 = 10;
	pub(super) const CASE: u8 = 11;
	pub(super) const SKIP_CASE: u8 = 12;
	pub(super) const RECORD: u8 = 13;
	pub(super) const BLOCK: u8 = 14;
	pub(super) const END_BLOCK: u8 = 15;
}

mod type_tag {
	pub(super) const BOOL: u8 = 1;
	pub(super) const INT: u8 = 2;
	pub(super) const LONG: u8 = 3;
	pub(super) const FLOAT: u8 = 4;
	pub(super) const DOUBLE: u8 = 5;
	pub(super) const STRING: u8 = 6;
	pub(super) const BYTES: u8 = 7;
	pub(super) const FIXED: u8 = 8;
	pub(super) const ACC: u8 = 9;
}

fn write_varint<I: VarInt>(buf: &mut Vec<u8>, value: I) {
	let mut scratch = [0u8; 10];
	let n = value.encode_var(&mut scratch);
	buf.extend_from_slice(&scratch[..n]);
}

fn write_type(buf: &mut Vec<u8>, t: VmType) {
	match t {
		VmType::Bool => buf.push(type_tag::BOOL),
		VmType::Int => buf.push(type_tag::INT),
		VmType::Long => buf.push(type_tag::LONG),
		VmType::Float => buf.push(type_tag::FLOAT),
		VmType::Double => buf.push(type_tag::DOUBLE),
		VmType::String => buf.push(type_tag::STRING),
		VmType::Bytes => buf.push(type_tag::BYTES),
		VmType::Fixed(n) => {
			buf.push(type_tag::FIXED);
			write_varint(buf, n);
		}
		VmType::Acc => buf.push(type_tag::ACC),
	}
}

fn write_instruction(buf: &mut Vec<u8>, inst: &Instruction) {
	match *inst {
		Instruction::Ret => buf.push(op::RET),
		Instruction::Halt(code) => {
			buf.push(op::HALT);
			write_varint(buf, code);
		}
		Instruction::Sort(ref order) => {
			buf.push(op::SORT);
			write_varint(buf, order.len() as u32);
			for &position in order {
				write_varint(buf, position);
			}
		}
		Instruction::Load => buf.push(op::LOAD),
		Instruction::Mov(t) => {
			buf.push(op::MOV);
			write_type(buf, t);
		}
		Instruction::Discard(t) => {
			buf.push(op::DISCARD);
			write_type(buf, t);
		}
		Instruction::DiscardRecord(pos) => {
			buf.push(op::DISCARD_RECORD);
			write_varint(buf, pos);
		}
		Instruction::DiscardBlock(pos) => {
			buf.push(op::DISCARD_BLOCK);
			write_varint(buf, pos);
		}
		Instruction::Skip => buf.push(op::SKIP),
		Instruction::Jmp(pos) => {
			buf.push(op::JMP);
			write_varint(buf, pos);
		}
		Instruction::Case(val, pos) => {
			buf.push(op::CASE);
			write_varint(buf, val);
			write_varint(buf, pos);
		}
		Instruction::SkipCase(val, pos) => {
			buf.push(op::SKIP_CASE);
			write_varint(buf, val);
			write_varint(buf, pos);
		}
		Instruction::Record(pos) => {
			buf.push(op::RECORD);
			write_varint(buf, pos);
		}
		Instruction::Block(pos) => {
			buf.push(op::BLOCK);
			write_varint(buf, pos);
		}
		Instruction::EndBlock => buf.push(op::END_BLOCK),
	}
}

struct BytecodeReader<'a> {
	bytes: &'a [u8],
	at: usize,
}

impl BytecodeReader<'_> {
	fn byte(&mut self) -> Result<u8, BytecodeError> {
		let b = *self
			.bytes
			.get(self.at)
			.ok_or(BytecodeError::UnexpectedEnd { at: self.at })?;
		self.at += 1;
		Ok(b)
	}

	fn varint<I: VarInt>(&mut self) -> Result<I, BytecodeError> {
		let (value, read) = I::decode_var(&self.bytes[self.at..])
			.ok_or(BytecodeError::UnexpectedEnd { at: self.at })?;
		self.at += read;
		Ok(value)
	}

	fn take(&mut self, n: usize) -> Result<&[u8], BytecodeError> {
		if self.at + n > self.bytes.len() {
			return Err(BytecodeError::UnexpectedEnd { at: self.at });
		}
		let slice = &self.bytes[self.at..self.at + n];
		self.at += n;
		Ok(slice)
	}

	fn type_tag(&mut self) -> Result<VmType, BytecodeError> {
		let at = self.at;
		Ok(match self.byte()? {
			type_tag::BOOL => VmType::Bool,
			type_tag::INT => VmType::Int,
			type_tag::LONG => VmType::Long,
			type_tag::FLOAT => VmType::Float,
			type_tag::DOUBLE => VmType::Double,
			type_tag::STRING => VmType::String,
			type_tag::BYTES => VmType::Bytes,
			type_tag::FIXED => VmType::Fixed(self.varint()?),
			type_tag::ACC => VmType::Acc,
			type_tag => return Err(BytecodeError::InvalidType { type_tag, at }),
		})
	}

	fn instruction(&mut self) -> Result<Instruction, BytecodeError> {
		let at = self.at;
		Ok(match self.byte()? {
			op::RET => Instruction::Ret,
			op::HALT => Instruction::Halt(self.varint()?),
			op::SORT => {
				let len: u32 = self.varint()?;
				let mut order = Vec::with_capacity(len.min(1024) as usize);
				for _ in 0..len {
					order.push(self.varint()?);
				}
				Instruction::Sort(order)
			}
			op::LOAD => Instruction::Load,
			op::MOV => Instruction::Mov(self.type_tag()?),
			op::DISCARD => Instruction::Discard(self.type_tag()?),
			op::DISCARD_RECORD => Instruction::DiscardRecord(self.varint()?),
			op::DISCARD_BLOCK => Instruction::DiscardBlock(self.varint()?),
			op::SKIP => Instruction::Skip,
			op::JMP => Instruction::Jmp(self.varint()?),
			op::CASE => Instruction::Case(self.varint()?, self.varint()?),
			op::SKIP_CASE => Instruction::SkipCase(self.varint()?, self.varint()?),
			op::RECORD => Instruction::Record(self.varint()?),
			op::BLOCK => Instruction::Block(self.varint()?),
			op::END_BLOCK => Instruction::EndBlock,
			opcode => return Err(BytecodeError::InvalidOpcode { opcode, at }),
		})
	}
}
