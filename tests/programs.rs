//! Bytecode round-trip and disassembly of compiled programs

use {
	avro_resolver::vm::{BytecodeError, Instruction, Program, VmType},
	pretty_assertions::assert_eq,
};

fn full_instruction_set() -> Vec<Instruction> {
	vec![
		Instruction::Ret,
		Instruction::Halt(0),
		Instruction::Load,
		Instruction::Skip,
		Instruction::EndBlock,
		Instruction::Mov(VmType::Acc),
		Instruction::Mov(VmType::Fixed(16)),
		Instruction::Jmp(5),
		Instruction::Record(-4),
		Instruction::Discard(VmType::String),
		Instruction::Block(6),
		Instruction::Case(1, 2),
		Instruction::SkipCase(0, 3),
		Instruction::DiscardBlock(-10),
		Instruction::DiscardRecord(-300),
		Instruction::Sort(vec![3, 2, 1, 0]),
	]
}

#[test]
fn bytecode_round_trips_instruction_for_instruction() {
	let program = Program::new(
		full_instruction_set(),
		vec!["invalid index for union".to_owned(), "oops".to_owned()],
	);
	let bytecode = program.bytecode();
	let decoded = Program::from_bytecode(&bytecode).unwrap();
	assert_eq!(decoded, program);
}

#[test]
fn compiled_programs_round_trip_too() {
	let program = avro_resolver::compile_schemas(
		r#"["null",{"type":"map","values":"int"}]"#,
		r#"["null",{"type":"map","values":"long"}]"#,
	)
	.unwrap();
	let decoded = Program::from_bytecode(&program.bytecode()).unwrap();
	assert_eq!(decoded, program);
}

#[test]
fn invalid_bytecode_is_rejected() {
	assert!(matches!(
		Program::from_bytecode(&[]),
		Err(BytecodeError::UnexpectedEnd { .. })
	));
	// One instruction announced, bogus opcode
	assert!(matches!(
		Program::from_bytecode(&[0x01, 0xff]),
		Err(BytecodeError::InvalidOpcode { opcode: 0xff, .. })
	));
	// mov with a bogus type tag
	assert!(matches!(
		Program::from_bytecode(&[0x01, 0x05, 0x7f]),
		Err(BytecodeError::InvalidType { type_tag: 0x7f, .. })
	));
	// Instruction count pointing past the buffer
	assert!(matches!(
		Program::from_bytecode(&[0x02, 0x04]),
		Err(BytecodeError::UnexpectedEnd { .. })
	));
}

#[test]
fn trailing_bytes_are_rejected() {
	let mut bytecode = Program::new(vec![Instruction::Ret], Vec::new()).bytecode();
	bytecode.push(0x00);
	assert!(matches!(
		Program::from_bytecode(&bytecode),
		Err(BytecodeError::TrailingBytes { .. })
	));
}

#[test]
fn disassembly_lists_instructions_and_errors() {
	let program = Program::new(
		vec![
			Instruction::Load,
			Instruction::SkipCase(0, 4),
			Instruction::Mov(VmType::Acc),
			Instruction::Case(1, 1),
			Instruction::Halt(0),
			Instruction::Mov(VmType::Int),
			Instruction::Ret,
		],
		vec!["invalid index for union".to_owned()],
	);
	assert_eq!(
		program.to_string(),
		"0:\tload\n\
		 1:\tskipCase 0\t--> 4\n\
		 2:\tmov acc\n\
		 3:\tcase 1\t--> 1\n\
		 4:\thalt (0)\n\
		 5:\tmov int\n\
		 6:\tret\n\
		 error 0:\tinvalid index for union\n"
	);
}
