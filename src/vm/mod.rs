//! The virtual machine: [`Program`], its instruction set and bytecode
//! form, and the [`Engine`] that executes programs over input bytes

mod engine;
mod error;
mod instruction;
mod program;
pub(crate) mod read;
pub mod setters;

pub use {
	engine::{Engine, DEFAULT_MAX_CALL_DEPTH},
	error::DecodeError,
	instruction::{Instruction, VmType},
	program::{BytecodeError, Program},
};
