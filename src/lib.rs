//! # Getting started
//!
//! ```
//! let program = avro_resolver::compile_schemas(
//! 	r#"{"name":"X","type":"int"}"#,
//! 	r#"{"name":"X","type":"int"}"#,
//! )
//! .expect("Failed to compile schemas");
//!
//! let engine = avro_resolver::vm::Engine::new(program);
//! let mut decoded: i32 = 0;
//! engine
//! 	.run(&[0x54][..], &mut decoded)
//! 	.expect("Failed to decode");
//! assert_eq!(decoded, 42);
//! ```
//!
//! # Schema-resolving Avro deserialization
//!
//! Given a *writer* schema (how the bytes on the wire were produced) and a
//! *reader* schema (what the consumer wants), this crate:
//! - parses both schemas from JSON into a cyclic-reference-capable IR
//!   ([`Schema`]),
//! - statically verifies the pair under the Avro schema-resolution rules
//!   ([`Schema::readable_by`]),
//! - compiles a compact bytecode [`Program`](vm::Program) that threads
//!   through the encoded bytes exactly once, reordering, skipping and
//!   discarding fields as the pair requires,
//! - executes that program with a small register-like VM
//!   ([`Engine`](vm::Engine)), depositing decoded values into caller-owned
//!   structures through the [`Bind`](vm::setters::Bind) surface.
//!
//! A compiled [`Program`](vm::Program) is immutable and may be shared freely
//! across concurrent runs; each run owns its input and its target.

pub mod compiler;
pub mod schema;
pub mod vm;

pub use schema::Schema;

use compiler::CompileSchemasError;

/// Compile a runnable [`Program`](vm::Program) which can read data written
/// with the `writer_json` schema and store it in targets shaped by the
/// `reader_json` schema.
///
/// Parsing and compilation are fully deterministic; no partial output is
/// produced on error.
pub fn compile_schemas(
	writer_json: &str,
	reader_json: &str,
) -> Result<vm::Program, CompileSchemasError> {
	let writer: Schema = writer_json.parse()?;
	// Parsing is the expensive half, so when both schemas are the same text
	// we only do it once
	if writer_json == reader_json {
		Ok(compiler::compile(&writer, &writer)?)
	} else {
		let reader: Schema = reader_json.parse()?;
		Ok(compiler::compile(&writer, &reader)?)
	}
}
