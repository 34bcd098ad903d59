use crate::schema::SchemaError;

/// Any error that may happen when compiling a `(writer, reader)` schema
/// pair into a program
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
	#[error("incompatible types {writer} and {reader}")]
	Incompatible { writer: String, reader: String },
	#[error(
		"incompatible schemas: field {reader_field} in reader has incompatible type in writer field {writer_field}"
	)]
	IncompatibleField {
		reader_field: String,
		writer_field: String,
	},
	#[error(
		"incompatible schemas: reader field {field} has no default and is missing from writer record {record}"
	)]
	MissingField { field: String, record: String },
	#[error(
		"incompatible schemas: reader has no compatible member for writer member {writer_member} in union"
	)]
	IncompatibleUnion { writer_member: String },
	#[error("type {name} is not a primitive type")]
	NotPrimitive { name: String },
	#[error(
		"invalid program entry point for type {name}: main size {main_size}, nested methods {nested_methods}"
	)]
	InvalidEntryPoint {
		name: String,
		main_size: usize,
		nested_methods: usize,
	},
}

/// Any error that may happen when compiling a schema pair from JSON text
#[derive(thiserror::Error, Debug)]
pub enum CompileSchemasError {
	#[error(transparent)]
	Schema(#[from] SchemaError),
	#[error(transparent)]
	Compile(#[from] CompileError),
}
