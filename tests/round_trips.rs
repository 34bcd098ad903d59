//! Decode scenarios running compiled programs end to end

use {
	avro_resolver::{
		compile_schemas,
		vm::{
			setters::{Bind, Binding, BindingError, ByteBuf, UnionBind},
			Engine,
		},
	},
	pretty_assertions::assert_eq,
	std::collections::HashMap,
};

fn engine(writer: &str, reader: &str) -> Engine {
	Engine::new(compile_schemas(writer, reader).expect("Failed to compile schemas"))
}

#[test]
fn simple_int() {
	// Zig-zag 42
	let mut decoded: i32 = 0;
	engine(
		r#"{"name":"X","type":"int"}"#,
		r#"{"name":"X","type":"int"}"#,
	)
	.run(&[0x54][..], &mut decoded)
	.unwrap();
	assert_eq!(decoded, 42);
}

#[test]
fn primitive_round_trips() -> anyhow::Result<()> {
	let mut decoded_long: i64 = 0;
	engine(r#""long""#, r#""long""#).run(&[0x54][..], &mut decoded_long)?;
	assert_eq!(decoded_long, 42);

	let mut decoded_bool = false;
	engine(r#""boolean""#, r#""boolean""#).run(&[0x01][..], &mut decoded_bool)?;
	assert!(decoded_bool);

	let mut decoded_float: f32 = 0.0;
	engine(r#""float""#, r#""float""#).run(&1.5f32.to_le_bytes()[..], &mut decoded_float)?;
	assert_eq!(decoded_float, 1.5);

	let mut decoded_double: f64 = 0.0;
	engine(r#""double""#, r#""double""#).run(&(-0.25f64).to_le_bytes()[..], &mut decoded_double)?;
	assert_eq!(decoded_double, -0.25);

	let mut decoded_string = String::new();
	engine(r#""string""#, r#""string""#).run(&[0x06, b'H', b'i', b'!'][..], &mut decoded_string)?;
	assert_eq!(decoded_string, "Hi!");

	let mut decoded_bytes = ByteBuf::default();
	engine(r#""bytes""#, r#""bytes""#).run(&[0x04, 0xde, 0xad][..], &mut decoded_bytes)?;
	assert_eq!(decoded_bytes.0, [0xde, 0xad]);
	Ok(())
}

#[derive(Default, Debug, PartialEq)]
struct Reordered {
	c: i64,
	a: i32,
}

impl Bind for Reordered {
	fn bind(&mut self) -> Binding<'_> {
		let Self { c, a } = self;
		Binding::record(vec![c.bind(), a.bind()])
	}
}

#[test]
fn record_with_reordering_and_discard() {
	// Writer (a:int, b:string, c:long), reader (c:long, a:int): b is
	// discarded, a and c swap positions
	let writer = r#"{
		"type": "record", "name": "Rec",
		"fields": [
			{"name": "a", "type": "int"},
			{"name": "b", "type": "string"},
			{"name": "c", "type": "long"}
		]
	}"#;
	let reader = r#"{
		"type": "record", "name": "Rec",
		"fields": [
			{"name": "c", "type": "long"},
			{"name": "a", "type": "int"}
		]
	}"#;
	let mut decoded = Reordered::default();
	engine(writer, reader)
		.run(&[0x2a, 0x06, 0x48, 0x69, 0x21, 0x54][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, Reordered { c: 42, a: 21 });
}

#[test]
fn optional_union() {
	let engine = engine(r#"["null","int"]"#, r#"["null","int"]"#);

	// Tag selects the null branch: nothing further is consumed
	let mut decoded: Option<i32> = Some(7);
	engine.run(&[0x00][..], &mut decoded).unwrap();
	assert_eq!(decoded, None);

	let mut decoded: Option<i32> = None;
	engine.run(&[0x02, 0x54][..], &mut decoded).unwrap();
	assert_eq!(decoded, Some(42));
}

#[test]
fn numeric_promotions() -> anyhow::Result<()> {
	let mut decoded: f64 = 0.0;
	engine(r#""int""#, r#""double""#).run(&[0x54][..], &mut decoded)?;
	assert_eq!(decoded, 42.0);

	let mut decoded: i64 = 0;
	engine(r#""int""#, r#""long""#).run(&[0x54][..], &mut decoded)?;
	assert_eq!(decoded, 42);

	let mut decoded: f32 = 0.0;
	engine(r#""long""#, r#""float""#).run(&[0x54][..], &mut decoded)?;
	assert_eq!(decoded, 42.0);

	let mut decoded: f64 = 0.0;
	engine(r#""float""#, r#""double""#).run(&0.5f32.to_le_bytes()[..], &mut decoded)?;
	assert_eq!(decoded, 0.5);

	// string and bytes are mutually readable
	let mut decoded = ByteBuf::default();
	engine(r#""string""#, r#""bytes""#).run(&[0x04, b'o', b'k'][..], &mut decoded)?;
	assert_eq!(decoded.0, b"ok");

	let mut decoded = String::new();
	engine(r#""bytes""#, r#""string""#).run(&[0x04, b'o', b'k'][..], &mut decoded)?;
	assert_eq!(decoded, "ok");
	Ok(())
}

#[derive(Default, Debug, PartialEq)]
struct NestedMapRecord {
	index: f32,
	numbers: HashMap<String, i32>,
}

impl Bind for NestedMapRecord {
	fn bind(&mut self) -> Binding<'_> {
		let Self { index, numbers } = self;
		Binding::record(vec![index.bind(), numbers.bind()])
	}
}

#[test]
fn map_of_records() {
	let schema = r#"{
		"type": "map",
		"values": {
			"type": "record", "name": "NestedMapRecord",
			"fields": [
				{"name": "index", "type": "float"},
				{"name": "numbers", "type": {"type": "map", "values": "int"}}
			]
		}
	}"#;
	let input = [
		0x02, // one outer pair
		0x0a, b'd', b'e', b'm', b'o', b'1', // key "demo1"
		0x00, 0x00, 0x12, 0x34, // index (little-endian float)
		0x02, // one inner pair
		0x0c, b'q', b'u', b'i', b'n', b'c', b'e', // key "quince"
		0x1e, // 15
		0x00, // inner terminator
		0x00, // outer terminator
	];
	let mut decoded: HashMap<String, NestedMapRecord> = HashMap::new();
	engine(schema, schema).run(&input[..], &mut decoded).unwrap();

	assert_eq!(decoded.len(), 1);
	let record = &decoded["demo1"];
	assert_eq!(record.index, f32::from_le_bytes([0x00, 0x00, 0x12, 0x34]));
	assert_eq!(record.numbers, HashMap::from([("quince".to_owned(), 15)]));
}

#[derive(Default, Debug, PartialEq)]
struct TestRec {
	a_int: i32,
	a_bool: bool,
}

impl Bind for TestRec {
	fn bind(&mut self) -> Binding<'_> {
		let Self { a_int, a_bool } = self;
		Binding::record(vec![a_int.bind(), a_bool.bind()])
	}
}

#[test]
fn union_to_non_union_record() {
	let writer = r#"["boolean","int"]"#;
	let reader = r#"{
		"type": "record", "name": "TestRec",
		"fields": [
			{"name": "aInt", "type": "int"},
			{"name": "aBool", "type": "boolean"}
		]
	}"#;

	// Tag 1 selects the int member: aInt is written, aBool keeps its
	// default
	let mut decoded = TestRec::default();
	engine(writer, reader)
		.run(&[0x02, 0x54][..], &mut decoded)
		.unwrap();
	assert_eq!(
		decoded,
		TestRec {
			a_int: 42,
			a_bool: false
		}
	);

	let mut decoded = TestRec::default();
	engine(writer, reader)
		.run(&[0x00, 0x01][..], &mut decoded)
		.unwrap();
	assert_eq!(
		decoded,
		TestRec {
			a_int: 0,
			a_bool: true
		}
	);
}

#[derive(Debug, PartialEq)]
enum IntOrBool {
	Int(i32),
	Bool(bool),
}

impl Default for IntOrBool {
	fn default() -> Self {
		IntOrBool::Int(0)
	}
}

impl UnionBind for IntOrBool {
	fn select(&mut self, tag: i64) -> Result<(), BindingError> {
		*self = match tag {
			0 => IntOrBool::Int(0),
			1 => IntOrBool::Bool(false),
			_ => return Err(BindingError::TagOutOfRange { tag }),
		};
		Ok(())
	}

	fn value(&mut self) -> Result<Binding<'_>, BindingError> {
		Ok(match self {
			IntOrBool::Int(v) => v.bind(),
			IntOrBool::Bool(v) => v.bind(),
		})
	}
}

impl Bind for IntOrBool {
	fn bind(&mut self) -> Binding<'_> {
		Binding::union(self)
	}
}

#[test]
fn equivalent_unions_with_reordered_members() {
	// Writer tag 1 (int) must land on reader member 0 (int)
	let engine = engine(r#"["boolean","int"]"#, r#"["int","boolean"]"#);

	let mut decoded = IntOrBool::default();
	engine.run(&[0x02, 0x54][..], &mut decoded).unwrap();
	assert_eq!(decoded, IntOrBool::Int(42));

	let mut decoded = IntOrBool::default();
	engine.run(&[0x00, 0x01][..], &mut decoded).unwrap();
	assert_eq!(decoded, IntOrBool::Bool(true));
}

#[test]
fn non_union_writer_into_union_reader() {
	// The writer always produces the int member
	let mut decoded: Option<i32> = None;
	engine(r#""int""#, r#"["null","int"]"#)
		.run(&[0x54][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, Some(42));
}

#[test]
fn null_writer_into_optional_union_reader_is_null() {
	// A null writer read through an optional union yields null, never a
	// defaulted member, and consumes no input
	let mut decoded: Option<i32> = Some(7);
	engine(r#""null""#, r#"["null","int"]"#)
		.run(&[][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, None);

	// Same when the reader declares its null member last
	let mut decoded: Option<i32> = Some(7);
	engine(r#""null""#, r#"["int","null"]"#)
		.run(&[][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, None);
}

#[test]
fn union_member_with_complex_type() {
	let schema = r#"["null",{"type":"array","items":"int"}]"#;
	let mut decoded: Option<Vec<i32>> = None;
	engine(schema, schema)
		.run(&[0x02, 0x04, 0x02, 0x04, 0x00][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, Some(vec![1, 2]));

	let mut decoded: Option<Vec<i32>> = Some(vec![7]);
	engine(schema, schema)
		.run(&[0x00][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, None);
}

#[derive(Default, Debug, PartialEq)]
struct Node {
	id: i32,
	next: Option<Box<Node>>,
}

impl Bind for Node {
	fn bind(&mut self) -> Binding<'_> {
		let Self { id, next } = self;
		Binding::record(vec![id.bind(), next.bind()])
	}
}

#[test]
fn cyclic_record_decodes_a_linked_list() {
	let schema = r#"{
		"type": "record", "name": "Node",
		"fields": [
			{"name": "id", "type": "int"},
			{"name": "next", "type": ["null","Node"]}
		]
	}"#;
	// 1 -> 2 -> 3 -> null
	let input = [0x02, 0x02, 0x04, 0x02, 0x06, 0x00];
	let mut decoded = Node::default();
	engine(schema, schema).run(&input[..], &mut decoded).unwrap();
	assert_eq!(
		decoded,
		Node {
			id: 1,
			next: Some(Box::new(Node {
				id: 2,
				next: Some(Box::new(Node { id: 3, next: None })),
			})),
		}
	);
}

#[derive(Default, Debug, PartialEq)]
struct WithExtras {
	a: i32,
	b: i64,
}

impl Bind for WithExtras {
	fn bind(&mut self) -> Binding<'_> {
		let Self { a, b } = self;
		Binding::record(vec![a.bind(), b.bind()])
	}
}

#[test]
fn writer_only_fields_are_discarded() {
	// The map and string fields exist only on the writer side and must be
	// drained without a target
	let writer = r#"{
		"type": "record", "name": "Rec",
		"fields": [
			{"name": "a", "type": "int"},
			{"name": "dropped", "type": {"type": "map", "values": "int"}},
			{"name": "note", "type": "string"},
			{"name": "b", "type": "long"}
		]
	}"#;
	let reader = r#"{
		"type": "record", "name": "Rec",
		"fields": [
			{"name": "a", "type": "int"},
			{"name": "b", "type": "long"}
		]
	}"#;
	let input = [
		0x02, // a = 1
		0x02, 0x02, b'k', 0x0e, 0x00, // dropped = {"k": 7}
		0x04, b'n', b'o', // note = "no"
		0x06, // b = 3
	];
	let mut decoded = WithExtras::default();
	engine(writer, reader).run(&input[..], &mut decoded).unwrap();
	assert_eq!(decoded, WithExtras { a: 1, b: 3 });
}

#[test]
fn reader_field_with_default_is_skipped() {
	let writer = r#"{
		"type": "record", "name": "Rec",
		"fields": [{"name": "a", "type": "int"}]
	}"#;
	let reader = r#"{
		"type": "record", "name": "Rec",
		"fields": [
			{"name": "a", "type": "int"},
			{"name": "b", "type": "long", "default": 0}
		]
	}"#;
	let mut decoded = WithExtras::default();
	engine(writer, reader).run(&[0x54][..], &mut decoded).unwrap();
	// The default itself is never materialized; the slot keeps the
	// target's zero value
	assert_eq!(decoded, WithExtras { a: 42, b: 0 });
}

#[test]
fn field_matched_through_aliases() {
	let writer = r#"{
		"type": "record", "name": "Rec",
		"fields": [
			{"name": "old", "type": "int"},
			{"name": "b", "type": "long"}
		]
	}"#;
	let reader = r#"{
		"type": "record", "name": "Rec",
		"fields": [
			{"name": "a", "aliases": ["old"], "type": "int"},
			{"name": "b", "type": "long"}
		]
	}"#;
	let mut decoded = WithExtras::default();
	engine(writer, reader)
		.run(&[0x54, 0x06][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, WithExtras { a: 42, b: 3 });
}

#[test]
fn enum_ordinals_and_fixed_bytes() -> anyhow::Result<()> {
	let enum_schema = r#"{"type":"enum","name":"Suit","symbols":["SPADES","HEARTS","CLUBS"]}"#;
	let mut decoded: i32 = 0;
	engine(enum_schema, enum_schema).run(&[0x02][..], &mut decoded)?;
	assert_eq!(decoded, 1); // HEARTS

	let fixed_schema = r#"{"type":"fixed","name":"Pair","size":2}"#;
	let mut decoded = [0u8; 2];
	engine(fixed_schema, fixed_schema).run(&[0xca, 0xfe][..], &mut decoded)?;
	assert_eq!(decoded, [0xca, 0xfe]);
	Ok(())
}

#[test]
fn array_of_longs() {
	let schema = r#"{"type":"array","items":"long"}"#;
	let mut decoded: Vec<i64> = Vec::new();
	engine(schema, schema)
		.run(&[0x06, 0x02, 0x06, 0x04, 0x00][..], &mut decoded)
		.unwrap();
	assert_eq!(decoded, [1, 3, 2]);
}

mod boundaries {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn zero_length_string_and_bytes() {
		let mut decoded = "seed".to_owned();
		engine(r#""string""#, r#""string""#)
			.run(&[0x00][..], &mut decoded)
			.unwrap();
		assert_eq!(decoded, "");

		let mut decoded = ByteBuf(vec![1]);
		engine(r#""bytes""#, r#""bytes""#)
			.run(&[0x00][..], &mut decoded)
			.unwrap();
		assert_eq!(decoded.0, Vec::<u8>::new());
	}

	#[test]
	fn empty_blocks() {
		let mut decoded: HashMap<String, i32> = HashMap::new();
		engine(
			r#"{"type":"map","values":"int"}"#,
			r#"{"type":"map","values":"int"}"#,
		)
		.run(&[0x00][..], &mut decoded)
		.unwrap();
		assert!(decoded.is_empty());

		let mut decoded: Vec<i32> = Vec::new();
		engine(
			r#"{"type":"array","items":"int"}"#,
			r#"{"type":"array","items":"int"}"#,
		)
		.run(&[0x00][..], &mut decoded)
		.unwrap();
		assert!(decoded.is_empty());
	}

	#[test]
	fn negative_block_count_carries_a_byte_length_hint() {
		// Count -2 (zig-zag 0x03), a byte-length hint of 2 that is read
		// and dropped, then the two items
		let mut decoded: Vec<i32> = Vec::new();
		engine(
			r#"{"type":"array","items":"int"}"#,
			r#"{"type":"array","items":"int"}"#,
		)
		.run(&[0x03, 0x04, 0x54, 0x2a, 0x00][..], &mut decoded)
		.unwrap();
		assert_eq!(decoded, [42, 21]);
	}

	#[test]
	fn multiple_block_runs_accumulate() {
		let mut decoded: Vec<i32> = Vec::new();
		engine(
			r#"{"type":"array","items":"int"}"#,
			r#"{"type":"array","items":"int"}"#,
		)
		.run(&[0x02, 0x02, 0x02, 0x04, 0x00][..], &mut decoded)
		.unwrap();
		assert_eq!(decoded, [1, 2]);
	}

	#[test]
	fn truncated_input_is_an_error() {
		let mut decoded: i32 = 0;
		let error = engine(r#""int""#, r#""int""#)
			.run(&[][..], &mut decoded)
			.unwrap_err();
		assert!(error.to_string().contains("end of input"), "{error}");
	}

	#[test]
	fn unknown_union_tag_halts() {
		let mut decoded: Option<i32> = None;
		let error = engine(r#"["null","int"]"#, r#"["null","int"]"#)
			.run(&[0x08][..], &mut decoded)
			.unwrap_err();
		assert_eq!(
			error.to_string(),
			"execution halted: invalid index for union"
		);
	}

	#[test]
	fn stack_traces_name_the_program_counter() {
		let mut engine = engine(r#"["null","int"]"#, r#"["null","int"]"#);
		engine.stack_traces = true;
		let mut decoded: Option<i32> = None;
		let error = engine.run(&[0x08][..], &mut decoded).unwrap_err();
		let message = error.to_string();
		assert!(
			message.contains("execution halted: invalid index for union"),
			"{message}"
		);
		assert!(message.contains("at pc 4: 'halt (0)'"), "{message}");
	}
}
