//! Schema parsing, name resolution and compatibility

use {avro_resolver::Schema, pretty_assertions::assert_eq};

fn parse(json: &str) -> Schema {
	json.parse().expect("Failed to parse schema")
}

#[test]
fn parses_primitives_and_named_types() {
	parse(r#""int""#);
	parse(r#"{"type":"fixed","name":"Sync","size":16}"#);
	parse(r#"{"type":"enum","name":"Suit","symbols":["SPADES","HEARTS"]}"#);
	parse(r#"{"type":"array","items":"long"}"#);
	parse(r#"{"type":"map","values":"string"}"#);
	parse(r#"["null","int"]"#);
}

#[test]
fn name_with_a_dot_is_a_fullname() {
	let schema = parse(
		r#"{
			"type": "record",
			"name": "org.demo.Test",
			"namespace": "ignored",
			"fields": [{"name": "f", "type": "long"}]
		}"#,
	);
	assert_eq!(
		schema.canonical_form(),
		r#"{"name":"org.demo.Test","type":"record","fields":[{"name":"f","type":"long"}]}"#
	);
}

#[test]
fn enclosing_namespace_propagates_to_nested_names() {
	let schema = parse(
		r#"{
			"type": "record",
			"name": "Outer",
			"namespace": "org.demo",
			"fields": [
				{
					"name": "inner",
					"type": {
						"type": "record",
						"name": "Inner",
						"fields": [{"name": "f", "type": "int"}]
					}
				},
				{"name": "again", "type": "Inner"}
			]
		}"#,
	);
	// Both the nested definition and the reference resolve under org.demo
	assert_eq!(
		schema.canonical_form(),
		concat!(
			r#"{"name":"org.demo.Outer","type":"record","fields":["#,
			r#"{"name":"inner","type":{"name":"org.demo.Inner","type":"record","fields":[{"name":"f","type":"int"}]}},"#,
			r#"{"name":"again","type":"org.demo.Inner"}]}"#
		)
	);
}

#[test]
fn forward_references_resolve() {
	// `next` references Node before... well, while it is being defined
	let schema = parse(
		r#"{
			"type": "record",
			"name": "Node",
			"fields": [
				{"name": "next", "type": ["null", "Node"]},
				{"name": "id", "type": "int"}
			]
		}"#,
	);
	assert_eq!(
		schema.canonical_form(),
		r#"{"name":"Node","type":"record","fields":[{"name":"next","type":["null","Node"]},{"name":"id","type":"int"}]}"#
	);
}

#[test]
fn records_capture_their_canonical_schema() {
	let schema = parse(
		r#"{
			"type": "record",
			"name": "Test",
			"namespace": "org.demo",
			"doc": "docs are stripped",
			"aliases": ["OldTest"],
			"fields": [{"name": "f", "type": "long", "doc": "also stripped"}]
		}"#,
	);
	let record = match schema.root() {
		avro_resolver::schema::SchemaNode::Record(record) => record,
		other => panic!("expected a record, got {}", other.logical_name()),
	};
	assert_eq!(
		record.canonical_schema,
		r#"{"name":"org.demo.Test","type":"record","fields":[{"name":"f","type":"long"}]}"#
	);
	assert_eq!(record.doc.as_deref(), Some("docs are stripped"));
	assert_eq!(record.aliases.len(), 1);
	assert_eq!(record.aliases[0].fully_qualified_name(), "org.demo.OldTest");
}

#[test]
fn schema_json_is_minified() {
	let schema = parse("{ \"type\" : \"array\" ,\n\t\"items\" : \"int\" }");
	assert_eq!(schema.schema_json(), r#"{"type":"array","items":"int"}"#);
}

mod parse_errors {
	use super::*;
	use pretty_assertions::assert_eq;

	fn parse_error(json: &str) -> String {
		json.parse::<Schema>().unwrap_err().to_string()
	}

	#[test]
	fn missing_required_keys() {
		assert!(parse_error(r#"{"type":"record","name":"R"}"#).contains("fields"));
		assert!(parse_error(r#"{"type":"enum","name":"E"}"#).contains("symbols"));
		assert!(parse_error(r#"{"type":"fixed","name":"F"}"#).contains("size"));
		assert!(parse_error(r#"{"type":"array"}"#).contains("items"));
		assert!(parse_error(r#"{"type":"map"}"#).contains("values"));
		assert!(parse_error(r#"{"type":"record","fields":[]}"#).contains("name"));
	}

	#[test]
	fn negative_fixed_size() {
		assert_eq!(
			parse_error(r#"{"type":"fixed","name":"F","size":-2}"#),
			"'size' must be a positive integer"
		);
	}

	#[test]
	fn duplicate_named_types() {
		let error = parse_error(
			r#"{
				"type": "record", "name": "R",
				"fields": [
					{"name": "a", "type": {"type": "fixed", "name": "F", "size": 1}},
					{"name": "b", "type": {"type": "fixed", "name": "F", "size": 2}}
				]
			}"#,
		);
		assert_eq!(error, "The Schema contains duplicate definitions for F");
	}

	#[test]
	fn unknown_reference() {
		let error = parse_error(
			r#"{
				"type": "record", "name": "R",
				"fields": [{"name": "a", "type": "Missing"}]
			}"#,
		);
		assert_eq!(error, "The Schema contains an unknown reference: Missing");
	}

	#[test]
	fn conflicting_alias() {
		let error = parse_error(
			r#"{
				"type": "record", "name": "R",
				"fields": [
					{"name": "a", "type": {"type": "fixed", "name": "F", "size": 1}},
					{"name": "b", "type": {"type": "fixed", "name": "G", "aliases": ["F"], "size": 1}}
				]
			}"#,
		);
		assert!(error.starts_with("Alias F for G conflicts"), "{error}");
	}

	#[test]
	fn union_validation() {
		assert_eq!(
			parse_error(r#"["null","int","null"]"#),
			"Union may contain at most one null member"
		);
		assert_eq!(
			parse_error(r#"["int",["null","long"]]"#),
			"Unions may not immediately contain other unions"
		);
	}

	#[test]
	fn duplicate_enum_symbols() {
		assert!(
			parse_error(r#"{"type":"enum","name":"E","symbols":["A","A"]}"#)
				.contains("duplicate symbol"),
		);
	}

	#[test]
	fn forbids_zero_sized_cycles() {
		let error = parse_error(
			r#"{
				"type": "record",
				"name": "A",
				"fields": [
					{
						"name": "a",
						"type": {
							"type": "record",
							"name": "B",
							"fields": [{"name": "b", "type": "A"}]
						}
					}
				]
			}"#,
		);
		assert_eq!(
			error,
			"The schema contains a record that ends up always containing itself"
		);
	}

	#[test]
	fn aliases_must_be_strings() {
		assert!(!parse_error(
			r#"{"type":"fixed","name":"F","aliases":[7],"size":1}"#
		)
		.is_empty());
	}
}

mod compatibility {
	use super::*;

	fn readable(writer: &str, reader: &str) -> bool {
		parse(writer).readable_by(&parse(reader))
	}

	#[test]
	fn numeric_promotion_is_widening_only() {
		for (writer, readers) in [
			(r#""int""#, vec![r#""int""#, r#""long""#, r#""float""#, r#""double""#]),
			(r#""long""#, vec![r#""long""#, r#""float""#, r#""double""#]),
			(r#""float""#, vec![r#""float""#, r#""double""#]),
			(r#""double""#, vec![r#""double""#]),
		] {
			for reader in readers {
				assert!(readable(writer, reader), "{writer} -> {reader}");
			}
		}
		assert!(!readable(r#""long""#, r#""int""#));
		assert!(!readable(r#""double""#, r#""float""#));
		assert!(!readable(r#""int""#, r#""string""#));
	}

	#[test]
	fn string_and_bytes_are_interchangeable() {
		assert!(readable(r#""string""#, r#""bytes""#));
		assert!(readable(r#""bytes""#, r#""string""#));
		assert!(!readable(r#""bytes""#, r#""int""#));
	}

	#[test]
	fn enums_match_by_name() {
		let suit = r#"{"type":"enum","name":"Suit","symbols":["S","H"]}"#;
		let same_name = r#"{"type":"enum","name":"Suit","symbols":["S","H","C"]}"#;
		let other = r#"{"type":"enum","name":"Other","symbols":["S","H"]}"#;
		assert!(readable(suit, same_name));
		assert!(!readable(suit, other));
	}

	#[test]
	fn fixed_match_by_name_and_size() {
		let fixed = r#"{"type":"fixed","name":"F","size":4}"#;
		assert!(readable(fixed, r#"{"type":"fixed","name":"F","size":4}"#));
		assert!(!readable(fixed, r#"{"type":"fixed","name":"F","size":8}"#));
		assert!(!readable(fixed, r#"{"type":"fixed","name":"G","size":4}"#));
	}

	#[test]
	fn containers_recurse_on_their_children() {
		assert!(readable(
			r#"{"type":"array","items":"int"}"#,
			r#"{"type":"array","items":"long"}"#
		));
		assert!(!readable(
			r#"{"type":"array","items":"long"}"#,
			r#"{"type":"array","items":"int"}"#
		));
		assert!(readable(
			r#"{"type":"map","values":"string"}"#,
			r#"{"type":"map","values":"bytes"}"#
		));
		assert!(!readable(
			r#"{"type":"map","values":"string"}"#,
			r#"{"type":"array","items":"string"}"#
		));
	}

	#[test]
	fn reader_fields_need_a_writer_field_or_a_default() {
		let writer = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#;
		let with_default = r#"{
			"type": "record", "name": "R",
			"fields": [
				{"name": "a", "type": "int"},
				{"name": "b", "type": "long", "default": 0}
			]
		}"#;
		let without_default = r#"{
			"type": "record", "name": "R",
			"fields": [
				{"name": "a", "type": "int"},
				{"name": "b", "type": "long"}
			]
		}"#;
		assert!(readable(writer, with_default));
		assert!(!readable(writer, without_default));
		// A null default still counts as a default
		let with_null_default = r#"{
			"type": "record", "name": "R",
			"fields": [
				{"name": "a", "type": "int"},
				{"name": "b", "type": ["null","long"], "default": null}
			]
		}"#;
		assert!(readable(writer, with_null_default));
	}

	#[test]
	fn union_rules() {
		// Two optional unions are mutually compatible
		assert!(readable(r#"["null","int"]"#, r#"["null","string"]"#));
		// Union to union: at least one writer member readable by a reader
		// member
		assert!(readable(r#"["int","string"]"#, r#"["long","boolean"]"#));
		assert!(!readable(r#"["int","string"]"#, r#"["boolean","bytes"]"#));
		// Non-union to union
		assert!(readable(r#""int""#, r#"["null","int"]"#));
		assert!(!readable(r#""string""#, r#"["null","int"]"#));
		// Union to non-union
		assert!(readable(r#"["boolean","int"]"#, r#""int""#));
		assert!(!readable(r#"["boolean","string"]"#, r#""int""#));
	}

	#[test]
	fn cyclic_records_terminate() {
		let node = r#"{
			"type": "record", "name": "Node",
			"fields": [
				{"name": "id", "type": "int"},
				{"name": "next", "type": ["null","Node"]}
			]
		}"#;
		assert!(readable(node, node));

		let wider = r#"{
			"type": "record", "name": "Node",
			"fields": [
				{"name": "id", "type": "long"},
				{"name": "next", "type": ["null","Node"]}
			]
		}"#;
		assert!(readable(node, wider));
		assert!(!readable(wider, node));
	}

	#[test]
	fn record_fields_match_through_aliases() {
		let writer = r#"{"type":"record","name":"R","fields":[{"name":"old","type":"int"}]}"#;
		let reader =
			r#"{"type":"record","name":"R","fields":[{"name":"new","aliases":["old"],"type":"int"}]}"#;
		assert!(readable(writer, reader));
	}
}
