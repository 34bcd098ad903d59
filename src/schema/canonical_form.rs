//! Rendering of the canonical form of a schema subtree
//!
//! Canonical form strips everything that does not affect the wire format:
//! docs, aliases and defaults are dropped, names are fully qualified,
//! attributes are emitted in a normalized order, and a named type that was
//! already defined earlier in the same rendering is referenced by name
//! (which is also what makes rendering terminate on cyclic schemas).

use super::{SchemaKey, SchemaNode};

use std::collections::HashSet;

pub(crate) fn canonical_form(nodes: &[SchemaNode], key: SchemaKey) -> String {
	let mut out = String::new();
	let mut defined_names = HashSet::new();
	write_node(&mut out, nodes, key, &mut defined_names);
	out
}

fn write_node(
	out: &mut String,
	nodes: &[SchemaNode],
	key: SchemaKey,
	defined_names: &mut HashSet<String>,
) {
	match &nodes[key.idx()] {
		SchemaNode::Null => out.push_str("\"null\""),
		SchemaNode::Boolean => out.push_str("\"boolean\""),
		SchemaNode::Int => out.push_str("\"int\""),
		SchemaNode::Long => out.push_str("\"long\""),
		SchemaNode::Float => out.push_str("\"float\""),
		SchemaNode::Double => out.push_str("\"double\""),
		SchemaNode::Bytes => out.push_str("\"bytes\""),
		SchemaNode::String => out.push_str("\"string\""),
		SchemaNode::Array(items) => {
			out.push_str("{\"type\":\"array\",\"items\":");
			write_node(out, nodes, *items, defined_names);
			out.push('}');
		}
		SchemaNode::Map(values) => {
			out.push_str("{\"type\":\"map\",\"values\":");
			write_node(out, nodes, *values, defined_names);
			out.push('}');
		}
		SchemaNode::Union(union) => {
			out.push('[');
			for (i, &variant) in union.variants.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write_node(out, nodes, variant, defined_names);
			}
			out.push(']');
		}
		SchemaNode::Record(record) => {
			if !defined_names.insert(record.name.fully_qualified_name().to_owned()) {
				write_json_str(out, record.name.fully_qualified_name());
				return;
			}
			out.push_str("{\"name\":");
			write_json_str(out, record.name.fully_qualified_name());
			out.push_str(",\"type\":\"record\",\"fields\":[");
			for (i, field) in record.fields.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				out.push_str("{\"name\":");
				write_json_str(out, &field.name);
				out.push_str(",\"type\":");
				write_node(out, nodes, field.schema, defined_names);
				out.push('}');
			}
			out.push_str("]}");
		}
		SchemaNode::Enum(enum_) => {
			if !defined_names.insert(enum_.name.fully_qualified_name().to_owned()) {
				write_json_str(out, enum_.name.fully_qualified_name());
				return;
			}
			out.push_str("{\"name\":");
			write_json_str(out, enum_.name.fully_qualified_name());
			out.push_str(",\"type\":\"enum\",\"symbols\":[");
			for (i, symbol) in enum_.symbols.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write_json_str(out, symbol);
			}
			out.push_str("]}");
		}
		SchemaNode::Fixed(fixed) => {
			if !defined_names.insert(fixed.name.fully_qualified_name().to_owned()) {
				write_json_str(out, fixed.name.fully_qualified_name());
				return;
			}
			out.push_str("{\"name\":");
			write_json_str(out, fixed.name.fully_qualified_name());
			out.push_str(",\"type\":\"fixed\",\"size\":");
			out.push_str(&fixed.size.to_string());
			out.push('}');
		}
	}
}

fn write_json_str(out: &mut String, s: &str) {
	// serde_json gives us proper escaping
	out.push_str(&serde_json::to_string(s).expect("string serialization is infallible"));
}
