//! The schema-resolution compatibility predicate
//!
//! "`W` is readable by `R`" means that data written with schema `W` can be
//! deserialized through reader schema `R`.

use super::{Record, Schema, SchemaKey, SchemaNode};

use std::collections::HashSet;

/// Set of writer record fullnames currently under evaluation
///
/// Re-entering a record already in this set means we hit a reference cycle;
/// the recursion assumes compatibility there and lets the outer evaluation
/// decide.
pub(crate) type VisitSet = HashSet<String>;

pub(crate) fn node_readable_by(
	w: &Schema,
	wk: SchemaKey,
	r: &Schema,
	rk: SchemaKey,
	visited: &mut VisitSet,
) -> bool {
	match (&w[wk], &r[rk]) {
		(SchemaNode::Union(w_union), SchemaNode::Union(r_union)) => {
			// The null branch covers two optional unions regardless of the
			// rest of their members
			if w_union.is_optional() && r_union.is_optional() {
				return true;
			}
			w_union.variants.iter().any(|&wv| {
				r_union
					.variants
					.iter()
					.any(|&rv| node_readable_by(w, wv, r, rv, visited))
			})
		}
		(SchemaNode::Union(w_union), _) => w_union
			.variants
			.iter()
			.any(|&wv| node_readable_by(w, wv, r, rk, visited)),
		(_, SchemaNode::Union(r_union)) => r_union
			.variants
			.iter()
			.any(|&rv| node_readable_by(w, wk, r, rv, visited)),
		(SchemaNode::Record(w_record), SchemaNode::Record(r_record)) => {
			record_readable_by(w, w_record, r, r_record, visited)
		}
		(SchemaNode::Enum(w_enum), SchemaNode::Enum(r_enum)) => {
			w_enum.name.fully_qualified_name() == r_enum.name.fully_qualified_name()
		}
		(SchemaNode::Fixed(w_fixed), SchemaNode::Fixed(r_fixed)) => {
			w_fixed.name.fully_qualified_name() == r_fixed.name.fully_qualified_name()
				&& w_fixed.size == r_fixed.size
		}
		(&SchemaNode::Array(w_items), &SchemaNode::Array(r_items)) => {
			node_readable_by(w, w_items, r, r_items, visited)
		}
		(&SchemaNode::Map(w_values), &SchemaNode::Map(r_values)) => {
			node_readable_by(w, w_values, r, r_values, visited)
		}
		(w_node, r_node) => primitive_readable_by(w_node, r_node),
	}
}

fn record_readable_by(
	w: &Schema,
	w_record: &Record,
	r: &Schema,
	r_record: &Record,
	visited: &mut VisitSet,
) -> bool {
	// If there's a circular reference, don't evaluate every field on the
	// second pass
	let fullname = w_record.name.fully_qualified_name();
	if !visited.insert(fullname.to_owned()) {
		return true;
	}

	for reader_field in &r_record.fields {
		match find_field_position(w_record, reader_field.name.as_str(), &reader_field.aliases)
			.map(|idx| &w_record.fields[idx])
		{
			// Incompatible if the reader has a field with no default value
			// that is not present in the writer schema
			None => {
				if !reader_field.has_default {
					return false;
				}
			}
			// Incompatible if two fields with the same name have
			// incompatible schemas
			Some(writer_field) => {
				if !node_readable_by(w, writer_field.schema, r, reader_field.schema, visited) {
					return false;
				}
			}
		}
	}
	true
}

/// Find the position of the record field matching a given name, checking
/// both the record's fields' aliases against the name and the given
/// aliases against the fields' names
pub(crate) fn find_field_position(record: &Record, name: &str, aliases: &[String]) -> Option<usize> {
	record.fields.iter().position(|field| {
		field.also_known_as(name) || aliases.iter().any(|alias| field.also_known_as(alias))
	})
}

/// Promotion is one-way and widening only: `int ⊆ long ⊆ float ⊆ double`;
/// `string` and `bytes` are mutually readable
fn primitive_readable_by(w: &SchemaNode, r: &SchemaNode) -> bool {
	use SchemaNode::*;
	matches!(
		(w, r),
		(Null, Null)
			| (Boolean, Boolean)
			| (Int, Int | Long | Float | Double)
			| (Long, Long | Float | Double)
			| (Float, Float | Double)
			| (Double, Double)
			| (String, String | Bytes)
			| (Bytes, Bytes | String)
	)
}
