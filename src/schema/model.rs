//! The arena-backed schema graph and its node types

use super::Name;

/// A parsed Avro schema
///
/// References to other nodes are represented as [`SchemaKey`], which index
/// into the node arena. Due to how referencing via names works in Avro, a
/// schema is not a tree but a possibly-cyclic directed graph, and stable
/// indexes are the safe way to represent that.
///
/// The first node is the root of the schema. A `Schema` can only be obtained
/// through parsing ([`str::parse`]), which guarantees that every named
/// reference has been resolved and every [`SchemaKey`] is in range.
#[derive(Clone, Debug)]
pub struct Schema {
	// First node in the array is the root
	pub(crate) nodes: Vec<SchemaNode>,
	pub(crate) schema_json: String,
	pub(crate) canonical_form: String,
}

impl Schema {
	/// Obtain the underlying graph storage
	///
	/// [`SchemaKey`]s can be converted to indexes of this slice.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// Obtain the root node of the schema
	pub fn root(&self) -> &SchemaNode {
		&self.nodes[SchemaKey::root().idx]
	}

	/// Try to get the node at the given [`SchemaKey`]
	///
	/// (or return `None` if the key is out of range)
	pub fn get(&self, key: SchemaKey) -> Option<&SchemaNode> {
		self.nodes.get(key.idx)
	}

	/// The original schema JSON, minified
	pub fn schema_json(&self) -> &str {
		&self.schema_json
	}

	/// The canonical form of the schema: fully-qualified names, normalized
	/// attribute order, non-essential attributes stripped
	pub fn canonical_form(&self) -> &str {
		&self.canonical_form
	}

	/// Whether data written with this schema can be read through `reader`
	/// under the Avro schema-resolution rules
	pub fn readable_by(&self, reader: &Schema) -> bool {
		super::compat::node_readable_by(
			self,
			SchemaKey::root(),
			reader,
			SchemaKey::root(),
			&mut Default::default(),
		)
	}
}

impl std::ops::Index<SchemaKey> for Schema {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &Self::Output {
		&self.nodes[key.idx]
	}
}

/// The location of a node in a [`Schema`]
///
/// This can be used to [`Index`](std::ops::Index) into the [`Schema`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
	pub(crate) idx: usize,
}

impl SchemaKey {
	/// Obtain the index in the [`nodes`](Schema::nodes) slice that this
	/// [`SchemaKey`] points to
	pub const fn idx(self) -> usize {
		self.idx
	}

	/// The key of the root of a schema (always its first node)
	pub const fn root() -> Self {
		Self { idx: 0 }
	}
}

impl std::fmt::Debug for SchemaKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.idx, f)
	}
}

/// A node of an Avro schema, stored in a [`Schema`]
///
/// References to other nodes are represented as [`SchemaKey`], which index
/// into the [`Schema`]'s node arena.
#[derive(Clone, Debug)]
pub enum SchemaNode {
	/// A `null` Avro schema
	Null,
	/// A `boolean` Avro schema
	Boolean,
	/// An `int` (32-bit signed) Avro schema
	Int,
	/// A `long` (64-bit signed) Avro schema
	Long,
	/// A `float` (32-bit IEEE-754) Avro schema
	Float,
	/// A `double` (64-bit IEEE-754) Avro schema
	Double,
	/// A `bytes` Avro schema
	Bytes,
	/// A `string` (UTF-8) Avro schema
	String,
	/// An `array` Avro schema; the key is the item type
	Array(SchemaKey),
	/// A `map` Avro schema (string keys); the key is the value type
	Map(SchemaKey),
	/// A `union` Avro schema
	Union(Union),
	/// A `record` Avro schema
	Record(Record),
	/// An `enum` Avro schema
	Enum(Enum),
	/// A `fixed` Avro schema
	Fixed(Fixed),
}

impl SchemaNode {
	/// The logical name of this node, used for display and for
	/// compatibility diagnostics: primitive/composite type names for
	/// anonymous nodes, the fully qualified name for named ones
	pub fn logical_name(&self) -> &str {
		match self {
			SchemaNode::Null => "null",
			SchemaNode::Boolean => "boolean",
			SchemaNode::Int => "int",
			SchemaNode::Long => "long",
			SchemaNode::Float => "float",
			SchemaNode::Double => "double",
			SchemaNode::Bytes => "bytes",
			SchemaNode::String => "string",
			SchemaNode::Array(_) => "array",
			SchemaNode::Map(_) => "map",
			SchemaNode::Union(_) => "union",
			SchemaNode::Record(record) => record.name.fully_qualified_name(),
			SchemaNode::Enum(enum_) => enum_.name.fully_qualified_name(),
			SchemaNode::Fixed(fixed) => fixed.name.fully_qualified_name(),
		}
	}
}

/// Component of a [`SchemaNode`]
#[derive(Clone, Debug)]
pub struct Union {
	/// The member types, in declaration order (the wire tag is the index in
	/// this list)
	pub variants: Vec<SchemaKey>,
	/// The position of the single `null` member, if there is one
	///
	/// A union with a `null` member is "optional"; one with exactly one
	/// other member besides the `null` is "simple".
	pub optional_index: Option<usize>,
}

impl Union {
	pub fn is_optional(&self) -> bool {
		self.optional_index.is_some()
	}

	pub fn is_simple(&self) -> bool {
		self.is_optional() && self.variants.len() == 2
	}
}

/// Component of a [`SchemaNode`]
#[derive(Clone, Debug)]
pub struct Record {
	/// The name of the record, including the namespace
	pub name: Name,
	/// Alternative names this record is known under
	pub aliases: Vec<Name>,
	pub doc: Option<String>,
	/// The fields, in declaration order (which is also the wire order and
	/// the record-local positional index)
	pub fields: Vec<RecordField>,
	/// Canonical form of this record's subtree, for use by generated
	/// readers
	pub canonical_schema: String,
}

/// Component of a [`Record`]
///
/// The field's positional index is its position in the
/// [`fields`](Record::fields) vector.
#[derive(Clone, Debug)]
pub struct RecordField {
	pub name: String,
	/// Alternative names this field is known under (no namespace)
	pub aliases: Vec<String>,
	pub doc: Option<String>,
	/// Whether a `default` was declared for this field
	///
	/// Default values are never materialized, but their presence decides
	/// whether a reader field missing from the writer is an error.
	pub has_default: bool,
	pub schema: SchemaKey,
}

impl RecordField {
	/// Whether this field answers to `name`, either as its primary name or
	/// through one of its aliases
	pub(crate) fn also_known_as(&self, name: &str) -> bool {
		self.name == name || self.aliases.iter().any(|alias| alias == name)
	}
}

/// Component of a [`SchemaNode`]
#[derive(Clone, Debug)]
pub struct Enum {
	/// The name of the enum, including the namespace
	pub name: Name,
	pub aliases: Vec<Name>,
	pub doc: Option<String>,
	/// The symbols; the wire representation of a value is its index here
	pub symbols: Vec<String>,
}

/// Component of a [`SchemaNode`]
#[derive(Clone, Debug)]
pub struct Fixed {
	/// The name of the fixed type, including the namespace
	pub name: Name,
	pub aliases: Vec<Name>,
	/// The exact size in bytes of every value of this type
	pub size: usize,
}
