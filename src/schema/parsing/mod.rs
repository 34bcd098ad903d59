mod raw;

use crate::schema::*;

use std::collections::HashMap;

const LATE_NAME_LOOKUP_REMAP_BIT: usize = 1usize << (usize::BITS - 1);

struct SchemaConstructionState<'a> {
	nodes: Vec<SchemaNode>,
	names: HashMap<NameKey<'a>, usize>,
	unresolved_names: Vec<NameKey<'a>>,
}

impl std::str::FromStr for Schema {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut state = SchemaConstructionState {
			nodes: Vec::new(),
			names: HashMap::new(),
			unresolved_names: Vec::new(),
		};

		let raw_schema: raw::SchemaNode =
			serde_json::from_str(s).map_err(SchemaError::serde_json)?;

		state.register_node(&raw_schema, None)?;

		// Support for unordered name definitions
		if !state.unresolved_names.is_empty() {
			let resolved_names: Vec<SchemaKey> = state
				.unresolved_names
				.into_iter()
				.map(|name| {
					state
						.names
						.get(&name)
						.ok_or(SchemaError::msg(format_args!(
							"The Schema contains an unknown reference: {}",
							name,
						)))
						.map(|&idx| SchemaKey { idx })
				})
				.collect::<Result<_, _>>()?;
			let fix_key = |key: &mut SchemaKey| {
				if key.idx & LATE_NAME_LOOKUP_REMAP_BIT != 0 {
					*key = resolved_names[key.idx ^ LATE_NAME_LOOKUP_REMAP_BIT];
				}
			};
			for schema_node in &mut state.nodes {
				match schema_node {
					SchemaNode::Array(key) | SchemaNode::Map(key) => fix_key(key),
					SchemaNode::Union(union) => union.variants.iter_mut().for_each(fix_key),
					SchemaNode::Record(record) => {
						record.fields.iter_mut().for_each(|f| fix_key(&mut f.schema))
					}
					SchemaNode::Null
					| SchemaNode::Boolean
					| SchemaNode::Int
					| SchemaNode::Long
					| SchemaNode::Float
					| SchemaNode::Double
					| SchemaNode::Bytes
					| SchemaNode::String
					| SchemaNode::Enum(_)
					| SchemaNode::Fixed(_) => {}
				}
			}
		}

		reject_zero_sized_cycles(&state.nodes)?;

		// Capture the canonical form of every record subtree now that all
		// references are resolved
		let record_forms: Vec<(usize, String)> = state
			.nodes
			.iter()
			.enumerate()
			.filter(|(_, node)| matches!(node, SchemaNode::Record(_)))
			.map(|(idx, _)| (idx, canonical_form(&state.nodes, SchemaKey { idx })))
			.collect();
		for (idx, form) in record_forms {
			if let SchemaNode::Record(record) = &mut state.nodes[idx] {
				record.canonical_schema = form;
			}
		}

		let root_canonical_form = canonical_form(&state.nodes, SchemaKey::root());
		let schema = Schema {
			nodes: state.nodes,
			canonical_form: root_canonical_form,
			schema_json: String::from_utf8({
				// Sanitize & minify json, preserving all keys.
				let mut serializer = serde_json::Serializer::new(Vec::new());
				serde_transcode::transcode(
					&mut serde_json::Deserializer::from_str(s),
					&mut serializer,
				)
				.map_err(SchemaError::serde_json)?;
				serializer.into_inner()
			})
			.map_err(|e| {
				SchemaError::msg(format_args!(
					"serde_json should not emit invalid UTF-8 but got {e}"
				))
			})?,
		};

		Ok(schema)
	}
}

/// Reject records that end up always containing themselves.
///
/// Decoding such a record would recurse without consuming a single byte;
/// every other kind of node on a path through the graph reads at least a
/// union discriminant or a block count first, which is why only chains of
/// record-typed fields matter (and why conditional self-reference, e.g.
/// through an optional union, stays legal). Records are cleared bottom-up:
/// one whose record-typed fields all lead to already-cleared nodes cannot
/// recurse forever, and anything still uncleared at the fixpoint sits on,
/// or feeds into, a record-only cycle.
fn reject_zero_sized_cycles(nodes: &[SchemaNode]) -> Result<(), SchemaError> {
	// Non-record nodes break the chain, so they start cleared
	let mut finite: Vec<bool> = nodes
		.iter()
		.map(|node| !matches!(node, SchemaNode::Record(_)))
		.collect();
	let mut progressed = true;
	while progressed {
		progressed = false;
		for (idx, node) in nodes.iter().enumerate() {
			if finite[idx] {
				continue;
			}
			if let SchemaNode::Record(record) = node {
				if record.fields.iter().all(|field| finite[field.schema.idx()]) {
					finite[idx] = true;
					progressed = true;
				}
			}
		}
	}
	match finite.iter().all(|&cleared| cleared) {
		true => Ok(()),
		false => Err(SchemaError::new(
			"The schema contains a record that ends up always containing itself",
		)),
	}
}

impl<'a> SchemaConstructionState<'a> {
	fn register_node(
		&mut self,
		raw_schema: &'a raw::SchemaNode<'a>,
		enclosing_namespace: Option<&'a str>,
	) -> Result<SchemaKey, SchemaError> {
		Ok(match *raw_schema {
			raw::SchemaNode::Type(type_) => {
				let idx = self.nodes.len();
				self.nodes.push(match type_ {
					raw::Type::Null => SchemaNode::Null,
					raw::Type::Boolean => SchemaNode::Boolean,
					raw::Type::Int => SchemaNode::Int,
					raw::Type::Long => SchemaNode::Long,
					raw::Type::Float => SchemaNode::Float,
					raw::Type::Double => SchemaNode::Double,
					raw::Type::Bytes => SchemaNode::Bytes,
					raw::Type::String => SchemaNode::String,
					complex_type @ (raw::Type::Array
					| raw::Type::Map
					| raw::Type::Record
					| raw::Type::Enum
					| raw::Type::Fixed) => {
						return Err(SchemaError::msg(format_args!(
							"Expected primitive type name, but got {:?} as type which is a complex \
								type, so should be in an object.",
							complex_type
						)))
					}
				});
				SchemaKey { idx }
			}
			raw::SchemaNode::Object(ref object) => {
				let idx = self.nodes.len();
				let object = &**object;
				// Register name->node idx to the name HashMap
				let name_key = if let Some(ref name) = object.name {
					let name: &str = &name.0;
					let name_key = if let Some((namespace, name)) = name.rsplit_once('.') {
						NameKey {
							namespace: Some(namespace).filter(|&s| !s.is_empty()),
							name,
						}
					} else {
						NameKey {
							namespace: match object.namespace {
								Some(ref namespace) => {
									// If the object explicitly specifies an empty string
									// as namespace, "this indicates the null namespace"
									// (aka no namespace)
									Some(&*namespace.0).filter(|&s| !s.is_empty())
								}
								None => enclosing_namespace,
							},

							name,
						}
					};
					if self.names.insert(name_key, idx).is_some() {
						return Err(SchemaError::msg(format_args!(
							"The Schema contains duplicate definitions for {}",
							name_key
						)));
					}
					Some(name_key)
				} else {
					None
				};
				let name = |type_: raw::Type| match name_key {
					None => Err(SchemaError::msg(format_args!(
						"Missing name for type {:?}",
						type_
					))),
					Some(name_key) => Ok((name_key.name(), name_key)),
				};

				macro_rules! field {
					($type_: ident $name: ident) => {
						match &object.$name {
							Some(v) => v,
							_ => {
								return Err(SchemaError::msg(format_args!(
									concat!("Missing field `", stringify!($name), "` on type {:?}",),
									$type_
								)));
							}
						}
					};
				}

				self.nodes.push(SchemaNode::Null); // Reserve the spot for us
				let new_node = match object.type_ {
					raw::SchemaNode::Type(t @ raw::Type::Array) => SchemaNode::Array(
						self.register_node(field!(t items), enclosing_namespace)?,
					),
					raw::SchemaNode::Type(t @ raw::Type::Map) => SchemaNode::Map(
						self.register_node(field!(t values), enclosing_namespace)?,
					),
					raw::SchemaNode::Type(t @ raw::Type::Enum) => {
						let (name, name_key) = name(t)?;
						let aliases = self.register_aliases(object, name_key, idx)?;
						let symbols: Vec<String> = field!(t symbols)
							.iter()
							.map(|e| (*e.0).to_owned())
							.collect();
						if let Some(duplicate) = first_duplicate(&symbols) {
							return Err(SchemaError::msg(format_args!(
								"The {} enum contains duplicate symbol {}",
								name_key, duplicate
							)));
						}
						SchemaNode::Enum(Enum {
							name,
							aliases,
							doc: object.doc.clone(),
							symbols,
						})
					}
					raw::SchemaNode::Type(t @ raw::Type::Fixed) => {
						let (name, name_key) = name(t)?;
						let aliases = self.register_aliases(object, name_key, idx)?;
						let size = *field!(t size);
						if size < 0 {
							return Err(SchemaError::new("'size' must be a positive integer"));
						}
						SchemaNode::Fixed(Fixed {
							name,
							aliases,
							size: size as usize,
						})
					}
					raw::SchemaNode::Type(t @ raw::Type::Record) => {
						let (name, name_key) = name(t)?;
						let aliases = self.register_aliases(object, name_key, idx)?;
						SchemaNode::Record(Record {
							fields: field!(t fields)
								.iter()
								.map(|field| {
									Ok(RecordField {
										name: (*field.name.0).to_owned(),
										aliases: field
											.aliases
											.as_deref()
											.unwrap_or_default()
											.iter()
											.map(|a| (*a.0).to_owned())
											.collect(),
										doc: field.doc.clone(),
										has_default: field.default.is_some(),
										schema: self
											.register_node(&field.type_, name_key.namespace)?,
									})
								})
								.collect::<Result<_, SchemaError>>()?,
							name,
							aliases,
							doc: object.doc.clone(),
							canonical_schema: String::new(), // rendered once parsing completes
						})
					}
					ref inner_type @ (raw::SchemaNode::Type(
						raw::Type::Null
						| raw::Type::Boolean
						| raw::Type::Int
						| raw::Type::Long
						| raw::Type::Float
						| raw::Type::Double
						| raw::Type::Bytes
						| raw::Type::String,
					)
					| raw::SchemaNode::Ref(_)
					| raw::SchemaNode::Object(_)
					| raw::SchemaNode::Union(_)) => {
						// We have to allow {"type": {"type": "string"}}
						// (an object with an inner type and nothing
						// else is a valid representation)
						// However in that case we would ignore all keys
						// that are set at our current level, so we check for this
						// Let's just pass the namespace if overridden,
						// that seems reasonable...
						match object {
							&raw::SchemaNodeObject {
								type_: _,
								name: _,
								namespace: _,
								doc: _,
								aliases: None,
								fields: None,
								symbols: None,
								items: None,
								values: None,
								size: None,
							} => {
								self.nodes.pop().expect("We have just pushed");
								return self.register_node(
									inner_type,
									name_key
										.as_ref()
										.and_then(|n| n.namespace)
										.or(enclosing_namespace),
								);
							}
							_ => {
								return Err(SchemaError::new(
									"Got unnecessarily-nested type, but \
										local object properties are set \
										- those would be ignored",
								))
							}
						}
					}
				};
				self.nodes[idx] = new_node;
				SchemaKey { idx }
			}
			raw::SchemaNode::Union(ref union_schemas) => {
				let idx = self.nodes.len();
				self.nodes.push(SchemaNode::Null); // Reserve the spot for us
				let variants: Vec<SchemaKey> = union_schemas
					.iter()
					.map(|schema| self.register_node(schema, enclosing_namespace))
					.collect::<Result<_, _>>()?;
				let mut optional_index = None;
				for (i, &variant) in variants.iter().enumerate() {
					if variant.idx & LATE_NAME_LOOKUP_REMAP_BIT != 0 {
						// Named reference: named types are never null nor
						// unions, nothing to check
						continue;
					}
					match &self.nodes[variant.idx] {
						SchemaNode::Null => {
							if optional_index.replace(i).is_some() {
								return Err(SchemaError::new(
									"Union may contain at most one null member",
								));
							}
						}
						SchemaNode::Union(_) => {
							return Err(SchemaError::new(
								"Unions may not immediately contain other unions",
							))
						}
						_ => {}
					}
				}
				self.nodes[idx] = SchemaNode::Union(Union {
					variants,
					optional_index,
				});
				SchemaKey { idx }
			}
			raw::SchemaNode::Ref(ref reference) => {
				// This is supposed to be the fullname of a
				// previous named type. According to the spec the type
				// definition should always be parsed before, but we support
				// even if it's unordered.
				let name_key = if let Some((namespace, name)) = reference.rsplit_once('.') {
					NameKey {
						namespace: Some(namespace).filter(|&s| !s.is_empty()),
						name,
					}
				} else {
					NameKey {
						namespace: enclosing_namespace,
						name: reference,
					}
				};
				match self.names.get(&name_key) {
					Some(&idx) => SchemaKey { idx },
					None => {
						let idx = self.unresolved_names.len();
						self.unresolved_names.push(name_key);
						SchemaKey {
							idx: idx | LATE_NAME_LOOKUP_REMAP_BIT,
						}
					}
				}
			}
		})
	}

	/// Register every alias of a named type as an additional cell pointing
	/// at the same node; a conflict with any prior definition or alias is
	/// an error
	fn register_aliases(
		&mut self,
		object: &'a raw::SchemaNodeObject<'a>,
		name_key: NameKey<'a>,
		idx: usize,
	) -> Result<Vec<Name>, SchemaError> {
		let mut alias_names = Vec::new();
		if let Some(ref aliases) = object.aliases {
			for alias in aliases {
				let alias_str: &str = &alias.0;
				// An alias containing a dot is a fullname; otherwise the
				// aliased type's namespace applies
				let alias_key = if let Some((namespace, name)) = alias_str.rsplit_once('.') {
					NameKey {
						namespace: Some(namespace).filter(|&s| !s.is_empty()),
						name,
					}
				} else {
					NameKey {
						namespace: name_key.namespace,
						name: alias_str,
					}
				};
				if self.names.insert(alias_key, idx).is_some() {
					return Err(SchemaError::msg(format_args!(
						"Alias {} for {} conflicts with an existing definition",
						alias_key, name_key
					)));
				}
				alias_names.push(alias_key.name());
			}
		}
		Ok(alias_names)
	}
}

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
struct NameKey<'a> {
	namespace: Option<&'a str>,
	name: &'a str,
}
impl NameKey<'_> {
	fn name(&self) -> Name {
		Name::from_parts(self.namespace, self.name)
	}
}
impl std::fmt::Display for NameKey<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.namespace {
			None => self.name.fmt(f),
			Some(namespace) => write!(f, "{}.{}", namespace, self.name),
		}
	}
}

fn first_duplicate(symbols: &[String]) -> Option<&String> {
	symbols
		.iter()
		.enumerate()
		.find(|&(i, symbol)| symbols[..i].contains(symbol))
		.map(|(_, symbol)| symbol)
}
