//! Navigate and initialize the [`Schema`]

mod canonical_form;
pub(crate) mod compat;
mod error;
mod model;
mod parsing;

pub use {error::SchemaError, model::*};

pub(crate) use canonical_form::canonical_form;

/// Schema component for named nodes of a [`Schema`]
///
/// This holds both the "name" and the "namespace".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}

impl std::fmt::Debug for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.fully_qualified_name, f)
	}
}

impl std::fmt::Display for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.fully_qualified_name, f)
	}
}

impl Name {
	/// The rightmost component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `c`
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(delimiter_idx) => &self.fully_qualified_name[delimiter_idx + 1..],
		}
	}

	/// The namespace component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b`
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx
			.map(|idx| &self.fully_qualified_name[..idx])
	}

	/// The fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b.c`
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}

	/// Build a [`Name`] from a fully qualified name
	///
	/// A name containing a dot is split at the last dot to recover the
	/// namespace; a leading single dot is stripped (null namespace).
	pub fn from_fully_qualified_name(fully_qualified_name: impl Into<String>) -> Self {
		fn non_generic_inner(mut fully_qualified_name: String) -> Name {
			Name {
				namespace_delimiter_idx: match fully_qualified_name.rfind('.') {
					Some(0) => {
						// Parse ".x" as {namespace: None, name: "x"}
						fully_qualified_name.remove(0);
						None
					}
					other => other,
				},
				fully_qualified_name,
			}
		}
		non_generic_inner(fully_qualified_name.into())
	}

	pub(crate) fn from_parts(namespace: Option<&str>, name: &str) -> Self {
		match namespace {
			None => Name {
				fully_qualified_name: name.to_owned(),
				namespace_delimiter_idx: None,
			},
			Some(namespace) => Name {
				fully_qualified_name: format!("{}.{}", namespace, name),
				namespace_delimiter_idx: Some(namespace.len()),
			},
		}
	}
}
