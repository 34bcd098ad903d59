//! The Setter protocol binding bytecode to caller memory
//!
//! A [`Setter`] receives field writes and skips from the VM and routes them
//! into a caller-owned target. Targets enter the protocol through [`Bind`]
//! (and [`UnionBind`] for union-shaped targets): a type hands out a
//! [`Binding`] over its own storage, either a primitive slot or a setter
//! over its composite structure. Implementations are provided for the wire
//! primitives and the std composites; structs and union enums implement the
//! traits by hand, playing the role of generated adapters.

mod field_list;
mod map;
mod skipper;
mod slice;
mod union;

pub use {
	field_list::FieldListSetter,
	map::MapSetter,
	skipper::SkipperSetter,
	slice::SliceSetter,
	union::{UnionBind, UnionSetter},
};

use std::collections::HashMap;

/// A decoded value produced by the VM
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
	Null,
	Boolean(bool),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	String(String),
	Bytes(Vec<u8>),
}

impl Value {
	pub(crate) fn kind(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Boolean(_) => "boolean",
			Value::Int(_) => "int",
			Value::Long(_) => "long",
			Value::Float(_) => "float",
			Value::Double(_) => "double",
			Value::String(_) => "string",
			Value::Bytes(_) => "bytes",
		}
	}
}

/// The operation requested from a setter at its current position
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
	/// Deposit a value at the current position, then advance
	SetField,
	/// Pass the current position, leaving its default, then advance
	SkipField,
}

/// One-shot configuration argument for [`Setter::init`]
#[derive(Clone, Copy, Debug)]
pub enum InitArg<'a> {
	/// Item count of the upcoming block run (maps, slices)
	Count(usize),
	/// Field-reorder vector (field lists) or member tag translation
	/// (unions)
	Order(&'a [u32]),
}

/// Any error that may happen when binding a VM operation to a target
#[derive(thiserror::Error, Debug)]
pub enum BindingError {
	#[error("setter exhausted")]
	Exhausted,
	#[error("current field is not a setter")]
	NotASetter,
	#[error("wrong initialization argument for this setter")]
	BadInit,
	#[error("reorder position out of range")]
	SortOutOfRange,
	#[error("cannot assign {got} into a {target} slot")]
	Incompatible {
		got: &'static str,
		target: &'static str,
	},
	#[error("bytes are not valid UTF-8 for a string slot")]
	InvalidUtf8,
	#[error("fixed slot of size {expected} cannot accept {got} bytes")]
	FixedSizeMismatch { expected: usize, got: usize },
	#[error("operation not supported by this setter")]
	Unsupported,
	#[error("union value requested before a member was selected")]
	NoMemberSelected,
	#[error("union tag {tag} is outside the declared member range")]
	TagOutOfRange { tag: i64 },
}

/// The interface binding bytecode to caller memory
///
/// The VM drives exactly four operations plus a completion notification:
/// - [`init`](Setter::init): one-shot configuration (block item count, or a
///   field-reorder vector),
/// - [`execute`](Setter::execute): deposit or skip at the current position,
/// - [`is_exhausted`](Setter::is_exhausted): all positions consumed,
/// - [`get_inner`](Setter::get_inner): a child setter bound to the current
///   position, used by `record` and `block` instructions,
/// - [`on_inner_exhausted`](Setter::on_inner_exhausted): called when the
///   child obtained from [`get_inner`](Setter::get_inner) has been fully
///   driven, so the parent can commit and advance. The notification travels
///   with the control flow rather than through a stored callback, which is
///   what keeps the tree free of parent back-references.
pub trait Setter {
	fn init(&mut self, arg: InitArg<'_>) -> Result<(), BindingError>;
	fn execute(&mut self, op: Op, value: Value) -> Result<(), BindingError>;
	fn is_exhausted(&self) -> bool;
	fn get_inner(&mut self) -> Result<Box<dyn Setter + '_>, BindingError>;
	fn on_inner_exhausted(&mut self) -> Result<(), BindingError>;
}

impl<S: Setter + ?Sized> Setter for &mut S {
	fn init(&mut self, arg: InitArg<'_>) -> Result<(), BindingError> {
		(**self).init(arg)
	}
	fn execute(&mut self, op: Op, value: Value) -> Result<(), BindingError> {
		(**self).execute(op, value)
	}
	fn is_exhausted(&self) -> bool {
		(**self).is_exhausted()
	}
	fn get_inner(&mut self) -> Result<Box<dyn Setter + '_>, BindingError> {
		(**self).get_inner()
	}
	fn on_inner_exhausted(&mut self) -> Result<(), BindingError> {
		(**self).on_inner_exhausted()
	}
}

/// A binding over one slot of a target
///
/// Primitive variants are writable references into caller storage; the two
/// boxed variants wrap composite children. `Nested` children (records,
/// unions) have operations flow through them; `Block` children (maps,
/// slices) are driven by the VM block loop and need an enclosing slot.
pub enum Binding<'a> {
	Boolean(&'a mut bool),
	Int(&'a mut i32),
	Long(&'a mut i64),
	Float(&'a mut f32),
	Double(&'a mut f64),
	String(&'a mut String),
	Bytes(&'a mut Vec<u8>),
	Fixed(&'a mut [u8]),
	Nested(Box<dyn Setter + 'a>),
	Block(Box<dyn Setter + 'a>),
}

impl<'a> Binding<'a> {
	/// Binding over a record-shaped target with the given field bindings,
	/// in reader declaration order
	pub fn record(fields: Vec<Binding<'a>>) -> Self {
		Binding::Nested(Box::new(FieldListSetter::new(fields)))
	}

	/// Binding over a union-shaped target
	pub fn union(target: &'a mut dyn UnionBind) -> Self {
		Binding::Nested(Box::new(UnionSetter::new(target)))
	}

	pub(crate) fn target_kind(&self) -> &'static str {
		match self {
			Binding::Boolean(_) => "boolean",
			Binding::Int(_) => "int",
			Binding::Long(_) => "long",
			Binding::Float(_) => "float",
			Binding::Double(_) => "double",
			Binding::String(_) => "string",
			Binding::Bytes(_) => "bytes",
			Binding::Fixed(_) => "fixed",
			Binding::Nested(_) => "nested",
			Binding::Block(_) => "block",
		}
	}

	/// Assign a decoded value into this slot, widening numerics where the
	/// resolution rules allow (`int ⊆ long ⊆ float ⊆ double`,
	/// `string ↔ bytes`); anything else is a [`BindingError`]
	pub(crate) fn assign(&mut self, value: Value) -> Result<(), BindingError> {
		match (self, value) {
			(Binding::Boolean(slot), Value::Boolean(v)) => **slot = v,
			(Binding::Int(slot), Value::Int(v)) => **slot = v,
			(Binding::Long(slot), Value::Int(v)) => **slot = v.into(),
			(Binding::Long(slot), Value::Long(v)) => **slot = v,
			(Binding::Float(slot), Value::Int(v)) => **slot = v as f32,
			(Binding::Float(slot), Value::Long(v)) => **slot = v as f32,
			(Binding::Float(slot), Value::Float(v)) => **slot = v,
			(Binding::Double(slot), Value::Int(v)) => **slot = v.into(),
			(Binding::Double(slot), Value::Long(v)) => **slot = v as f64,
			(Binding::Double(slot), Value::Float(v)) => **slot = v.into(),
			(Binding::Double(slot), Value::Double(v)) => **slot = v,
			(Binding::String(slot), Value::String(v)) => **slot = v,
			(Binding::String(slot), Value::Bytes(v)) => {
				**slot = String::from_utf8(v).map_err(|_| BindingError::InvalidUtf8)?
			}
			(Binding::Bytes(slot), Value::Bytes(v)) => **slot = v,
			(Binding::Bytes(slot), Value::String(v)) => **slot = v.into_bytes(),
			(Binding::Fixed(slot), Value::Bytes(v)) => {
				if v.len() != slot.len() {
					return Err(BindingError::FixedSizeMismatch {
						expected: slot.len(),
						got: v.len(),
					});
				}
				slot.copy_from_slice(&v);
			}
			(slot, value) => {
				return Err(BindingError::Incompatible {
					got: value.kind(),
					target: slot.target_kind(),
				})
			}
		}
		Ok(())
	}
}

/// Implemented by any type that can be a decoding target
///
/// The returned [`Binding`] is a view over the value's own storage; for
/// composite types it is a setter that the VM then drives.
pub trait Bind {
	fn bind(&mut self) -> Binding<'_>;
}

impl Bind for bool {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Boolean(self)
	}
}
impl Bind for i32 {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Int(self)
	}
}
impl Bind for i64 {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Long(self)
	}
}
impl Bind for f32 {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Float(self)
	}
}
impl Bind for f64 {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Double(self)
	}
}
impl Bind for String {
	fn bind(&mut self) -> Binding<'_> {
		Binding::String(self)
	}
}

/// A byte-string target
///
/// `Vec<u8>` cannot bind as bytes without overlapping the generic slice
/// target impl, so byte targets wrap their storage in this (the same trick
/// `serde_bytes` plays for serde).
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct ByteBuf(pub Vec<u8>);

impl Bind for ByteBuf {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Bytes(&mut self.0)
	}
}

impl<const N: usize> Bind for [u8; N] {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Fixed(self)
	}
}

impl<T: Bind> Bind for Box<T> {
	fn bind(&mut self) -> Binding<'_> {
		(**self).bind()
	}
}

impl<T: Bind + Default> Bind for Option<T> {
	fn bind(&mut self) -> Binding<'_> {
		Binding::union(self)
	}
}

impl<T: Bind + Default> Bind for Vec<T> {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Block(Box::new(SliceSetter::new(self)))
	}
}

impl<V: Bind + Default> Bind for HashMap<String, V> {
	fn bind(&mut self) -> Binding<'_> {
		Binding::Block(Box::new(MapSetter::new(self)))
	}
}
