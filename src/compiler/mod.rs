//! Compile a `(writer, reader)` schema pair into a bytecode
//! [`Program`](crate::vm::Program)
//!
//! The compiler walks the two schema graphs in lockstep, emitting the
//! instructions that thread through the writer's byte layout exactly once
//! while depositing into the reader's shape: record subroutines with
//! field-reordering and skipping, block loops for maps and arrays, switch
//! cascades for unions, and discard code for everything the reader drops.

mod error;
mod linker;
mod method;
mod read_order;
mod switch;

pub use error::{CompileError, CompileSchemasError};

use {
	method::{Method, MethodId},
	read_order::{read_order, refine_order, ReadOrderEntry},
	switch::SwitchBlock,
};

use crate::{
	schema::{compat, Record, Schema, SchemaKey, SchemaNode, Union},
	vm::{Instruction, Program, VmType},
};

use std::collections::HashMap;

/// Compile a runnable program which can read data written with `writer`
/// and store it in targets shaped by `reader`
pub fn compile(writer: &Schema, reader: &Schema) -> Result<Program, CompileError> {
	let mut compiler = Compiler {
		writer,
		reader,
		methods: Vec::new(),
		method_ids: HashMap::new(),
		errors: Vec::new(),
	};
	let mut main = Method::default();
	compiler.compile_type(&mut main, SchemaKey::root(), Some(SchemaKey::root()))?;

	// A main that is just a call to a record method collapses into the
	// method itself, saving a call/ret pair
	let mut promoted_from = None;
	if main.code.len() == 1 && main.code[0].is_record_call() {
		match main.method_refs.get(&0) {
			Some(&target) => {
				promoted_from = Some(target);
				main = std::mem::take(&mut compiler.methods[target]);
			}
			None => {
				return Err(CompileError::InvalidEntryPoint {
					name: reader.root().logical_name().to_owned(),
					main_size: main.code.len(),
					nested_methods: main.method_refs.len(),
				})
			}
		}
	} else {
		// Subroutines already carry a ret, main doesn't
		main.code.push(Instruction::Ret);
	}

	let instructions = linker::link(main, compiler.methods, promoted_from);
	Ok(Program::new(instructions, compiler.errors))
}

#[derive(PartialEq, Eq, Hash)]
struct MethodKey {
	writer: String,
	// None is discard mode
	reader: Option<String>,
}

struct Compiler<'s> {
	writer: &'s Schema,
	reader: &'s Schema,
	methods: Vec<Method>,
	method_ids: HashMap<MethodKey, MethodId>,
	errors: Vec<String>,
}

impl<'s> Compiler<'s> {
	fn w(&self, key: SchemaKey) -> &'s SchemaNode {
		&self.writer[key]
	}

	fn r(&self, key: SchemaKey) -> &'s SchemaNode {
		&self.reader[key]
	}

	fn pair_readable(&self, wk: SchemaKey, rk: SchemaKey) -> bool {
		compat::node_readable_by(self.writer, wk, self.reader, rk, &mut Default::default())
	}

	fn incompatible(&self, wk: SchemaKey, rk: SchemaKey) -> CompileError {
		CompileError::Incompatible {
			writer: self.w(wk).logical_name().to_owned(),
			reader: self.r(rk).logical_name().to_owned(),
		}
	}

	fn get_or_create_error(&mut self, msg: &str) -> u32 {
		match self.errors.iter().position(|e| e == msg) {
			Some(i) => i as u32,
			None => {
				self.errors.push(msg.to_owned());
				(self.errors.len() - 1) as u32
			}
		}
	}

	fn compile_type(
		&mut self,
		m: &mut Method,
		wk: SchemaKey,
		rk: Option<SchemaKey>,
	) -> Result<(), CompileError> {
		// A non-union writer read into a union reader resolves to a single
		// reader member
		if let Some(r) = rk {
			if !matches!(self.w(wk), SchemaNode::Union(_))
				&& matches!(self.r(r), SchemaNode::Union(_))
			{
				return self.compile_non_union_to_union(m, wk, r);
			}
		}

		match self.w(wk) {
			SchemaNode::Record(_) => self.compile_record_call(m, wk, rk),
			SchemaNode::Union(w_union) => self.compile_union(m, w_union, rk),
			SchemaNode::Array(w_items) => {
				let r_items = match rk {
					None => None,
					Some(r) => match self.r(r) {
						SchemaNode::Array(items) => Some(*items),
						_ => return Err(self.incompatible(wk, r)),
					},
				};
				self.compile_block(m, false, *w_items, r_items)
			}
			SchemaNode::Map(w_values) => {
				let r_values = match rk {
					None => None,
					Some(r) => match self.r(r) {
						SchemaNode::Map(values) => Some(*values),
						_ => return Err(self.incompatible(wk, r)),
					},
				};
				self.compile_block(m, true, *w_values, r_values)
			}
			_ => self.compile_primitive(m, wk, rk),
		}
	}

	fn compile_primitive(
		&mut self,
		m: &mut Method,
		wk: SchemaKey,
		rk: Option<SchemaKey>,
	) -> Result<(), CompileError> {
		match rk {
			None => match self.w(wk) {
				// Null carries no bytes, there is nothing to drain
				SchemaNode::Null => {}
				node => m.code.push(Instruction::Discard(vm_type(node)?)),
			},
			Some(r) => {
				if !self.pair_readable(wk, r) {
					return Err(self.incompatible(wk, r));
				}
				match self.w(wk) {
					// Nothing on the wire; the reader slot still passes
					SchemaNode::Null => m.code.push(Instruction::Skip),
					node => m.code.push(Instruction::Mov(vm_type(node)?)),
				}
			}
		}
		Ok(())
	}

	/// Drain one writer value of any shape without depositing anywhere
	fn discard(&mut self, m: &mut Method, wk: SchemaKey) -> Result<(), CompileError> {
		match self.w(wk) {
			SchemaNode::Record(_)
			| SchemaNode::Map(_)
			| SchemaNode::Array(_)
			| SchemaNode::Union(_) => self.compile_type(m, wk, None),
			SchemaNode::Null => Ok(()),
			node => {
				m.code.push(Instruction::Discard(vm_type(node)?));
				Ok(())
			}
		}
	}

	fn compile_block(
		&mut self,
		m: &mut Method,
		is_map: bool,
		w_child: SchemaKey,
		r_child: Option<SchemaKey>,
	) -> Result<(), CompileError> {
		let discard_mode = r_child.is_none();
		let loop_pos = m.code.len();
		m.code.push(Instruction::Block(0)); // patched below

		// Maps are block types prefixed with a string key
		if is_map {
			m.code.push(if discard_mode {
				Instruction::Discard(VmType::String)
			} else {
				Instruction::Mov(VmType::String)
			});
		}

		self.compile_type(m, w_child, r_child)?;
		m.code.push(Instruction::EndBlock);

		let past_end = (m.code.len() - loop_pos - 1) as i32;
		m.code[loop_pos] = if discard_mode {
			Instruction::DiscardBlock(past_end)
		} else {
			Instruction::Block(past_end)
		};
		Ok(())
	}

	fn compile_record_call(
		&mut self,
		m: &mut Method,
		wk: SchemaKey,
		rk: Option<SchemaKey>,
	) -> Result<(), CompileError> {
		let w_record = match self.w(wk) {
			SchemaNode::Record(record) => record,
			_ => unreachable!("checked by compile_type"),
		};
		let reader_name = match rk {
			None => None,
			Some(r) => match self.r(r) {
				SchemaNode::Record(record) => Some(record.name.fully_qualified_name().to_owned()),
				_ => return Err(self.incompatible(wk, r)),
			},
		};
		let key = MethodKey {
			writer: w_record.name.fully_qualified_name().to_owned(),
			reader: reader_name,
		};
		let (method_id, newly_created) = match self.method_ids.get(&key) {
			Some(&id) => (id, false),
			None => {
				let id = self.methods.len();
				self.methods.push(Method::default());
				self.method_ids.insert(key, id);
				(id, true)
			}
		};

		m.call(
			if rk.is_some() {
				Instruction::Record(0)
			} else {
				Instruction::DiscardRecord(0)
			},
			method_id,
		);

		if newly_created {
			// Taking the method out lets the body compilation recurse into
			// the compiler (a record referencing itself only needs the id,
			// which is already registered)
			let mut body = std::mem::take(&mut self.methods[method_id]);
			let result = self.compile_record_body(&mut body, w_record, rk);
			if result.is_ok() {
				body.code.push(Instruction::Ret);
			}
			self.methods[method_id] = body;
			result?;
		}
		Ok(())
	}

	fn compile_record_body(
		&mut self,
		m: &mut Method,
		w_record: &'s Record,
		rk: Option<SchemaKey>,
	) -> Result<(), CompileError> {
		let r_record = match rk {
			None => None,
			Some(r) => match self.r(r) {
				SchemaNode::Record(record) => Some(record),
				_ => unreachable!("checked by compile_record_call"),
			},
		};

		// A reader field the writer never produces can only be passed over
		// if it has a default to fall back to
		if let Some(r_record) = r_record {
			for r_field in &r_record.fields {
				if !r_field.has_default
					&& compat::find_field_position(w_record, &r_field.name, &r_field.aliases)
						.is_none()
				{
					return Err(CompileError::MissingField {
						field: r_field.name.clone(),
						record: r_record.name.fully_qualified_name().to_owned(),
					});
				}
			}
		}

		let writer = self.writer;
		let reader = self.reader;
		let (order, all_ascending) = read_order(
			w_record.fields.len(),
			r_record.map_or(0, |r| r.fields.len()),
			|w_idx| {
				let w_field = &w_record.fields[w_idx];
				let r_record = match r_record {
					None => return Ok(None),
					Some(r_record) => r_record,
				};
				match compat::find_field_position(r_record, &w_field.name, &w_field.aliases) {
					None => Ok(None),
					Some(r_idx) => {
						let r_field = &r_record.fields[r_idx];
						if !compat::node_readable_by(
							writer,
							w_field.schema,
							reader,
							r_field.schema,
							&mut Default::default(),
						) {
							return Err(CompileError::IncompatibleField {
								reader_field: r_field.name.clone(),
								writer_field: w_field.name.clone(),
							});
						}
						Ok(Some(r_idx))
					}
				}
			},
		)?;

		if !all_ascending {
			// The setter must rearrange its fields before reading
			m.code.push(Instruction::Sort(refine_order(&order)));
		}

		let max_r_idx = match r_record {
			Some(r_record) => r_record.fields.len(),
			None => w_record.fields.len(),
		};
		let mut w_idx = 0;
		let mut r_idx = 0;
		for entry in &order {
			match *entry {
				ReadOrderEntry::Discardable => {
					self.discard(m, w_record.fields[w_idx].schema)?;
					w_idx += 1;
				}
				ReadOrderEntry::Skippable => {
					if r_idx < max_r_idx {
						m.code.push(Instruction::Skip);
						r_idx += 1;
					}
				}
				ReadOrderEntry::Mapped(cur) => {
					let r_record = r_record.expect("mapped entries only exist with a reader");
					if all_ascending {
						// Reader slots interleaved between mapped fields
						// pass in place
						while r_idx < cur {
							m.code.push(Instruction::Skip);
							r_idx += 1;
						}
					}
					self.compile_type(
						m,
						w_record.fields[w_idx].schema,
						Some(r_record.fields[cur].schema),
					)?;
					w_idx += 1;
					r_idx += 1;
				}
			}
		}
		Ok(())
	}

	/// A non-union writer read into a union reader: resolve to the first
	/// compatible reader member (exact-name match beats structural match)
	/// and wrap the read in a subroutine
	///
	/// The subroutine starts a fresh frame where the accumulator is zero,
	/// so `mov acc` deposits a known tag which the reorder translation
	/// then maps to the chosen member index. A `null` writer resolves to
	/// the reader's null branch instead: no tag is deposited, the target
	/// is set to null through the same skip path the optional fast-path
	/// takes.
	fn compile_non_union_to_union(
		&mut self,
		m: &mut Method,
		wk: SchemaKey,
		rk: SchemaKey,
	) -> Result<(), CompileError> {
		let r_union = match self.r(rk) {
			SchemaNode::Union(union) => union,
			_ => unreachable!("checked by compile_type"),
		};
		let Some((member_idx, member)) = self.choose_member(wk, &r_union.variants) else {
			return Err(self.incompatible(wk, rk));
		};

		let id = self.methods.len();
		self.methods.push(Method::default());
		let mut body = Method::default();
		if Some(member_idx) == r_union.optional_index {
			// Nothing is on the wire and the target must become null, not
			// a defaulted member. The fresh frame's accumulator is zero,
			// so the case always fires.
			body.code.push(Instruction::SkipCase(0, 0));
		} else {
			body.code.push(Instruction::Mov(VmType::Acc));
			if member_idx != 0 {
				body.code.push(Instruction::Sort(vec![member_idx as u32]));
			}
			self.compile_type(&mut body, wk, Some(member))?;
		}
		body.code.push(Instruction::Ret);
		self.methods[id] = body;

		m.call(Instruction::Record(0), id);
		Ok(())
	}

	/// The first member of `candidates` the writer type is readable by,
	/// with exact-name matches taking precedence over structural ones
	fn choose_member(
		&self,
		wk: SchemaKey,
		candidates: &[SchemaKey],
	) -> Option<(usize, SchemaKey)> {
		let w_name = self.w(wk).logical_name();
		let mut best = None;
		for (idx, &candidate) in candidates.iter().enumerate() {
			if self.pair_readable(wk, candidate) {
				if self.r(candidate).logical_name() == w_name {
					return Some((idx, candidate));
				}
				if best.is_none() {
					best = Some((idx, candidate));
				}
			}
		}
		best
	}

	fn compile_union(
		&mut self,
		m: &mut Method,
		w_union: &'s Union,
		rk: Option<SchemaKey>,
	) -> Result<(), CompileError> {
		match rk {
			None => self.compile_union_discard(m, w_union),
			Some(r) => match self.r(r) {
				SchemaNode::Union(r_union) => self.compile_union_to_union(m, w_union, r_union),
				_ => self.compile_union_to_non_union(m, w_union, r),
			},
		}
	}

	fn compile_union_to_union(
		&mut self,
		m: &mut Method,
		w_union: &'s Union,
		r_union: &'s Union,
	) -> Result<(), CompileError> {
		// Match every writer member to a reader member
		let mut mapping = Vec::with_capacity(w_union.variants.len());
		for &w_member in &w_union.variants {
			match self.choose_member(w_member, &r_union.variants) {
				Some((r_idx, _)) => mapping.push(r_idx),
				None => {
					return Err(CompileError::IncompatibleUnion {
						writer_member: self.w(w_member).logical_name().to_owned(),
					})
				}
			}
		}

		m.code.push(Instruction::Load);
		// The optional fast-path jump; its displacement is fixed up once
		// the cascade is in place
		let skip_jmp_pos = w_union.optional_index.map(|optional_index| {
			let pos = m.code.len();
			m.code
				.push(Instruction::SkipCase(optional_index as i64, 0));
			pos
		});
		m.code.push(Instruction::Mov(VmType::Acc));
		if mapping.iter().enumerate().any(|(w_idx, &r_idx)| w_idx != r_idx) {
			// The unions declare their members in different orders: hand
			// the union setter the writer-to-reader tag translation
			m.code.push(Instruction::Sort(
				mapping.iter().map(|&r_idx| r_idx as u32).collect(),
			));
		}

		let mut switch = SwitchBlock::default();
		for (w_idx, &w_member) in w_union.variants.iter().enumerate() {
			if w_union.optional_index == Some(w_idx) {
				continue;
			}
			let mut body = Method::default();
			self.compile_type(&mut body, w_member, Some(r_union.variants[mapping[w_idx]]))?;
			switch.add_case(w_idx as i64, body);
		}
		let err_code = self.get_or_create_error("invalid index for union");
		switch.compile_to(m, err_code);

		if let Some(pos) = skip_jmp_pos {
			let rel = (m.code.len() - pos - 1) as i32;
			if let Instruction::SkipCase(_, p) = &mut m.code[pos] {
				*p = rel;
			}
		}
		Ok(())
	}

	/// A writer union read into a non-union reader: every member gets a
	/// self-contained body that positions the one written slot with skips
	/// on both sides
	fn compile_union_to_non_union(
		&mut self,
		m: &mut Method,
		w_union: &'s Union,
		rk: SchemaKey,
	) -> Result<(), CompileError> {
		// Reader slots: the record's fields, or the single non-union slot
		let r_slots: Vec<SchemaKey> = match self.r(rk) {
			SchemaNode::Record(record) => record.fields.iter().map(|f| f.schema).collect(),
			_ => vec![rk],
		};

		m.code.push(Instruction::Load);
		let mut switch = SwitchBlock::default();
		for (w_idx, &w_member) in w_union.variants.iter().enumerate() {
			let Some((slot_idx, slot)) = self.choose_member(w_member, &r_slots) else {
				return Err(CompileError::IncompatibleUnion {
					writer_member: self.w(w_member).logical_name().to_owned(),
				});
			};
			let mut body = Method::default();
			for _ in 0..slot_idx {
				body.code.push(Instruction::Skip);
			}
			self.compile_type(&mut body, w_member, Some(slot))?;
			for _ in slot_idx + 1..r_slots.len() {
				body.code.push(Instruction::Skip);
			}
			switch.add_case(w_idx as i64, body);
		}
		let err_code = self.get_or_create_error("invalid index for union");
		switch.compile_to(m, err_code);
		Ok(())
	}

	/// Discard mode: dispatch on the tag and drain the selected member
	fn compile_union_discard(
		&mut self,
		m: &mut Method,
		w_union: &'s Union,
	) -> Result<(), CompileError> {
		m.code.push(Instruction::Load);
		let mut switch = SwitchBlock::default();
		for (w_idx, &w_member) in w_union.variants.iter().enumerate() {
			let mut body = Method::default();
			self.discard(&mut body, w_member)?;
			switch.add_case(w_idx as i64, body);
		}
		let err_code = self.get_or_create_error("invalid index for union");
		switch.compile_to(m, err_code);
		Ok(())
	}
}

fn vm_type(node: &SchemaNode) -> Result<VmType, CompileError> {
	Ok(match node {
		SchemaNode::Boolean => VmType::Bool,
		SchemaNode::Int => VmType::Int,
		SchemaNode::Long => VmType::Long,
		SchemaNode::Float => VmType::Float,
		SchemaNode::Double => VmType::Double,
		SchemaNode::String => VmType::String,
		SchemaNode::Bytes => VmType::Bytes,
		// Enum ordinals share the int wire representation
		SchemaNode::Enum(_) => VmType::Int,
		SchemaNode::Fixed(fixed) => VmType::Fixed(fixed.size as u32),
		node => {
			return Err(CompileError::NotPrimitive {
				name: node.logical_name().to_owned(),
			})
		}
	})
}
