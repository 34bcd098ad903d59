use crate::vm::Instruction;

use std::collections::HashMap;

pub(crate) type MethodId = usize;

/// A bytecode subroutine under construction
///
/// `method_refs` maps an instruction index within this method to the
/// method its `record`/`discard record` call targets; the linker resolves
/// those displacements once every method has an absolute offset. Block and
/// switch displacements stay within one method and are already final.
#[derive(Default)]
pub(crate) struct Method {
	pub(crate) code: Vec<Instruction>,
	pub(crate) method_refs: HashMap<usize, MethodId>,
}

impl Method {
	/// Emit a call to another method, registering the call site for the
	/// linker
	pub(crate) fn call(&mut self, inst: Instruction, target: MethodId) {
		debug_assert!(inst.is_record_call());
		let call_site = self.code.len();
		self.code.push(inst);
		self.method_refs.insert(call_site, target);
	}
}
