use super::method::{Method, MethodId};
use crate::vm::Instruction;

/// Lay out methods sequentially (main first, then creation order), assign
/// absolute offsets, and rewrite every record-call displacement to
/// `target.offset - call_site - 1`
pub(crate) fn link(
	main: Method,
	methods: Vec<Method>,
	promoted_from: Option<MethodId>,
) -> Vec<Instruction> {
	let mut offsets = vec![0usize; methods.len()];
	let mut offset = main.code.len();
	for (id, method) in methods.iter().enumerate() {
		if Some(id) == promoted_from {
			// The promoted method is main itself now; calls to it
			// (self-recursion) resolve to the program start
			offsets[id] = 0;
			continue;
		}
		offsets[id] = offset;
		offset += method.code.len();
	}

	let mut instructions = Vec::with_capacity(offset);
	emit(main, 0, &offsets, &mut instructions);
	for (id, method) in methods.into_iter().enumerate() {
		if Some(id) == promoted_from {
			continue;
		}
		let base = offsets[id];
		emit(method, base, &offsets, &mut instructions);
	}
	instructions
}

fn emit(method: Method, base: usize, offsets: &[usize], instructions: &mut Vec<Instruction>) {
	let method_refs = method.method_refs;
	for (i, mut inst) in method.code.into_iter().enumerate() {
		if let Some(&target) = method_refs.get(&i) {
			let call_site = base + i;
			inst.set_pos(offsets[target] as i32 - call_site as i32 - 1);
		}
		instructions.push(inst);
	}
}
