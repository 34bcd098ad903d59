use super::method::Method;
use crate::vm::Instruction;

/// Builder for the switch-like cascade dispatching a union tag
///
/// Layout: one `case` per member, a `halt` guarding the default (unknown
/// union tag), then the member bodies, each followed by a jump to the
/// common end label. The final body falls through to the end.
#[derive(Default)]
pub(crate) struct SwitchBlock {
	cases: Vec<(i64, Method)>,
}

impl SwitchBlock {
	pub(crate) fn add_case(&mut self, value: i64, body: Method) {
		self.cases.push((value, body));
	}

	pub(crate) fn compile_to(self, m: &mut Method, err_code: u32) {
		let total = self.cases.len();

		// Body offsets relative to the start of the cascade
		let mut body_offsets = Vec::with_capacity(total);
		let mut offset = total + 1; // past the cases and the halt
		for (i, (_, body)) in self.cases.iter().enumerate() {
			body_offsets.push(offset);
			offset += body.code.len() + usize::from(i + 1 < total); // the end jmp
		}
		let end = offset;

		let base = m.code.len();
		for (i, (value, _)) in self.cases.iter().enumerate() {
			// Displacements count from the instruction after the case
			m.code
				.push(Instruction::Case(*value, (body_offsets[i] - i - 1) as i32));
		}
		m.code.push(Instruction::Halt(err_code));

		for (i, (_, body)) in self.cases.into_iter().enumerate() {
			let body_base = m.code.len();
			for (inst_idx, target) in body.method_refs {
				m.method_refs.insert(body_base + inst_idx, target);
			}
			m.code.extend(body.code);
			if i + 1 < total {
				let at = m.code.len() - base;
				m.code.push(Instruction::Jmp((end - at - 1) as i32));
			}
		}
	}
}
