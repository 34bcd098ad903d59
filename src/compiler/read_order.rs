use super::error::CompileError;

/// One read-order entry per writer field, with the reader-only fields
/// appended as skippable
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ReadOrderEntry {
	/// Writer field absent from the reader: drain its bytes
	Discardable,
	/// Reader field absent from the writer: pass its slot
	Skippable,
	/// Writer field deposits into this reader field index
	Mapped(usize),
}

/// Compute in which order the reader consumes the writer's output
///
/// The matcher resolves a writer field index to the reader field it maps
/// to, if any. While scanning, detect whether the mapped reader indexes
/// come monotonically non-decreasing; if they do, the VM can deposit into
/// natural slots and field rearranging is skipped.
pub(crate) fn read_order<F>(
	writer_fields: usize,
	reader_fields: usize,
	mut matcher: F,
) -> Result<(Vec<ReadOrderEntry>, bool), CompileError>
where
	F: FnMut(usize) -> Result<Option<usize>, CompileError>,
{
	let mut order = Vec::with_capacity(writer_fields + reader_fields);
	let mut all_ascending = true;
	let mut last_idx = None;
	for w_idx in 0..writer_fields {
		match matcher(w_idx)? {
			None => order.push(ReadOrderEntry::Discardable),
			Some(r_idx) => {
				if last_idx.is_some_and(|last| r_idx < last) {
					all_ascending = false;
				}
				last_idx = Some(r_idx);
				order.push(ReadOrderEntry::Mapped(r_idx));
			}
		}
	}

	// The rest of the reader's fields must be skipped
	for r_idx in 0..reader_fields {
		if !order.contains(&ReadOrderEntry::Mapped(r_idx)) {
			order.push(ReadOrderEntry::Skippable);
		}
	}
	Ok((order, all_ascending))
}

/// Extract the mapped positions, dropping the discard/skip markers, for
/// the reorder instruction
pub(crate) fn refine_order(order: &[ReadOrderEntry]) -> Vec<u32> {
	order
		.iter()
		.filter_map(|entry| match entry {
			ReadOrderEntry::Mapped(idx) => Some(*idx as u32),
			_ => None,
		})
		.collect()
}
