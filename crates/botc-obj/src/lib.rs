//! botc-obj — mark resolution, segment concatenation, object file writer
//! (spec §4.7, component C7).
//!
//! `botc-par` hands back one already-merged [`botc_par::StateSegment`] per
//! state, each still carrying its own unresolved references (spec §4.4:
//! "keep the reference list per-buffer and resolve only at the final
//! concatenated layer"). This crate is the final layer: it lays the
//! segments end to end, and for every reference writes the absolute byte
//! offset of its target mark in the *concatenated* stream into the 4-byte
//! placeholder the parser already reserved.

use std::path::Path;

use botc_buf::DataBuffer;
use botc_isa::Opcode;
use botc_par::{CompileOutput, StateSegment};
use botc_sym::StringPool;
use botc_util::CompileResult;

/// Concatenates every state segment, patches all forward references to
/// absolute offsets, and appends the string pool segment if non-empty
/// (spec §4.7: "the overall file layout is... followed by a trailing
/// `StringList` segment iff the pool is non-empty").
pub fn link(output: &CompileOutput, strings: &StringPool) -> Vec<u8> {
    let mut out = Vec::new();
    for segment in &output.states {
        resolve_into(&segment.buf, &mut out);
    }
    if !strings.is_empty() {
        resolve_into(&string_list_segment(strings), &mut out);
    }
    out
}

/// Appends `buf`'s bytes to `out`, patching each of `buf`'s references with
/// the absolute position (within `out`, after this append) of its target
/// mark. Marks and references are local to `buf`; the patched value is
/// `out`'s pre-append length plus the mark's buffer-local position.
fn resolve_into(buf: &DataBuffer, out: &mut Vec<u8>) {
    let base = out.len();
    out.extend_from_slice(buf.bytes());
    for r in buf.refs() {
        let target = (base + buf.mark_position(r.target)) as u32;
        let at = base + r.position;
        out[at..at + 4].copy_from_slice(&target.to_le_bytes());
    }
}

fn string_list_segment(strings: &StringPool) -> DataBuffer {
    let mut buf = DataBuffer::new();
    buf.write_header(Opcode::StringList);
    buf.write_u32(strings.len() as u32);
    for s in strings.iter() {
        buf.write_string(s);
    }
    buf
}

/// Writes `bytes` to `path`, truncating any existing file. Any I/O error is
/// fatal and carries the path (spec §4.7: "any I/O error on open or write
/// is fatal with a message including the path").
pub fn write_object_file(path: &Path, bytes: &[u8]) -> CompileResult<()> {
    std::fs::write(path, bytes).map_err(|e| botc_util::CompileError::io(&path.to_path_buf(), e))
}

/// A `-V`-gated human-readable rendering of the linked output: each
/// segment's byte range and, within it, every resolved mark's absolute
/// position. Used by `botc-drv`'s verbose mode and by this crate's own
/// tests to check invariant 4 (mark resolution) without re-parsing the
/// emitted bytes.
pub fn dump(output: &CompileOutput, strings: &StringPool) -> String {
    let mut text = String::new();
    let mut base = 0usize;
    for (i, segment) in output.states.iter().enumerate() {
        let len = segment.buf.len();
        text.push_str(&format!("segment {i}: bytes [{base}, {}) \n", base + len));
        for mark in segment.buf.marks() {
            text.push_str(&format!("  mark {:?} -> {}\n", mark.name, base + mark.position));
        }
        base += len;
    }
    if !strings.is_empty() {
        text.push_str(&format!("segment strings: bytes [{base}, {})\n", base + string_list_segment(strings).len()));
        for (i, s) in strings.iter().enumerate() {
            text.push_str(&format!("  [{i}] {s:?}\n"));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_buf::DataBuffer;
    use botc_par::StateSegment;
    use botc_util::Pos;

    fn segment_with_forward_ref() -> StateSegment {
        let mut buf = DataBuffer::new();
        let end = buf.add_mark("end");
        buf.write_header(Opcode::Goto);
        buf.add_reference(end);
        buf.write_header(Opcode::Drop);
        buf.adjust_mark(end);
        StateSegment { buf }
    }

    #[test]
    fn resolves_forward_reference_to_absolute_offset() {
        let output = CompileOutput { states: vec![segment_with_forward_ref()] };
        let strings = StringPool::new();
        let bytes = link(&output, &strings);

        // Goto header (4) + placeholder (4) + Drop header (4) = 12, which is
        // where `end` was adjusted to land.
        let patched = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(patched, 12);
    }

    #[test]
    fn concatenates_segments_with_shifted_bases() {
        let mut a = DataBuffer::new();
        a.write_u32(0xAAAA_AAAA);
        let mut b = DataBuffer::new();
        let m = b.add_mark("here");
        b.write_header(Opcode::Goto);
        b.add_reference(m);
        b.adjust_mark(m);

        let output = CompileOutput { states: vec![StateSegment { buf: a }, StateSegment { buf: b }] };
        let strings = StringPool::new();
        let bytes = link(&output, &strings);

        // a is 4 bytes; b's Goto header (4) + ref (4) sit at [4, 12), and
        // `here` resolves to 12 (4 + 8), not 8, since it must include a's length.
        let patched = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(patched, 12);
    }

    #[test]
    fn omits_string_list_when_pool_is_empty() {
        let output = CompileOutput { states: vec![StateSegment { buf: DataBuffer::new() }] };
        let strings = StringPool::new();
        assert_eq!(link(&output, &strings).len(), 0);
    }

    #[test]
    fn appends_string_list_when_pool_is_non_empty() {
        let output = CompileOutput { states: vec![StateSegment { buf: DataBuffer::new() }] };
        let mut strings = StringPool::new();
        strings.intern("hi", &dummy_pos()).unwrap();
        let bytes = link(&output, &strings);

        let op = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(op, Opcode::StringList.to_u32());
        let count = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(count, 1);
    }

    fn dummy_pos() -> Pos {
        Pos::new(botc_util::file_name("t.bts"), 1, 1)
    }
}
