//! botc-buf — the segmented emission buffer (spec §3/§4.4, component C4).
//!
//! Everything `botc-par` and `botc-eval` emit goes through a
//! [`DataBuffer`]: an append-only byte array plus two small owned
//! collections, [`Mark`]s (named positions — "the point I will later jump
//! to") and [`Reference`]s (4-byte placeholders that get patched with a
//! mark's final position once every segment has been concatenated).
//!
//! Marks and references never point across buffers. A mark is created and
//! lives in exactly one buffer; when buffers are combined with [`DataBuffer::merge`]
//! every mark and reference moves with a position shift, never a copy that
//! could leave two buffers claiming the same mark.

use botc_isa::Opcode;

/// An index into a buffer's own mark list. Only meaningful relative to the
/// buffer that created it — never compare `MarkId`s from two buffers that
/// haven't been merged into one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkId(usize);

#[derive(Clone, Debug)]
pub struct Mark {
    pub name: String,
    pub position: usize,
}

#[derive(Clone, Debug)]
pub struct Reference {
    pub target: MarkId,
    /// Byte offset, within this buffer, of the 4-byte placeholder.
    pub position: usize,
}

#[derive(Clone, Debug, Default)]
pub struct DataBuffer {
    bytes: Vec<u8>,
    marks: Vec<Mark>,
    refs: Vec<Reference>,
}

impl DataBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn refs(&self) -> &[Reference] {
        &self.refs
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn mark_position(&self, id: MarkId) -> usize {
        self.marks[id.0].position
    }

    // -- raw writers --------------------------------------------------

    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    /// Length-prefixed string: a 4-byte length followed by the raw bytes,
    /// with no terminator (spec §4.4).
    pub fn write_string(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.bytes.extend_from_slice(s.as_bytes());
    }

    pub fn write_header(&mut self, op: Opcode) {
        self.write_u32(op.to_u32());
    }

    // -- marks and references -----------------------------------------

    /// Creates a mark at the current write position.
    pub fn add_mark(&mut self, name: impl Into<String>) -> MarkId {
        let id = MarkId(self.marks.len());
        self.marks.push(Mark { name: name.into(), position: self.bytes.len() });
        id
    }

    /// Reserves 4 bytes at the current position and records a pending
    /// reference to `target`, to be patched at emit time.
    pub fn add_reference(&mut self, target: MarkId) -> usize {
        let position = self.bytes.len();
        self.write_u32(0);
        self.refs.push(Reference { target, position });
        position
    }

    /// Moves a mark to the current write position.
    pub fn adjust_mark(&mut self, mark: MarkId) {
        self.marks[mark.0].position = self.bytes.len();
    }

    // -- merge and fork -------------------------------------------------

    /// Appends `other`'s bytes to `self`, transferring its marks and
    /// references with their positions shifted by `self`'s pre-merge size.
    /// Marks are transferred before the bytes are copied so a reference
    /// that targets one of the transferred marks resolves against the
    /// post-merge layout as soon as the merge completes (spec §4.4).
    pub fn merge(&mut self, other: DataBuffer) {
        let shift = self.bytes.len();
        let mark_base = self.marks.len();

        self.marks.extend(other.marks.into_iter().map(|m| Mark {
            name: m.name,
            position: m.position + shift,
        }));
        self.refs.extend(other.refs.into_iter().map(|r| Reference {
            target: MarkId(r.target.0 + mark_base),
            position: r.position + shift,
        }));

        self.bytes.extend_from_slice(&other.bytes);
    }

    /// Splits this buffer into a fresh one that inherits a byte-for-byte
    /// copy of the current contents but takes *ownership* of all marks and
    /// references, leaving `self` with none. Used where the parser needs
    /// two logically independent streams derived from the same point (the
    /// `for`-loop increment clause, a switch `default` block) without ever
    /// letting a mark be claimed by two buffers at once.
    pub fn fork(&mut self) -> DataBuffer {
        DataBuffer {
            bytes: self.bytes.clone(),
            marks: std::mem::take(&mut self.marks),
            refs: std::mem::take(&mut self.refs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_shifts_marks_and_references() {
        let mut a = DataBuffer::new();
        a.write_u32(0xAAAA_AAAA);

        let mut b = DataBuffer::new();
        let target = b.add_mark("end");
        b.write_u32(0x1); // payload before the jump
        let ref_pos_in_b = b.add_reference(target);
        b.adjust_mark(target);

        a.merge(b);

        let m = &a.marks()[0];
        assert_eq!(m.position, 4 + 8); // shifted by 4 (a's len), then adjusted after the payload+placeholder

        let r = &a.refs()[0];
        assert_eq!(r.position, 4 + ref_pos_in_b);
        assert_eq!(a.mark_position(r.target), m.position);
    }

    #[test]
    fn fork_moves_marks_but_copies_bytes() {
        let mut a = DataBuffer::new();
        a.write_u32(1);
        let _m = a.add_mark("x");
        a.write_u32(2);

        let forked = a.fork();

        assert_eq!(a.marks().len(), 0);
        assert_eq!(a.refs().len(), 0);
        assert_eq!(forked.marks().len(), 1);
        assert_eq!(forked.bytes(), a.bytes());
    }

    #[test]
    fn write_string_is_length_prefixed_without_terminator() {
        let mut buf = DataBuffer::new();
        buf.write_string("hi");
        assert_eq!(buf.bytes(), &[2, 0, 0, 0, b'h', b'i']);
    }
}
