//! The compilation unit produced by the compiler: opcodes, constants,
//! and debug metadata for one function body (spec §3, §4E). Grounded on
//! `passerine::common::lambda::Lambda`, which holds the same three
//! things (`code`, `constants`, `offsets`) for the same reason — but a
//! `Chunk` is `Rc`-shared by every closure built from it rather than
//! manually refcounted: spec's Design Notes call this out directly as
//! the clean rewrite of the two-memory-discipline original, where a
//! hand-written refcount existed only because C has no `Rc`.

use crate::common::opcode::{Op, Tag};
use crate::common::source::TranslationUnitId;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    pub translation_unit: TranslationUnitId,
    /// Name of the function this chunk belongs to, or `nil` for an
    /// anonymous lambda or the implicit top-level wrapper.
    pub name: Value,
    /// Run-length encoded `(op_offset, source_offset)` pairs, sorted by
    /// `op_offset`, ascending. To find the source offset for an
    /// instruction at `ip`, find the last entry whose `op_offset <= ip`.
    pub lines: Vec<(usize, usize)>,
}

impl Chunk {
    pub fn new(translation_unit: TranslationUnitId, name: Value) -> Chunk {
        Chunk { code: Vec::new(), constants: Vec::new(), translation_unit, name, lines: Vec::new() }
    }

    /// Adds `data` to the constant pool, reusing an existing identical
    /// entry when present, the way `Lambda::index_data` deduplicates by
    /// value equality. Returns the constant's index.
    pub fn index_constant(&mut self, data: Value) -> u16 {
        if let Some(pos) = self.constants.iter().position(|d| *d == data) {
            return pos as u16;
        }
        self.constants.push(data);
        (self.constants.len() - 1) as u16
    }

    /// Records that the next emitted byte corresponds to `source_offset`,
    /// if that differs from the most recently recorded offset.
    pub fn mark_source(&mut self, source_offset: usize) {
        let op_offset = self.code.len();
        match self.lines.last() {
            Some((_, last_src)) if *last_src == source_offset => {}
            _ => self.lines.push((op_offset, source_offset)),
        }
    }

    /// Looks up the source offset responsible for the instruction at
    /// `ip`, used to tie a runtime error to its origin (spec §4F).
    pub fn source_offset_for(&self, ip: usize) -> usize {
        match self.lines.partition_point(|(op_offset, _)| *op_offset <= ip) {
            0 => 0,
            n => self.lines[n - 1].1,
        }
    }

    pub fn emit(&mut self, op: Op, source_offset: usize) -> usize {
        self.mark_source(source_offset);
        let at = self.code.len();
        match op {
            Op::End => self.code.push(Tag::End as u8),
            Op::Nil => self.code.push(Tag::Nil as u8),
            Op::True => self.code.push(Tag::True as u8),
            Op::Const(idx) => {
                self.code.push(Tag::Const as u8);
                self.code.extend_from_slice(&idx.to_be_bytes());
            }
            Op::Append => self.code.push(Tag::Append as u8),
            Op::Pop => self.code.push(Tag::Pop as u8),
            Op::Find => self.code.push(Tag::Find as u8),
            Op::Call => self.code.push(Tag::Call as u8),
            Op::Jn(offset) => {
                self.code.push(Tag::Jn as u8);
                self.code.extend_from_slice(&offset.to_be_bytes());
            }
            Op::Let => self.code.push(Tag::Let as u8),
            Op::PushEnv => self.code.push(Tag::PushEnv as u8),
            Op::PopEnv => self.code.push(Tag::PopEnv as u8),
            Op::Car => self.code.push(Tag::Car as u8),
            Op::Cdr => self.code.push(Tag::Cdr as u8),
            Op::SetCar => self.code.push(Tag::SetCar as u8),
            Op::SetCdr => self.code.push(Tag::SetCdr as u8),
            Op::MakeFun(idx) => {
                self.code.push(Tag::MakeFun as u8);
                self.code.extend_from_slice(&idx.to_be_bytes());
            }
        }
        at
    }

    /// Patches a previously emitted `Jn`'s offset once the jump target
    /// is known. `at` is the index `emit` returned for that instruction.
    pub fn patch_jn(&mut self, at: usize, offset: i16) {
        debug_assert_eq!(Tag::from_byte(self.code[at]), Tag::Jn);
        let bytes = offset.to_be_bytes();
        self.code[at + 1] = bytes[0];
        self.code[at + 2] = bytes[1];
    }

    /// Decodes the instruction at `ip`. Returns the instruction and the
    /// `ip` of the next one.
    pub fn decode(&self, ip: usize) -> (Op, usize) {
        let tag = Tag::from_byte(self.code[ip]);
        let body_start = ip + 1;
        let op = match tag {
            Tag::End => Op::End,
            Tag::Nil => Op::Nil,
            Tag::True => Op::True,
            Tag::Const => Op::Const(u16::from_be_bytes([self.code[body_start], self.code[body_start + 1]])),
            Tag::Append => Op::Append,
            Tag::Pop => Op::Pop,
            Tag::Find => Op::Find,
            Tag::Call => Op::Call,
            Tag::Jn => Op::Jn(i16::from_be_bytes([self.code[body_start], self.code[body_start + 1]])),
            Tag::Let => Op::Let,
            Tag::PushEnv => Op::PushEnv,
            Tag::PopEnv => Op::PopEnv,
            Tag::Car => Op::Car,
            Tag::Cdr => Op::Cdr,
            Tag::SetCar => Op::SetCar,
            Tag::SetCdr => Op::SetCdr,
            Tag::MakeFun => Op::MakeFun(u16::from_be_bytes([self.code[body_start], self.code[body_start + 1]])),
        };
        (op, body_start + Op::body_len(tag))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rle_line_table_only_grows_on_change() {
        let mut chunk = Chunk::new(TranslationUnitId(0), Value::nil());
        chunk.emit(Op::Nil, 5);
        chunk.emit(Op::True, 5);
        chunk.emit(Op::Pop, 9);
        assert_eq!(chunk.lines, vec![(0, 5), (2, 9)]);
        assert_eq!(chunk.source_offset_for(0), 5);
        assert_eq!(chunk.source_offset_for(1), 5);
        assert_eq!(chunk.source_offset_for(2), 9);
    }

    #[test]
    fn decode_round_trips_operands() {
        let mut chunk = Chunk::new(TranslationUnitId(0), Value::nil());
        chunk.emit(Op::Const(300), 0);
        let (op, next) = chunk.decode(0);
        assert_eq!(op, Op::Const(300));
        assert_eq!(next, 3);
    }
}
