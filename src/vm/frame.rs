//! A single call frame (spec §4F).

use std::rc::Rc;

use crate::common::chunk::Chunk;
use crate::value::Value;

pub struct Frame {
    /// The `func` value being executed (kept alive as a GC root; also
    /// lets a future backtrace print the callee's name).
    pub func: Value,
    pub chunk: Rc<Chunk>,
    pub ip: usize,
    /// Environment saved on entry; also the frame's "current env" cache,
    /// since hololisp keeps exactly one env pointer live per frame.
    pub env: Value,
    /// Operand-stack length at call time. `END` truncates back to this
    /// before pushing the return value, discarding anything the callee
    /// left behind.
    pub stack_base: usize,
}
