//! Datatypes shared by every stage of the pipeline: source buffers,
//! spans and diagnostics, the opcode table, and the bytecode chunk.
//! Mirrors the role of `passerine::common` one level down from the
//! value representation, which gets its own top-level module here
//! because the GC needs to reach into it directly.

pub mod chunk;
pub mod error;
pub mod opcode;
pub mod source;
pub mod span;
