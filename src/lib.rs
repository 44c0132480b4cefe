//! hololisp: a small Lisp compiled to a stack-based bytecode and run on
//! a NaN-boxed, mark-and-sweep VM (spec §1, §2). This crate is the
//! embeddable core; `cli/main.rs` is a thin host built on top of it the
//! way `passerine`'s own binary sits on top of its library crate.
//!
//! Module layout mirrors the pipeline in spec §2: `lexer` -> `reader` ->
//! `compiler` -> `vm`, with `value` and `gc` underneath all four stages
//! and `common` holding the datatypes they share.

pub mod builtins;
pub mod common;
pub mod compiler;
pub mod gc;
pub mod lexer;
pub mod reader;
pub mod value;
pub mod vm;

pub use common::error::{Diagnostic, DiagnosticKind, Outcome};
pub use common::source::{Source, TranslationUnitId};
pub use value::Value;
pub use vm::{Vm, VmConfig};
