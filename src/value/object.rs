//! Heap object layout (spec §3). Every object shares the header the spec
//! describes — kind tag, mark bit, next-pointer threading it into the
//! GC's intrusive live list — with a per-kind payload.
//!
//! Passerine's own `Data` enum (`common/data.rs`) keeps payloads next to
//! a plain Rust enum and lets `Rc`/scope-exit do the freeing; hololisp
//! can't do that, because the spec's GC traces reachability from VM
//! roots rather than following Rust ownership (a `cons` cell can outlive
//! the stack frame that built it, be captured by a closure, etc). So
//! objects here live behind raw pointers on an intrusive list the
//! collector walks directly, the way `hll_gc.c`'s `all_objs` list does.

use std::cell::Cell;
use std::rc::Rc;

use crate::common::chunk::Chunk;
use crate::value::Value;
use crate::vm::Vm;

/// Discriminant stored in every heap object's header, and also the
/// non-heap singleton/number discriminants returned by `Value::kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Num,
    Nil,
    True,
    Cons,
    Symbol,
    Binding,
    Env,
    Func,
    Macro,
}

/// A host-implemented primitive (spec §3 `binding`). Takes the VM (so it
/// can allocate and signal errors) and the already-evaluated argument
/// list, and returns a value or an error message; the VM attaches the
/// message to the call site's span.
pub type BindingFn = fn(&mut Vm, Value) -> Result<Value, String>;

pub enum Payload {
    Cons { car: Cell<Value>, cdr: Cell<Value> },
    Symbol { hash: u32, name: Box<str> },
    Env { vars: Cell<Value>, up: Cell<Value> },
    Binding(BindingFn),
    /// Shared by `func` and `macro` (spec §3: "macro is structurally
    /// identical to func"). `Obj::kind` tells them apart.
    Closure { chunk: Rc<Chunk>, params: Value, env: Cell<Value> },
}

/// The common header plus payload of one heap value (spec §3 "Heap
/// objects share a common header").
pub struct Obj {
    pub kind: Kind,
    pub marked: Cell<bool>,
    /// Thread pointer for the GC's intrusive live list. `None` once an
    /// object has been unlinked during sweep (it is about to be freed,
    /// never observed again).
    pub next: Cell<Option<*mut Obj>>,
    pub payload: Payload,
}

impl Obj {
    /// Approximate size used for `bytes_allocated` bookkeeping, mirroring
    /// `hll_gc.c`'s per-kind `sizeof` additions in `hll_blacken_value`.
    pub fn approx_size(&self) -> usize {
        let header = std::mem::size_of::<Obj>();
        let payload = match &self.payload {
            Payload::Cons { .. } => 0,
            Payload::Symbol { name, .. } => name.len(),
            Payload::Env { .. } => 0,
            Payload::Binding(_) => 0,
            Payload::Closure { .. } => 0,
        };
        header + payload
    }
}
