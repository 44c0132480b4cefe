//! VM state, the embedding-facing `VmConfig`, and allocation helpers
//! (spec §4F, §5, §6). The fetch-decode-execute loop itself lives in
//! `exec`, kept separate the way `passerine::vm::vm` (dispatch/state)
//! and `passerine::vm::exec` (per-opcode semantics) are split.

pub mod exec;
mod frame;

use std::collections::HashMap;

use crate::builtins;
use crate::common::error::{Diagnostic, Outcome};
use crate::common::source::{Source, TranslationUnitId};
use crate::value::object::{BindingFn, Kind, Payload};
use crate::value::Value;

pub use frame::Frame;

/// Host-supplied knobs (spec §6 "Configuration record"). Every field has
/// the stated default; construct with `VmConfig { heap_size: ..,
/// ..VmConfig::default() }` to override just one.
pub struct VmConfig {
    pub write_fn: Box<dyn FnMut(&str)>,
    pub error_fn: Box<dyn FnMut(&Diagnostic)>,
    pub heap_size: usize,
    pub min_heap_size: usize,
    pub heap_grow_percent: u32,
    /// Not in spec §6's table (which only the source-level GC exposes
    /// as a build flag); see SPEC_FULL.md §D.
    pub stress_gc: bool,
}

impl Default for VmConfig {
    fn default() -> VmConfig {
        VmConfig {
            write_fn: Box::new(|s| print!("{s}")),
            error_fn: Box::new(|d| eprintln!("{d}")),
            heap_size: 10 * 1024 * 1024,
            min_heap_size: 1024 * 1024,
            heap_grow_percent: 50,
            stress_gc: false,
        }
    }
}

pub struct Vm {
    pub(crate) gc: crate::gc::Gc,
    /// VM-wide symbol interning table (spec §3 invariant 3), keyed by
    /// name rather than by the `Value` itself since the whole point is
    /// to look a name up *before* any symbol object for it may exist.
    symbols: HashMap<String, Value>,
    pub(crate) global_env: Value,
    pub(crate) macro_env: Value,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<Frame>,
    /// Convenience cache of the top frame's env, or `global_env` when no
    /// frame is active (spec §4F).
    pub(crate) env: Value,
    sources: Vec<Source>,
    error_count: u32,
    config: VmConfig,
}

impl Vm {
    pub fn new(config: VmConfig) -> Vm {
        let gc = crate::gc::Gc::new(config.heap_size, config.min_heap_size, config.heap_grow_percent, config.stress_gc);
        let mut vm = Vm {
            gc,
            symbols: HashMap::new(),
            global_env: Value::nil(),
            macro_env: Value::nil(),
            stack: Vec::new(),
            frames: Vec::new(),
            env: Value::nil(),
            sources: Vec::new(),
            error_count: 0,
            config,
        };
        vm.global_env = vm.alloc_env(Value::nil(), Value::nil());
        vm.macro_env = vm.alloc_env(Value::nil(), Value::nil());
        vm.env = vm.global_env;
        builtins::install(&mut vm);
        vm
    }

    // -- allocation helpers --
    //
    // Each pins its already-constructed argument `Value`s as temp roots
    // before calling `self.alloc`, since `alloc` may collect *before*
    // the new object exists to hold them reachable (spec §5).

    pub(crate) fn alloc_cons(&mut self, car: Value, cdr: Value) -> Value {
        self.gc.push_temp_root(car);
        self.gc.push_temp_root(cdr);
        let v = self.alloc(Kind::Cons, Payload::Cons { car: std::cell::Cell::new(car), cdr: std::cell::Cell::new(cdr) });
        self.gc.pop_temp_root();
        self.gc.pop_temp_root();
        v
    }

    pub(crate) fn alloc_env(&mut self, up: Value, vars: Value) -> Value {
        self.gc.push_temp_root(up);
        self.gc.push_temp_root(vars);
        let v = self.alloc(Kind::Env, Payload::Env { vars: std::cell::Cell::new(vars), up: std::cell::Cell::new(up) });
        self.gc.pop_temp_root();
        self.gc.pop_temp_root();
        v
    }

    fn alloc_binding_value(&mut self, f: BindingFn) -> Value {
        self.alloc(Kind::Binding, Payload::Binding(f))
    }

    pub(crate) fn alloc_closure(&mut self, kind: Kind, chunk: std::rc::Rc<crate::common::chunk::Chunk>, params: Value, env: Value) -> Value {
        debug_assert!(matches!(kind, Kind::Func | Kind::Macro));
        self.gc.push_temp_root(params);
        self.gc.push_temp_root(env);
        let v = self.alloc(kind, Payload::Closure { chunk, params, env: std::cell::Cell::new(env) });
        self.gc.pop_temp_root();
        self.gc.pop_temp_root();
        v
    }

    /// Interns `name`, allocating a fresh `symbol` object only on first
    /// sight of this exact byte sequence (spec §3 invariant 3).
    pub(crate) fn intern(&mut self, name: &str) -> Value {
        if let Some(v) = self.symbols.get(name) {
            return *v;
        }
        let hash = djb2(name.as_bytes());
        let v = self.alloc(Kind::Symbol, Payload::Symbol { hash, name: name.into() });
        self.symbols.insert(name.to_string(), v);
        v
    }

    // -- env chain --

    /// Walks `env`'s chain outward, returning the `(name . value)` pair
    /// whose `car` is identical (by symbol pointer) to `sym`.
    pub(crate) fn env_find(&self, mut env: Value, sym: Value) -> Option<Value> {
        loop {
            let mut vars = env.unwrap_env_vars();
            while vars.is_cons() {
                let pair = vars.car();
                if pair.car() == sym {
                    return Some(pair);
                }
                vars = vars.cdr();
            }
            let up = env.unwrap_env_up();
            if up.is_nil() {
                return None;
            }
            env = up;
        }
    }

    /// Prepends a fresh `(name . value)` pair to `env`'s vars, the way
    /// the `LET` opcode does (also used to install builtins/`defun`
    /// results without going through bytecode).
    pub(crate) fn env_define(&mut self, env: Value, name: Value, value: Value) {
        let pair = self.alloc_cons(name, value);
        self.gc.push_temp_root(pair);
        let vars = env.unwrap_env_vars();
        let new_vars = self.alloc_cons(pair, vars);
        self.gc.pop_temp_root();
        env.set_env_vars(new_vars);
    }

    // -- embedding API (spec §6) --

    /// Installs a host primitive in the root environment. Must happen
    /// before any GC root depends on it (spec §4G).
    pub fn add_binding(&mut self, name: &str, f: BindingFn) {
        let sym = self.intern(name);
        let binding = self.alloc_binding_value(f);
        let env = self.global_env;
        self.env_define(env, sym, binding);
    }

    pub fn write(&mut self, s: &str) {
        (self.config.write_fn)(s);
    }

    pub(crate) fn report(&mut self, d: Diagnostic) {
        self.error_count += 1;
        (self.config.error_fn)(&d);
    }

    fn next_translation_unit(&mut self, source: Source) -> TranslationUnitId {
        let id = TranslationUnitId(self.sources.len() as u32);
        self.sources.push(source);
        id
    }

    /// Runs the full pipeline (lex → read → compile → execute) over one
    /// translation unit (spec §2 data flow, §6 `interpret`).
    ///
    /// Compilation scans every top-level form before any of them runs
    /// (spec §7: "compile errors continue scanning to produce multiple
    /// diagnostics per interpret call"). A form that fails to compile
    /// contributes its diagnostics and is skipped; execution only begins
    /// once the whole translation unit has compiled clean — one broken
    /// form must not hide a sibling's errors, and a form after the last
    /// broken one is never silently run.
    pub fn interpret(&mut self, source: impl Into<String>, name: impl Into<String>) -> Outcome {
        self.error_count = 0;
        let tu = self.next_translation_unit(Source::new(name, source));
        let text = self.sources[tu.0 as usize].contents.clone();

        let mut locations = crate::reader::Locations::new();
        let (forms, diagnostics) = crate::reader::read_all(&text, tu, self, &mut locations);
        if !diagnostics.is_empty() {
            for d in &diagnostics {
                self.report(d.clone());
            }
            return Outcome::CompileError(diagnostics);
        }

        let mut chunks = Vec::with_capacity(forms.len());
        let mut compile_diagnostics = Vec::new();
        for form in forms {
            match crate::compiler::compile_top_level(self, form, tu, &locations) {
                Ok(chunk) => chunks.push(chunk),
                Err(diags) => compile_diagnostics.extend(diags),
            }
        }
        if !compile_diagnostics.is_empty() {
            for d in &compile_diagnostics {
                self.report(d.clone());
            }
            return Outcome::CompileError(compile_diagnostics);
        }

        let mut last = Value::nil();
        for chunk in chunks {
            let closure = self.alloc_closure(Kind::Func, std::rc::Rc::new(chunk), Value::nil(), self.global_env);
            last = match exec::call_top_level(self, closure) {
                Ok(v) => v,
                Err(d) => {
                    self.report(d.clone());
                    return Outcome::RuntimeError(d);
                }
            };
        }
        Outcome::Ok(last)
    }
}

/// djb2, matching `hll_value.h`'s symbol hash exactly.
fn djb2(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 5381;
    for &b in bytes {
        hash = hash.wrapping_mul(33).wrapping_add(b as u32);
    }
    hash
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interning_is_pointer_identical() {
        let mut vm = Vm::new(VmConfig::default());
        let a = vm.intern("foo");
        let b = vm.intern("foo");
        assert_eq!(a, b);
        let c = vm.intern("bar");
        assert_ne!(a, c);
    }

    #[test]
    fn env_define_then_find() {
        let mut vm = Vm::new(VmConfig::default());
        let sym = vm.intern("x");
        let env = vm.global_env;
        vm.env_define(env, sym, Value::num(42.0));
        let pair = vm.env_find(env, sym).expect("binding should be found");
        assert_eq!(pair.cdr().unwrap_num(), 42.0);
    }
}
