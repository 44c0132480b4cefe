//! Lowers a read value tree into one bytecode `Chunk` per top-level form
//! (spec §4E). `passerine::compiler::gen` plays the same role relative
//! to passerine's own CST — one pass turning already-parsed structure
//! into opcodes against a constant pool — though passerine lowers a
//! true AST whereas hololisp lowers the value tree the reader already
//! built directly, per spec §2's data flow.
//!
//! Special forms are dispatched on the head symbol of a list form,
//! ahead of the macro-environment check, ahead of ordinary application
//! — exactly the precedence spec §4E's lowering-rules list implies by
//! listing special forms first and "macro call" last.

use std::collections::HashSet;
use std::rc::Rc;

use crate::common::chunk::Chunk;
use crate::common::error::{Diagnostic, DiagnosticKind};
use crate::common::opcode::Op;
use crate::common::source::TranslationUnitId;
use crate::common::span::Span;
use crate::reader::Locations;
use crate::value::object::Kind;
use crate::value::{Value, ValueKind};
use crate::vm::{exec, Vm};

/// One top-level form's compilation state: the chunk under construction,
/// the stack of `let`-introduced scopes (tracked only to catch duplicate
/// bindings within one scope, per spec §4E), and diagnostics gathered so
/// far. Does not hold the `Vm` — every method that needs to allocate or
/// look up a macro binding takes `vm: &mut Vm` explicitly, the way
/// `exec::step` threads it through free functions rather than storing it.
struct Compiler<'loc> {
    tu: TranslationUnitId,
    locations: &'loc Locations,
    chunk: Chunk,
    scopes: Vec<HashSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

/// Compiles one top-level form into a chunk, per spec §2 ("compiler
/// produces a function value whose body is a bytecode chunk"). Errors
/// accumulate rather than stopping at the first one (spec §7: "compile
/// errors continue scanning to produce multiple diagnostics per run").
pub(crate) fn compile_top_level(vm: &mut Vm, form: Value, tu: TranslationUnitId, locations: &Locations) -> Result<Chunk, Vec<Diagnostic>> {
    let mut compiler = Compiler { tu, locations, chunk: Chunk::new(tu, Value::nil()), scopes: Vec::new(), diagnostics: Vec::new() };
    let top_span = Span::point(tu, 0);
    let span = compiler.span_of(form, top_span);
    compiler.compile_expr(vm, form, span);
    compiler.emit(Op::End, span);
    if compiler.diagnostics.is_empty() {
        Ok(compiler.chunk)
    } else {
        Err(compiler.diagnostics)
    }
}

impl<'loc> Compiler<'loc> {
    fn emit(&mut self, op: Op, span: Span) -> usize {
        self.chunk.emit(op, span.offset)
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(span, DiagnosticKind::Compile, message));
    }

    fn span_of(&self, v: Value, fallback: Span) -> Span {
        self.locations.get(&v.raw_bits()).copied().unwrap_or(fallback)
    }

    /// Pushes `Nil` then an unconditional `Jn` — the pattern spec §4E's
    /// `if` lowering calls out by name ("unconditional via push-nil+JN
    /// pattern if needed"). Returns the `Jn`'s position for `patch_jump`.
    fn emit_unconditional_jump(&mut self, span: Span) -> usize {
        self.emit(Op::Nil, span);
        self.emit(Op::Jn(0), span)
    }

    /// Patches the `Jn` emitted at `at` so it lands on `target`, computing
    /// the signed offset relative to the IP just after the instruction
    /// (matching `exec::step`'s `Op::Jn` handling, which already advanced
    /// past the tag and operand bytes before applying the offset).
    fn patch_jump(&mut self, at: usize, target: usize) {
        let offset = target as isize - (at as isize + 3);
        debug_assert!((i16::MIN as isize..=i16::MAX as isize).contains(&offset), "jump offset out of range");
        self.chunk.patch_jn(at, offset as i16);
    }

    /// Walks `v` as `car`/`cdr`, collecting elements. Reports `context: improper
    /// list` if the walk doesn't end in `nil`.
    fn list_items(&mut self, v: Value, span: Span, context: &str) -> Vec<Value> {
        let mut items = Vec::new();
        let mut cur = v;
        while cur.is_cons() {
            items.push(cur.car());
            cur = cur.cdr();
        }
        if !cur.is_nil() {
            self.error(span, format!("{context}: improper list"));
        }
        items
    }

    // -- top-level dispatch --

    fn compile_expr(&mut self, vm: &mut Vm, v: Value, span: Span) {
        match v.kind() {
            ValueKind::Num | ValueKind::Nil | ValueKind::True => self.compile_self_evaluating(v, span),
            ValueKind::Symbol => self.compile_symbol_ref(v, span),
            ValueKind::Cons => self.compile_call_form(vm, v, span),
            other => unreachable!("reader never produces a {other:?} literal"),
        }
    }

    fn compile_self_evaluating(&mut self, v: Value, span: Span) {
        match v.kind() {
            ValueKind::Nil => self.emit(Op::Nil, span),
            ValueKind::True => self.emit(Op::True, span),
            _ => {
                let idx = self.chunk.index_constant(v);
                self.emit(Op::Const(idx), span)
            }
        };
    }

    /// `CONST sym; FIND; CAR` — fetch the binding cell, then its value
    /// (spec §4E "Symbol reference").
    fn compile_symbol_ref(&mut self, v: Value, span: Span) {
        let idx = self.chunk.index_constant(v);
        self.emit(Op::Const(idx), span);
        self.emit(Op::Find, span);
        self.emit(Op::Car, span);
    }

    fn compile_call_form(&mut self, vm: &mut Vm, v: Value, span: Span) {
        let head = v.car();
        let rest = v.cdr();

        if head.is_symbol() {
            match head.unwrap_symbol_name() {
                "quote" => return self.compile_quote_form(rest, span),
                "if" => return self.compile_if_form(vm, rest, span),
                "let" => return self.compile_let_form(vm, rest, span),
                "lambda" => return self.compile_lambda_form(vm, rest, span),
                "defun" => return self.compile_defun_form(vm, rest, span),
                "defmacro" => return self.compile_defmacro_form(vm, rest, span),
                "setcar" => return self.compile_setcar_form(vm, rest, span),
                "setcdr" => return self.compile_setcdr_form(vm, rest, span),
                "and" => return self.compile_and_form(vm, rest, span),
                "or" => return self.compile_or_form(vm, rest, span),
                "progn" => return self.compile_progn_form(vm, rest, span),
                "while" => return self.compile_while_form(vm, rest, span),
                "setq" => return self.compile_setq_form(vm, rest, span),
                _ => {}
            }

            let macro_env = vm.macro_env;
            if let Some(pair) = vm.env_find(macro_env, head) {
                let macro_val = pair.cdr();
                match exec::invoke_macro(vm, macro_val, rest, span) {
                    Ok(expansion) => {
                        let exp_span = self.span_of(expansion, span);
                        return self.compile_expr(vm, expansion, exp_span);
                    }
                    Err(diag) => {
                        self.error(span, format!("error expanding macro {}: {}", head.unwrap_symbol_name(), diag.message));
                        self.emit(Op::Nil, span);
                        return;
                    }
                }
            }
        }

        // Ordinary application: the compiler never checks at compile time
        // that `head` names something bound (spec §7's "unbound-form"
        // category covers special-form-shaped mistakes, not this case —
        // see DESIGN.md). An unbound callee surfaces as `FIND`'s own
        // "unbound symbol" runtime error, which is what makes forward
        // reference and self-recursion in `defun` work at all.
        let head_span = self.span_of(head, span);
        self.compile_expr(vm, head, head_span);
        self.compile_arg_list(vm, rest, span);
        self.emit(Op::Call, span);
    }

    /// Builds the `(head, tail)` accumulator and appends each evaluated
    /// argument, per spec §4E "List construction for application".
    fn compile_arg_list(&mut self, vm: &mut Vm, args: Value, span: Span) {
        self.emit(Op::Nil, span);
        self.emit(Op::Nil, span);
        let mut cur = args;
        while cur.is_cons() {
            let elem = cur.car();
            let elem_span = self.span_of(elem, span);
            self.compile_expr(vm, elem, elem_span);
            self.emit(Op::Append, elem_span);
            cur = cur.cdr();
        }
        if !cur.is_nil() {
            self.error(span, "malformed call: improper argument list");
        }
        self.emit(Op::Pop, span);
    }

    fn compile_body(&mut self, vm: &mut Vm, body: &[Value], span: Span) {
        if body.is_empty() {
            self.emit(Op::Nil, span);
            return;
        }
        for (i, expr) in body.iter().enumerate() {
            let s = self.span_of(*expr, span);
            self.compile_expr(vm, *expr, s);
            if i + 1 < body.len() {
                self.emit(Op::Pop, s);
            }
        }
    }

    // -- quote --

    fn compile_quote_form(&mut self, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "quote");
        if items.len() != 1 {
            self.error(span, format!("quote: expected 1 argument, got {}", items.len()));
            self.emit(Op::Nil, span);
            return;
        }
        self.compile_quote(items[0], span);
    }

    fn compile_quote(&mut self, v: Value, span: Span) {
        let s = self.span_of(v, span);
        match v.kind() {
            ValueKind::Cons => self.compile_quote_list(v, s),
            _ => self.compile_self_evaluating_or_symbol(v, s),
        }
    }

    fn compile_self_evaluating_or_symbol(&mut self, v: Value, span: Span) {
        match v.kind() {
            ValueKind::Nil => self.emit(Op::Nil, span),
            ValueKind::True => self.emit(Op::True, span),
            ValueKind::Num | ValueKind::Symbol => {
                let idx = self.chunk.index_constant(v);
                self.emit(Op::Const(idx), span)
            }
            other => unreachable!("reader never produces a quoted {other:?} literal"),
        };
    }

    /// `NIL NIL … APPEND … POP`, with a trailing `SETCDR` for an
    /// improper tail — spec §4E: "lists built with NIL NIL … APPEND …
    /// POP". A fresh cons chain is built on every evaluation rather than
    /// sharing one constant-pool value, so mutating a quoted literal via
    /// `setcar`/`setcdr` inside a function called more than once can't
    /// alias across calls.
    fn compile_quote_list(&mut self, v: Value, span: Span) {
        self.emit(Op::Nil, span);
        self.emit(Op::Nil, span);
        let mut cur = v;
        while cur.is_cons() {
            let elem_span = self.span_of(cur.car(), span);
            self.compile_quote(cur.car(), elem_span);
            self.emit(Op::Append, elem_span);
            cur = cur.cdr();
        }
        if !cur.is_nil() {
            let tail_span = self.span_of(cur, span);
            self.compile_quote(cur, tail_span);
            self.emit(Op::SetCdr, tail_span);
        }
        self.emit(Op::Pop, span);
    }

    // -- if --

    fn compile_if_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "if");
        if items.len() < 2 || items.len() > 3 {
            self.error(span, format!("if: expected 2 or 3 arguments, got {}", items.len()));
            self.emit(Op::Nil, span);
            return;
        }
        let cond_span = self.span_of(items[0], span);
        self.compile_expr(vm, items[0], cond_span);
        let jn_else = self.emit(Op::Jn(0), span);

        let then_span = self.span_of(items[1], span);
        self.compile_expr(vm, items[1], then_span);
        let jn_end = self.emit_unconditional_jump(span);

        let else_pos = self.chunk.code.len();
        self.patch_jump(jn_else, else_pos);
        match items.get(2) {
            Some(e) => {
                let s = self.span_of(*e, span);
                self.compile_expr(vm, *e, s);
            }
            None => {
                self.emit(Op::Nil, span);
            }
        }

        let end_pos = self.chunk.code.len();
        self.patch_jump(jn_end, end_pos);
    }

    // -- let --

    fn compile_let_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "let");
        if items.is_empty() {
            self.error(span, "let: expected a binding list");
            self.emit(Op::Nil, span);
            return;
        }
        let bindings = self.list_items(items[0], span, "let bindings");
        let body = &items[1..];

        self.emit(Op::PushEnv, span);
        self.scopes.push(HashSet::new());
        for binding in &bindings {
            let b_span = self.span_of(*binding, span);
            let pair = self.list_items(*binding, b_span, "let binding");
            if pair.len() != 2 {
                self.error(b_span, "let: binding must be (name value)");
                continue;
            }
            let name = pair[0];
            if !name.is_symbol() {
                self.error(b_span, "let: binding name must be a symbol");
                continue;
            }
            let name_str = name.unwrap_symbol_name().to_string();
            if !self.scopes.last_mut().expect("pushed above").insert(name_str.clone()) {
                self.error(b_span, format!("duplicate let binding: {name_str}"));
                continue;
            }
            let name_idx = self.chunk.index_constant(name);
            self.emit(Op::Const(name_idx), b_span);
            let val_span = self.span_of(pair[1], b_span);
            self.compile_expr(vm, pair[1], val_span);
            self.emit(Op::Let, b_span);
        }

        self.compile_body(vm, body, span);
        self.emit(Op::PopEnv, span);
        self.scopes.pop();
    }

    // -- lambda / defun / defmacro --

    fn validate_params(&mut self, params: Value, span: Span) {
        let mut cur = params;
        while cur.is_cons() {
            if !cur.car().is_symbol() {
                self.error(span, "lambda: parameter name must be a symbol");
            }
            cur = cur.cdr();
        }
        if !cur.is_nil() && !cur.is_symbol() {
            self.error(span, "lambda: rest parameter must be a symbol");
        }
    }

    /// Compiles `body` into a fresh chunk named `name` (`nil` for an
    /// anonymous `lambda`), the nested-compiler half of spec §4E's
    /// `lambda`/`defun` lowering.
    fn compile_function_chunk(&mut self, vm: &mut Vm, params: Value, body: &[Value], name: Value, span: Span) -> Rc<Chunk> {
        self.validate_params(params, span);
        let mut inner = Compiler { tu: self.tu, locations: self.locations, chunk: Chunk::new(self.tu, name), scopes: Vec::new(), diagnostics: Vec::new() };
        inner.compile_body(vm, body, span);
        inner.emit(Op::End, span);
        self.diagnostics.extend(inner.diagnostics);
        Rc::new(inner.chunk)
    }

    fn compile_lambda_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "lambda");
        if items.is_empty() {
            self.error(span, "lambda: expected a parameter list");
            self.emit(Op::Nil, span);
            return;
        }
        let params = items[0];
        let body = &items[1..];
        let chunk = self.compile_function_chunk(vm, params, body, Value::nil(), span);
        let template = vm.alloc_closure(Kind::Func, chunk, params, Value::nil());
        let idx = self.chunk.index_constant(template);
        self.emit(Op::MakeFun(idx), span);
    }

    /// `defun name params body…`: builds the closure exactly like
    /// `lambda`, then binds it under `name` in the current env via
    /// `CONST name; MAKEFUN idx; LET` — the only difference from a bare
    /// `lambda` is that install step (spec §4E).
    fn compile_defun_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "defun");
        if items.len() < 2 {
            self.error(span, "defun: expected a name and parameter list");
            self.emit(Op::Nil, span);
            return;
        }
        let name = items[0];
        if !name.is_symbol() {
            self.error(span, "defun: expected a symbol name");
            self.emit(Op::Nil, span);
            return;
        }
        let params = items[1];
        let body = &items[2..];
        let chunk = self.compile_function_chunk(vm, params, body, name, span);

        let name_idx = self.chunk.index_constant(name);
        self.emit(Op::Const(name_idx), span);
        let template = vm.alloc_closure(Kind::Func, chunk, params, Value::nil());
        let fn_idx = self.chunk.index_constant(template);
        self.emit(Op::MakeFun(fn_idx), span);
        self.emit(Op::Let, span);
        // defun's own value is the name, like the result of LET's operand.
        self.emit(Op::Const(name_idx), span);
    }

    /// `defmacro`: identical body-compilation to `defun`, but the
    /// resulting closure is a `macro` and is installed directly into the
    /// macro environment at compile time — never through emitted
    /// bytecode — since macro lookup only ever happens while compiling
    /// (spec §4E: "the binding is installed in the macro environment").
    fn compile_defmacro_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "defmacro");
        if items.len() < 2 {
            self.error(span, "defmacro: expected a name and parameter list");
            self.emit(Op::Nil, span);
            return;
        }
        let name = items[0];
        if !name.is_symbol() {
            self.error(span, "defmacro: expected a symbol name");
            self.emit(Op::Nil, span);
            return;
        }
        let params = items[1];
        let body = &items[2..];
        let chunk = self.compile_function_chunk(vm, params, body, name, span);

        let global_env = vm.global_env;
        let macro_val = vm.alloc_closure(Kind::Macro, chunk, params, global_env);
        let macro_env = vm.macro_env;
        vm.env_define(macro_env, name, macro_val);

        let name_idx = self.chunk.index_constant(name);
        self.emit(Op::Const(name_idx), span);
    }

    // -- setcar / setcdr --

    fn compile_setcar_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        self.compile_mutation_form(vm, rest, span, "setcar", Op::SetCar);
    }

    fn compile_setcdr_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        self.compile_mutation_form(vm, rest, span, "setcdr", Op::SetCdr);
    }

    fn compile_mutation_form(&mut self, vm: &mut Vm, rest: Value, span: Span, name: &str, op: Op) {
        let items = self.list_items(rest, span, name);
        if items.len() != 2 {
            self.error(span, format!("{name}: expected 2 arguments, got {}", items.len()));
            self.emit(Op::Nil, span);
            return;
        }
        let place_span = self.span_of(items[0], span);
        self.compile_expr(vm, items[0], place_span);
        let val_span = self.span_of(items[1], span);
        self.compile_expr(vm, items[1], val_span);
        self.emit(op, span);
    }

    // -- and / or --

    fn compile_and_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "and");
        if items.is_empty() {
            self.emit(Op::True, span);
            return;
        }
        self.compile_and_seq(vm, &items, span);
    }

    /// `and`'s short circuit doesn't need to preserve a falsy operand's
    /// own value, since the only falsy value in this language is `nil`
    /// itself — jumping to a fresh `NIL` is indistinguishable from
    /// reusing the one that was just popped by `JN`.
    fn compile_and_seq(&mut self, vm: &mut Vm, items: &[Value], span: Span) {
        if items.len() == 1 {
            let s = self.span_of(items[0], span);
            self.compile_expr(vm, items[0], s);
            return;
        }
        let s0 = self.span_of(items[0], span);
        self.compile_expr(vm, items[0], s0);
        let jn_else = self.emit(Op::Jn(0), span);
        self.compile_and_seq(vm, &items[1..], span);
        let jn_end = self.emit_unconditional_jump(span);
        let else_pos = self.chunk.code.len();
        self.patch_jump(jn_else, else_pos);
        self.emit(Op::Nil, span);
        let end_pos = self.chunk.code.len();
        self.patch_jump(jn_end, end_pos);
    }

    fn compile_or_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "or");
        if items.is_empty() {
            self.emit(Op::Nil, span);
            return;
        }
        self.compile_or_seq(vm, &items, span);
    }

    /// `or` must preserve a truthy operand's own value without
    /// re-evaluating it (re-evaluating would run the operand's side
    /// effects twice). The opcode set has no "duplicate top of stack", so
    /// each clause's value is stashed in a scratch env binding instead
    /// and read back whichever of the one or two times it's needed; the
    /// binding's name is interned with a leading space, a byte sequence
    /// no symbol token can ever scan to, so it can't collide with a
    /// user-visible variable (spec §4C's symbol-class bytes never include
    /// whitespace).
    fn compile_or_seq(&mut self, vm: &mut Vm, items: &[Value], span: Span) {
        if items.len() == 1 {
            let s = self.span_of(items[0], span);
            self.compile_expr(vm, items[0], s);
            return;
        }
        let tmp = vm.intern(" or");
        self.emit(Op::PushEnv, span);
        let tmp_idx = self.chunk.index_constant(tmp);

        self.emit(Op::Const(tmp_idx), span);
        let s0 = self.span_of(items[0], span);
        self.compile_expr(vm, items[0], s0);
        self.emit(Op::Let, span);

        self.emit(Op::Const(tmp_idx), span);
        self.emit(Op::Find, span);
        self.emit(Op::Car, span);
        let jn_else = self.emit(Op::Jn(0), span);

        self.emit(Op::Const(tmp_idx), span);
        self.emit(Op::Find, span);
        self.emit(Op::Car, span);
        let jn_end = self.emit_unconditional_jump(span);

        let else_pos = self.chunk.code.len();
        self.patch_jump(jn_else, else_pos);
        self.compile_or_seq(vm, &items[1..], span);

        let end_pos = self.chunk.code.len();
        self.patch_jump(jn_end, end_pos);
        self.emit(Op::PopEnv, span);
    }

    // -- progn / while / setq --

    fn compile_progn_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "progn");
        self.compile_body(vm, &items, span);
    }

    /// `cond; JN Lexit; body… (each POPped, the loop result is always
    /// discarded); back-edge JN to the top; Lexit: nil` (spec §4E
    /// "while (back-edge via JN)").
    fn compile_while_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "while");
        if items.is_empty() {
            self.error(span, "while: expected a condition");
            self.emit(Op::Nil, span);
            return;
        }
        let cond = items[0];
        let body = &items[1..];

        let loop_start = self.chunk.code.len();
        let cond_span = self.span_of(cond, span);
        self.compile_expr(vm, cond, cond_span);
        let jn_exit = self.emit(Op::Jn(0), span);

        for expr in body {
            let s = self.span_of(*expr, span);
            self.compile_expr(vm, *expr, s);
            self.emit(Op::Pop, s);
        }
        self.emit(Op::Nil, span);
        let back = self.emit(Op::Jn(0), span);
        self.patch_jump(back, loop_start);

        let exit_pos = self.chunk.code.len();
        self.patch_jump(jn_exit, exit_pos);
        self.emit(Op::Nil, span);
    }

    /// `CONST name; FIND; val; SETCDR` (spec §4E "setq (emit FIND then
    /// SETCDR)"). Leaves the mutated binding cell on the stack, the same
    /// convention `setcar`/`setcdr` use, since `SETCDR` never pops it.
    fn compile_setq_form(&mut self, vm: &mut Vm, rest: Value, span: Span) {
        let items = self.list_items(rest, span, "setq");
        if items.len() != 2 {
            self.error(span, format!("setq: expected 2 arguments, got {}", items.len()));
            self.emit(Op::Nil, span);
            return;
        }
        let name = items[0];
        if !name.is_symbol() {
            self.error(span, "setq: expected a symbol");
            self.emit(Op::Nil, span);
            return;
        }
        let name_idx = self.chunk.index_constant(name);
        self.emit(Op::Const(name_idx), span);
        self.emit(Op::Find, span);
        let val_span = self.span_of(items[1], span);
        self.compile_expr(vm, items[1], val_span);
        self.emit(Op::SetCdr, span);
    }
}

#[cfg(test)]
mod test {
    use crate::common::error::Outcome;
    use crate::vm::VmConfig;
    use crate::Vm;

    fn run(src: &str) -> Outcome {
        let mut vm = Vm::new(VmConfig::default());
        vm.interpret(src, "<test>")
    }

    fn run_ok_num(src: &str) -> f64 {
        match run(src) {
            Outcome::Ok(v) => v.unwrap_num(),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn if_picks_the_right_branch() {
        assert_eq!(run_ok_num("(if () 1 2)"), 2.0);
        assert_eq!(run_ok_num("(if 1 1 2)"), 1.0);
    }

    #[test]
    fn if_with_missing_else_is_nil() {
        let mut vm = Vm::new(VmConfig::default());
        match vm.interpret("(if () 1)", "<test>") {
            Outcome::Ok(v) => assert!(v.is_nil()),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn let_sees_earlier_bindings_in_later_values() {
        assert_eq!(run_ok_num("(let ((a 1) (b (+ a 1))) b)"), 2.0);
    }

    #[test]
    fn duplicate_let_binding_is_a_single_compile_error() {
        match run("(let ((x 1) (x 2)) x)") {
            Outcome::CompileError(diags) => {
                assert_eq!(diags.len(), 1);
                assert!(diags[0].message.contains("duplicate let binding"));
            }
            other => panic!("expected CompileError, got {other:?}"),
        }
    }

    #[test]
    fn lambda_and_call() {
        assert_eq!(run_ok_num("((lambda (x) (* x x)) 5)"), 25.0);
    }

    #[test]
    fn defun_supports_self_recursion() {
        assert_eq!(run_ok_num("(defun fact (n) (if (<= n 1) 1 (* n (fact (- n 1))))) (fact 5)"), 120.0);
    }

    #[test]
    fn and_short_circuits_without_evaluating_the_rest() {
        // If `and` evaluated past the first `nil`, the unbound `boom`
        // reference would raise a runtime error instead of returning nil.
        let mut vm = Vm::new(VmConfig::default());
        match vm.interpret("(and () (boom))", "<test>") {
            Outcome::Ok(v) => assert!(v.is_nil()),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn or_returns_first_truthy_without_double_evaluating() {
        assert_eq!(run_ok_num("(let ((n 0)) (or (setq n (+ n 1)) (setq n (+ n 1))) n)"), 1.0);
    }

    #[test]
    fn while_loop_runs_to_completion() {
        assert_eq!(run_ok_num("(let ((i 0) (acc 0)) (while (< i 5) (setq acc (+ acc i)) (setq i (+ i 1))) acc)"), 10.0);
    }

    #[test]
    fn quote_builds_a_fresh_list_each_call() {
        let mut vm = Vm::new(VmConfig::default());
        let src = "(defun f () (quote (1 2))) (setcar (f) 9) (car (f))";
        match vm.interpret(src, "<test>") {
            Outcome::Ok(v) => assert_eq!(v.unwrap_num(), 1.0),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn defmacro_expands_at_compile_time() {
        assert_eq!(run_ok_num("(defmacro twice (x) (list (quote +) x x)) (twice 21)"), 42.0);
    }
}
