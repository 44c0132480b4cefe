//! The fetch-decode-execute loop and per-opcode semantics (spec §4F).
//! Split out of `vm::mod` the way `passerine::vm::exec` sits beside
//! `passerine::vm::vm`.

use std::rc::Rc;

use crate::common::error::{Diagnostic, DiagnosticKind};
use crate::common::opcode::Op;
use crate::common::span::Span;
use crate::value::object::Kind;
use crate::value::Value;
use crate::vm::{Frame, Vm};

fn runtime_error(span: Span, message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(span, DiagnosticKind::Runtime, message)
}

/// Pushes a frame for `closure` (a zero-argument top-level chunk) and
/// runs it to completion, returning its result.
pub(crate) fn call_top_level(vm: &mut Vm, closure: Value) -> Result<Value, Diagnostic> {
    let chunk = closure.unwrap_closure_chunk();
    let captured = closure.unwrap_closure_env();
    let env = vm.alloc_env(captured, Value::nil());
    let stack_base = vm.stack.len();
    vm.frames.push(Frame { func: closure, chunk, ip: 0, env, stack_base });
    vm.env = env;
    run(vm)
}

/// Runs until the frame stack this call pushed (and anything it in turn
/// called) has fully unwound. `depth` is the frame count to run down to.
fn run_to_depth(vm: &mut Vm, depth: usize) -> Result<Value, Diagnostic> {
    while vm.frames.len() > depth {
        step(vm)?;
    }
    Ok(vm.stack.pop().unwrap_or_else(Value::nil))
}

/// Runs the current (topmost) frame, and anything it calls, to
/// completion — i.e. until the frame stack depth present at entry drops
/// by one. Called once per top-level form (`call_top_level`) and once
/// per compile-time macro expansion (`invoke_macro`); a `CALL` to a
/// hololisp `func` from *within* a running frame never calls back into
/// this — it just pushes a frame and lets the same `run_to_depth` loop
/// keep stepping, so nested hololisp calls cost a `vm.frames` entry, not
/// a native Rust stack frame (spec §4F: "a single fetch-decode-execute
/// loop over the current frame's bytecode").
pub(crate) fn run(vm: &mut Vm) -> Result<Value, Diagnostic> {
    let depth = vm.frames.len() - 1;
    run_to_depth(vm, depth)
}

fn step(vm: &mut Vm) -> Result<(), Diagnostic> {
    let frame_idx = vm.frames.len() - 1;
    let chunk = Rc::clone(&vm.frames[frame_idx].chunk);
    let ip = vm.frames[frame_idx].ip;
    let (op, next_ip) = chunk.decode(ip);
    vm.frames[frame_idx].ip = next_ip;
    let source_offset = chunk.source_offset_for(ip);
    let span = Span::point(chunk.translation_unit, source_offset);
    log::trace!("exec {op:?} @ {ip}");

    match op {
        Op::End => {
            let retval = vm.stack.pop().unwrap_or_else(Value::nil);
            let frame = vm.frames.pop().expect("End with no active frame");
            vm.stack.truncate(frame.stack_base);
            vm.stack.push(retval);
            vm.env = vm.frames.last().map(|f| f.env).unwrap_or(vm.global_env);
        }
        Op::Nil => vm.stack.push(Value::nil()),
        Op::True => vm.stack.push(Value::truth()),
        Op::Const(idx) => vm.stack.push(chunk.constants[idx as usize]),
        Op::Append => {
            let x = vm.stack.pop().expect("Append with empty stack");
            let len = vm.stack.len();
            let tail = vm.stack[len - 1];
            let cell = vm.alloc_cons(x, Value::nil());
            if tail.is_nil() {
                vm.stack[len - 2] = cell;
                vm.stack[len - 1] = cell;
            } else {
                tail.set_cdr(cell);
                vm.stack[len - 1] = cell;
            }
        }
        Op::Pop => {
            vm.stack.pop();
        }
        Op::Find => {
            let sym = vm.stack.pop().expect("Find with empty stack");
            let env = vm.env;
            match vm.env_find(env, sym) {
                Some(pair) => vm.stack.push(pair),
                None => {
                    return Err(runtime_error(span, format!("unbound symbol: {}", sym.unwrap_symbol_name())));
                }
            }
        }
        Op::Call => {
            let args = vm.stack.pop().expect("Call with empty stack");
            let callee = vm.stack.pop().expect("Call with only one operand");
            call(vm, callee, args, span)?;
        }
        Op::Jn(offset) => {
            let cond = vm.stack.pop().expect("Jn with empty stack");
            if cond.is_nil() {
                let frame = &mut vm.frames[frame_idx];
                frame.ip = (frame.ip as isize + offset as isize) as usize;
            }
        }
        Op::Let => {
            let val = vm.stack.pop().expect("Let with empty stack");
            let name = vm.stack.pop().expect("Let missing name");
            let env = vm.env;
            vm.env_define(env, name, val);
        }
        Op::PushEnv => {
            let env = vm.env;
            vm.env = vm.alloc_env(env, Value::nil());
            vm.frames[frame_idx].env = vm.env;
        }
        Op::PopEnv => {
            let up = vm.env.unwrap_env_up();
            vm.env = up;
            vm.frames[frame_idx].env = up;
        }
        Op::Car => {
            let top = *vm.stack.last().expect("Car with empty stack");
            if !top.is_list() {
                return Err(runtime_error(span, "car: expected a list"));
            }
            *vm.stack.last_mut().unwrap() = top.car();
        }
        Op::Cdr => {
            let top = *vm.stack.last().expect("Cdr with empty stack");
            if !top.is_list() {
                return Err(runtime_error(span, "cdr: expected a list"));
            }
            *vm.stack.last_mut().unwrap() = top.cdr();
        }
        Op::SetCar => {
            let val = vm.stack.pop().expect("SetCar missing value");
            let cell = *vm.stack.last().expect("SetCar missing cons");
            if !cell.is_cons() {
                return Err(runtime_error(span, "setcar: expected a cons"));
            }
            cell.set_car(val);
        }
        Op::SetCdr => {
            let val = vm.stack.pop().expect("SetCdr missing value");
            let cell = *vm.stack.last().expect("SetCdr missing cons");
            if !cell.is_cons() {
                return Err(runtime_error(span, "setcdr: expected a cons"));
            }
            cell.set_cdr(val);
        }
        Op::MakeFun(idx) => {
            let template = chunk.constants[idx as usize];
            let kind = template.kind();
            let fn_chunk = template.unwrap_closure_chunk();
            let params = template.unwrap_closure_params();
            let env = vm.env;
            let v = vm.alloc_closure(kind, fn_chunk, params, env);
            vm.stack.push(v);
        }
    }
    Ok(())
}

/// Dispatches a `CALL`: invokes a `binding` inline, or pushes a frame for
/// a `func` (spec §4F calling convention). The `func` case does *not*
/// run the callee to completion here — it pushes the frame and returns,
/// leaving the outer `run_to_depth` loop to step into it on the very
/// next iteration. `END` later pops that frame and leaves the return
/// value on the stack where this call left its callee and args, which is
/// indistinguishable to the caller from `call` having produced it
/// directly. This keeps arbitrarily deep non-tail hololisp recursion
/// bounded by `vm.frames`, not the native call stack.
fn call(vm: &mut Vm, callee: Value, args: Value, span: Span) -> Result<(), Diagnostic> {
    match callee.kind() {
        Kind::Binding => {
            let f = callee.unwrap_binding();
            match f(vm, args) {
                Ok(v) => vm.stack.push(v),
                Err(msg) => return Err(runtime_error(span, msg)),
            }
        }
        Kind::Func => {
            let chunk = callee.unwrap_closure_chunk();
            let captured_env = callee.unwrap_closure_env();
            let params = callee.unwrap_closure_params();
            let new_env = vm.alloc_env(captured_env, Value::nil());
            bind_params(vm, params, args, new_env, span)?;
            let stack_base = vm.stack.len();
            vm.frames.push(Frame { func: callee, chunk, ip: 0, env: new_env, stack_base });
            vm.env = new_env;
        }
        Kind::Macro => {
            return Err(runtime_error(span, "cannot call a macro at runtime"));
        }
        _ => return Err(runtime_error(span, "value is not callable")),
    }
    Ok(())
}

/// Invokes a `macro` value immediately, re-entering the dispatch loop
/// exactly like the `func` arm of `call` — used only by the compiler
/// (spec §4E "the compiler invokes the macro's bytecode at compile
/// time"; spec §9 Design Notes "model this as a re-entrant call").
pub(crate) fn invoke_macro(vm: &mut Vm, macro_val: Value, args: Value, span: Span) -> Result<Value, Diagnostic> {
    debug_assert_eq!(macro_val.kind(), Kind::Macro);
    let chunk = macro_val.unwrap_closure_chunk();
    let captured_env = macro_val.unwrap_closure_env();
    let params = macro_val.unwrap_closure_params();
    let new_env = vm.alloc_env(captured_env, Value::nil());
    bind_params(vm, params, args, new_env, span)?;
    let stack_base = vm.stack.len();
    vm.frames.push(Frame { func: macro_val, chunk, ip: 0, env: new_env, stack_base });
    vm.env = new_env;
    run(vm)
}

/// Binds positional parameters, then an optional rest parameter
/// introduced by an improper parameter list (spec §4F step 2).
fn bind_params(vm: &mut Vm, params: Value, args: Value, env: Value, span: Span) -> Result<(), Diagnostic> {
    let mut p = params;
    let mut a = args;
    loop {
        if p.is_cons() {
            let name = p.car();
            if !a.is_cons() {
                return Err(runtime_error(span, "too few arguments"));
            }
            let value = a.car();
            vm.env_define(env, name, value);
            p = p.cdr();
            a = a.cdr();
        } else if p.is_nil() {
            if a.is_cons() {
                return Err(runtime_error(span, "too many arguments"));
            }
            return Ok(());
        } else {
            vm.env_define(env, p, a);
            return Ok(());
        }
    }
}
