//! `cons car cdr setcar setcdr list` (spec §4G "Data primitives", §4A).
//! `car`/`cdr` accept `nil` (returning `nil`) the same way the `CAR`/
//! `CDR` opcodes do; `setcar`/`setcdr` require an actual cons and, like
//! the `SETCAR`/`SETCDR` opcodes they're grounded on, return the cons
//! itself rather than the value just stored.

use super::args_vec;
use crate::value::Value;
use crate::vm::Vm;

fn expect_n(items: &[Value], n: usize, name: &str) -> Result<(), String> {
    if items.len() != n {
        Err(format!("{name}: expected {n} argument(s), got {}", items.len()))
    } else {
        Ok(())
    }
}

pub(super) fn cons(vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    expect_n(&items, 2, "cons")?;
    Ok(vm.alloc_cons(items[0], items[1]))
}

pub(super) fn car(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    expect_n(&items, 1, "car")?;
    if !items[0].is_list() {
        return Err("car: expected a list".to_string());
    }
    Ok(items[0].car())
}

pub(super) fn cdr(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    expect_n(&items, 1, "cdr")?;
    if !items[0].is_list() {
        return Err("cdr: expected a list".to_string());
    }
    Ok(items[0].cdr())
}

pub(super) fn setcar(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    expect_n(&items, 2, "setcar")?;
    if !items[0].is_cons() {
        return Err("setcar: expected a cons".to_string());
    }
    items[0].set_car(items[1]);
    Ok(items[0])
}

pub(super) fn setcdr(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    expect_n(&items, 2, "setcdr")?;
    if !items[0].is_cons() {
        return Err("setcdr: expected a cons".to_string());
    }
    items[0].set_cdr(items[1]);
    Ok(items[0])
}

/// Returns a fresh proper list of its arguments (spec §4G).
pub(super) fn list(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    Ok(args)
}
