//! `+ - * / rem` (spec §4G table). `+`/`*` fold over 0..n numbers with
//! identity 0/1; `-`/`/` require at least one argument and fold the
//! rest against it.

use super::{args_vec, expect_num};
use crate::value::Value;
use crate::vm::Vm;

pub(super) fn add(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let mut acc = 0.0;
    for a in args_vec(args) {
        acc += expect_num(a, "+")?;
    }
    Ok(Value::num(acc))
}

pub(super) fn mul(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let mut acc = 1.0;
    for a in args_vec(args) {
        acc *= expect_num(a, "*")?;
    }
    Ok(Value::num(acc))
}

pub(super) fn sub(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    let Some((first, rest)) = items.split_first() else {
        return Err("-: expected at least 1 argument, got 0".to_string());
    };
    let mut acc = expect_num(*first, "-")?;
    for a in rest {
        acc -= expect_num(*a, "-")?;
    }
    Ok(Value::num(acc))
}

pub(super) fn div(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    let Some((first, rest)) = items.split_first() else {
        return Err("/: expected at least 1 argument, got 0".to_string());
    };
    let mut acc = expect_num(*first, "/")?;
    for a in rest {
        acc /= expect_num(*a, "/")?;
    }
    Ok(Value::num(acc))
}

/// IEEE remainder, the libc `fmod` that `hll_builtins.c`'s `builtin_rem`
/// calls — plain `%` on `f64` has the same sign-of-dividend semantics,
/// unlike `f64::rem_euclid` (SPEC_FULL.md §E.3).
pub(super) fn rem(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    if items.len() != 2 {
        return Err(format!("rem: expected 2 arguments, got {}", items.len()));
    }
    let x = expect_num(items[0], "rem")?;
    let y = expect_num(items[1], "rem")?;
    Ok(Value::num(x % y))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::VmConfig;

    #[test]
    fn rem_matches_fmod_sign() {
        let mut vm = Vm::new(VmConfig::default());
        let tail = vm.alloc_cons(Value::num(3.0), Value::nil());
        let args = vm.alloc_cons(Value::num(-7.0), tail);
        let result = rem(&mut vm, args).unwrap();
        assert_eq!(result.unwrap_num(), -1.0);
    }

    #[test]
    fn sub_with_no_args_errors() {
        let mut vm = Vm::new(VmConfig::default());
        assert!(sub(&mut vm, Value::nil()).is_err());
    }
}
