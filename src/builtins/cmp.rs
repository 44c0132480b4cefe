//! Numeric comparisons and eager `and` (spec §4G, §8 "Comparison
//! coherence"). Grounded on `hll_builtins.c`'s `builtin_num_*`: `=` and
//! `/=` check every pair, not just consecutive ones, while the ordering
//! predicates walk a single `prev`/`next` chain.

use super::{args_vec, expect_num};
use crate::value::Value;
use crate::vm::Vm;

fn truth(b: bool) -> Value {
    if b {
        Value::truth()
    } else {
        Value::nil()
    }
}

pub(super) fn num_eq(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let nums = args_vec(args).into_iter().map(|v| expect_num(v, "=")).collect::<Result<Vec<_>, _>>()?;
    for i in 0..nums.len() {
        for j in (i + 1)..nums.len() {
            if nums[i] != nums[j] {
                return Ok(Value::nil());
            }
        }
    }
    Ok(Value::truth())
}

pub(super) fn num_ne(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    let nums = args_vec(args).into_iter().map(|v| expect_num(v, "/=")).collect::<Result<Vec<_>, _>>()?;
    for i in 0..nums.len() {
        for j in (i + 1)..nums.len() {
            if nums[i] == nums[j] {
                return Ok(Value::nil());
            }
        }
    }
    Ok(Value::truth())
}

/// Shared shape for the four ordering predicates: a chain of
/// consecutive comparisons against `prev`.
fn chained(args: Value, name: &str, holds: impl Fn(f64, f64) -> bool) -> Result<Value, String> {
    let nums = args_vec(args).into_iter().map(|v| expect_num(v, name)).collect::<Result<Vec<_>, _>>()?;
    Ok(truth(nums.windows(2).all(|pair| holds(pair[0], pair[1]))))
}

pub(super) fn num_lt(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    chained(args, "<", |a, b| a < b)
}

pub(super) fn num_le(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    chained(args, "<=", |a, b| a <= b)
}

pub(super) fn num_gt(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    chained(args, ">", |a, b| a > b)
}

pub(super) fn num_ge(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    chained(args, ">=", |a, b| a >= b)
}

/// Eager `and` (spec §4G: "`nil` iff any argument is `nil`"), distinct
/// from the compiler's short-circuiting `and` special form — both exist,
/// per SPEC_FULL.md §E.5.
pub(super) fn and(_vm: &mut Vm, args: Value) -> Result<Value, String> {
    Ok(truth(args_vec(args).iter().all(Value::is_truthy)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::VmConfig;

    #[test]
    fn distinctness_checks_every_pair_not_just_neighbors() {
        let mut vm = Vm::new(VmConfig::default());
        let c = vm.alloc_cons(Value::num(3.0), Value::nil());
        let b = vm.alloc_cons(Value::num(2.0), c);
        let a = vm.alloc_cons(Value::num(1.0), b);
        let args = vm.alloc_cons(Value::num(1.0), a);
        assert!(num_ne(&mut vm, args).unwrap().is_nil());
    }
}
