//! Host-implemented primitives, installed as `binding` values in the
//! root environment (spec §4G). Grounded directly on
//! `examples/original_source/hololisp/hll_builtins.c`'s `add_builtins`:
//! same name list, same fold/chain shapes, same `rem` = libc `fmod`
//! semantics (SPEC_FULL.md §E.3) rather than Rust's `rem_euclid`.
//!
//! Split by category the way `passerine::core` splits `math`/`logic`/
//! `control`/`io` into sibling modules instead of one flat file.

mod arith;
mod cmp;
mod io;
mod list;

use crate::value::Value;
use crate::vm::Vm;

/// Collects the elements of a proper argument list into a `Vec<Value>`.
/// Every builtin in this module receives its arguments this way rather
/// than walking `car`/`cdr` by hand at each call site.
pub(crate) fn args_vec(args: Value) -> Vec<Value> {
    let mut out = Vec::with_capacity(args.list_length());
    let mut cur = args;
    while cur.is_cons() {
        out.push(cur.car());
        cur = cur.cdr();
    }
    out
}

pub(crate) fn expect_num(v: Value, context: &str) -> Result<f64, String> {
    if v.is_num() {
        Ok(v.unwrap_num())
    } else {
        Err(format!("{context}: expected a number, got {:?}", v.kind()))
    }
}

/// Installs every builtin named in spec §4G (plus `list`, per
/// SPEC_FULL.md §E.4) into `vm`'s global environment.
pub fn install(vm: &mut Vm) {
    vm.add_binding("print", io::print);
    vm.add_binding("+", arith::add);
    vm.add_binding("-", arith::sub);
    vm.add_binding("*", arith::mul);
    vm.add_binding("/", arith::div);
    vm.add_binding("rem", arith::rem);
    vm.add_binding("=", cmp::num_eq);
    vm.add_binding("/=", cmp::num_ne);
    vm.add_binding("<", cmp::num_lt);
    vm.add_binding("<=", cmp::num_le);
    vm.add_binding(">", cmp::num_gt);
    vm.add_binding(">=", cmp::num_ge);
    vm.add_binding("and", cmp::and);
    vm.add_binding("cons", list::cons);
    vm.add_binding("car", list::car);
    vm.add_binding("cdr", list::cdr);
    vm.add_binding("setcar", list::setcar);
    vm.add_binding("setcdr", list::setcdr);
    vm.add_binding("list", list::list);
}

#[cfg(test)]
mod test {
    use crate::vm::VmConfig;
    use crate::Vm;

    fn eval_num(src: &str) -> f64 {
        let mut vm = Vm::new(VmConfig::default());
        match vm.interpret(src, "<test>") {
            crate::common::error::Outcome::Ok(v) => v.unwrap_num(),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_builtins() {
        assert_eq!(eval_num("(+ 1 2 3)"), 6.0);
        assert_eq!(eval_num("(- 10 1 2)"), 7.0);
        assert_eq!(eval_num("(* 2 3 4)"), 24.0);
        assert_eq!(eval_num("(/ 100 5 2)"), 10.0);
    }
}
