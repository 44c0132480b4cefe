//! `print` (spec §4G). Writes through `Vm::write`, which forwards to the
//! host's `write_fn` callback (§6) — the core never touches a stream
//! directly (§1 Out of scope: "Diagnostic rendering ... is a host
//! concern", and the same separation applies to ordinary output).

use super::args_vec;
use crate::value::Value;
use crate::vm::Vm;

pub(super) fn print(vm: &mut Vm, args: Value) -> Result<Value, String> {
    let items = args_vec(args);
    if items.len() != 1 {
        return Err(format!("print: expected 1 argument, got {}", items.len()));
    }
    let rendered = format!("{}\n", items[0]);
    vm.write(&rendered);
    Ok(Value::nil())
}
