//! The instruction set the compiler emits and the VM executes (spec
//! §4E). Laid out the way `passerine::common::opcode::Opcode` lays out
//! its own (a `#[repr(u8)]` enum plus a `from_byte` decoder), but keeps
//! operands typed instead of leaving them as raw trailing bytes — the
//! bytecode stream is still a flat `Vec<u8>`, `Op::decode` just reads the
//! operand out alongside the tag.

/// A single decoded instruction. `u16` operands are constant-pool and
/// jump-target indices; `i16` is a signed jump offset (two's complement,
/// per spec §4E's `JN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Return top-of-stack to the caller frame.
    End,
    /// Push `nil`.
    Nil,
    /// Push `true`.
    True,
    /// Push `constant_pool[idx]`.
    Const(u16),
    /// Pop x; splice `(x . nil)` onto the accumulator `(head, tail)` two
    /// slots below top, and update the tail slot in place.
    Append,
    /// Discard the top of the operand stack.
    Pop,
    /// Replace top (a symbol) with the `(name . value)` binding cell
    /// found by walking the env chain.
    Find,
    /// Invoke the callable at slot-2 with the argument list at top.
    Call,
    /// Pop; if the popped value is `nil`, advance `ip` by the signed
    /// offset.
    Jn(i16),
    /// Prepend `(name . val)` to the current env's vars.
    Let,
    /// Chain a fresh empty env whose `up` is the current env.
    PushEnv,
    /// Restore the previous env.
    PopEnv,
    /// Replace top cons with its car (`nil` maps to `nil`).
    Car,
    /// Replace top cons with its cdr (`nil` maps to `nil`).
    Cdr,
    /// Mutate the car of the 2nd-from-top cons; pop the value.
    SetCar,
    /// Mutate the cdr of the 2nd-from-top cons; pop the value.
    SetCdr,
    /// Clone the template func/macro at the constant index, attach the
    /// current env, and push it.
    MakeFun(u16),
}

/// Raw opcode tags. Kept separate from `Op` so the VM can switch on a
/// single byte without first decoding operands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    End = 0,
    Nil = 1,
    True = 2,
    Const = 3,
    Append = 4,
    Pop = 5,
    Find = 6,
    Call = 7,
    Jn = 8,
    Let = 9,
    PushEnv = 10,
    PopEnv = 11,
    Car = 12,
    Cdr = 13,
    SetCar = 14,
    SetCdr = 15,
    MakeFun = 16,
}

impl Tag {
    pub fn from_byte(byte: u8) -> Tag {
        match byte {
            0 => Tag::End,
            1 => Tag::Nil,
            2 => Tag::True,
            3 => Tag::Const,
            4 => Tag::Append,
            5 => Tag::Pop,
            6 => Tag::Find,
            7 => Tag::Call,
            8 => Tag::Jn,
            9 => Tag::Let,
            10 => Tag::PushEnv,
            11 => Tag::PopEnv,
            12 => Tag::Car,
            13 => Tag::Cdr,
            14 => Tag::SetCar,
            15 => Tag::SetCdr,
            16 => Tag::MakeFun,
            other => unreachable!("invalid opcode byte {other}"),
        }
    }
}

impl Op {
    /// Number of trailing operand bytes after the tag byte.
    pub fn body_len(tag: Tag) -> usize {
        match tag {
            Tag::Const | Tag::Jn | Tag::MakeFun => 2,
            _ => 0,
        }
    }
}
