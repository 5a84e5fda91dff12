//! Emitter-owned counters and the growing Koopa text buffer.
//!
//! Mirrors the teacher's `codegen/state.rs` shape: one struct holding an
//! output buffer plus the monotonic counters emission needs, passed by
//! `&mut` reference rather than read through ambient/global state.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// An immediate constant; materializing it never costs an
    /// instruction until something actually needs it as a Koopa operand.
    Imm(i32),
    /// A materialized SSA temp, e.g. `%7`.
    Temp(u32),
}

impl Value {
    /// Render as a Koopa operand: `%7` or the literal `5`.
    pub fn operand(&self) -> String {
        match self {
            Value::Imm(n) => n.to_string(),
            Value::Temp(id) => format!("%{id}"),
        }
    }
}

pub struct Emitter {
    pub output: String,
    next_temp: u32,
    next_label: u32,
    next_table: u32,
    /// Set once the current linear section has emitted a terminator
    /// (`ret`/`jump`/`br`); suppresses further emission until a new
    /// label reopens the block, per the discard-buffer design.
    terminated: bool,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            output: String::new(),
            next_temp: 0,
            next_label: 0,
            next_table: 0,
            terminated: false,
        }
    }

    /// Reset the per-function temp counter; label and table counters
    /// are global across the whole compilation (I3/naming convention).
    pub fn reset_function(&mut self) {
        self.next_temp = 0;
        self.terminated = false;
    }

    pub fn fresh_temp(&mut self) -> u32 {
        let id = self.next_temp;
        self.next_temp += 1;
        id
    }

    /// A fresh label suffix, shared by every label kind
    /// (`then_N`/`else_N`/`end_N`/`entry_N`/`body_N`).
    pub fn fresh_label_id(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    pub fn fresh_table_id(&mut self) -> u32 {
        let id = self.next_table;
        self.next_table += 1;
        id
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Write a line, unless the current block already ended with a
    /// terminator — in which case it is unreachable code and is
    /// silently dropped (the discard buffer).
    pub fn line(&mut self, text: impl AsRef<str>) {
        if self.terminated {
            return;
        }
        self.output.push_str(text.as_ref());
        self.output.push('\n');
    }

    /// Like `line`, but marks the block terminated afterward (for
    /// `ret`/`jump`/`br`).
    pub fn terminate_with(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.terminated = true;
    }

    /// Open a new label, which reopens emission regardless of the prior
    /// terminated state.
    pub fn open_label(&mut self, label: &str) {
        let _ = write!(self.output, "{label}:\n");
        self.terminated = false;
    }

    pub fn emit_binary(&mut self, op: &str, lhs: &Value, rhs: &Value) -> Value {
        let id = self.fresh_temp();
        self.line(format!("  %{id} = {op} {}, {}", lhs.operand(), rhs.operand()));
        Value::Temp(id)
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
