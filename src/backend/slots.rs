//! Slot table: the `sp`-relative offset assigned to each IR value that
//! needs stack storage, assigned once on first reference (§4.7).

use std::collections::HashMap;

use koopa::ir::Value;

#[derive(Default)]
pub struct SlotTable {
    offsets: HashMap<Value, i32>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, value: Value, offset: i32) {
        self.offsets.insert(value, offset);
    }

    pub fn get(&self, value: Value) -> Option<i32> {
        self.offsets.get(&value).copied()
    }

    /// Re-base every recorded offset by `delta`, used once the outgoing
    /// call-argument area's size (computed after the local slots
    /// themselves) is known.
    pub fn shift(&mut self, delta: i32) {
        for off in self.offsets.values_mut() {
            *off += delta;
        }
    }
}
