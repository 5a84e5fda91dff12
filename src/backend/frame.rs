//! Frame planner (§4.7): sums local-slot bytes, the saved-`ra` slot, and
//! the outgoing-argument area, then rounds up to a 16-byte frame.

use koopa::ir::{FunctionData, Type, TypeKind, ValueKind};

use super::slots::SlotTable;

pub struct FramePlan {
    pub total: i32,
    pub param_area: i32,
    pub ra_slot: Option<i32>,
    pub slots: SlotTable,
}

/// Bytes occupied by the pointee of a pointer type, i.e. what an
/// `alloc` of that type reserves: 4 for a scalar, `4·∏dims` for an
/// array.
fn alloc_size(ty: &Type) -> i32 {
    match ty.kind() {
        TypeKind::Pointer(inner) => size_of(inner),
        _ => 4,
    }
}

fn size_of(ty: &Type) -> i32 {
    match ty.kind() {
        TypeKind::Int32 => 4,
        TypeKind::Array(inner, len) => size_of(inner) * (*len as i32),
        TypeKind::Pointer(_) => 4,
        TypeKind::Unit => 0,
        TypeKind::Function(..) => 4,
    }
}

pub fn plan(func: &FunctionData) -> FramePlan {
    let mut slots = SlotTable::new();
    let mut local_bytes = 0i32;
    let mut has_call = false;
    let mut max_arity = 0usize;

    for (_bb, node) in func.layout().bbs() {
        for &inst in node.insts().keys() {
            let data = func.dfg().value(inst);
            match data.kind() {
                ValueKind::Alloc(_) => {
                    slots.assign(inst, local_bytes);
                    local_bytes += alloc_size(data.ty());
                }
                ValueKind::Call(call) => {
                    has_call = true;
                    max_arity = max_arity.max(call.args().len());
                    if !data.ty().is_unit() {
                        slots.assign(inst, local_bytes);
                        local_bytes += 4;
                    }
                }
                ValueKind::Branch(_) | ValueKind::Jump(_) | ValueKind::Return(_) | ValueKind::Store(_) => {}
                _ => {
                    if !data.ty().is_unit() {
                        slots.assign(inst, local_bytes);
                        local_bytes += 4;
                    }
                }
            }
        }
    }

    let ra_bytes = if has_call { 4 } else { 0 };
    let param_bytes = if max_arity > 8 { 4 * (max_arity as i32 - 8) } else { 0 };
    let raw = param_bytes + local_bytes + ra_bytes;
    let total = ((raw + 15) / 16) * 16;

    // Slots were numbered from 0 assuming the param area came first;
    // shift them up now that its size is known.
    slots.shift(param_bytes);
    let ra_slot = if has_call { Some(total - 4) } else { None };

    FramePlan { total, param_area: param_bytes, ra_slot, slots }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_of_nested_array_multiplies_every_dimension() {
        let inner = Type::get_array(Type::get_i32(), 3);
        let outer = Type::get_array(inner, 4);
        assert_eq!(size_of(&outer), 4 * 3 * 4);
    }

    #[test]
    fn alloc_size_of_pointer_is_pointee_not_pointer_width() {
        let arr = Type::get_array(Type::get_i32(), 5);
        let ptr = Type::get_pointer(arr);
        assert_eq!(alloc_size(&ptr), 4 * 5);
    }

    #[test]
    fn round_up_to_16_matches_frame_rounding() {
        for (raw, expected) in [(0, 0), (1, 16), (16, 16), (17, 32), (31, 32), (32, 32)] {
            assert_eq!(((raw + 15) / 16) * 16, expected);
        }
    }
}
