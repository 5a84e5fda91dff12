//! Centralizes the signed-12-bit-immediate check that every `sp`-relative
//! load/store must make (§4.8, §9 "centralize the immediate-overflow
//! branch"). No other call site re-implements the `>= 2048` test.

const IMM12_MAX: i32 = 2047;

fn fits_imm12(offset: i32) -> bool {
    (-2048..=IMM12_MAX).contains(&offset)
}

/// Emit a load of `sp + offset` into `reg`, using the direct `lw` form
/// when the offset fits a 12-bit immediate and a `li`/`add`/`lw` sequence
/// through `t3` otherwise.
pub fn emit_load(out: &mut String, reg: &str, offset: i32) {
    if fits_imm12(offset) {
        out.push_str(&format!("  lw {reg}, {offset}(sp)\n"));
    } else {
        out.push_str(&format!("  li t3, {offset}\n"));
        out.push_str("  add t3, sp, t3\n");
        out.push_str(&format!("  lw {reg}, 0(t3)\n"));
    }
}

/// Store `reg` at `sp + offset`, same overflow handling as `emit_load`.
pub fn emit_store(out: &mut String, reg: &str, offset: i32) {
    if fits_imm12(offset) {
        out.push_str(&format!("  sw {reg}, {offset}(sp)\n"));
    } else {
        out.push_str(&format!("  li t3, {offset}\n"));
        out.push_str("  add t3, sp, t3\n");
        out.push_str(&format!("  sw {reg}, 0(t3)\n"));
    }
}

/// `addi`-or-`li`/`add` form for computing `sp + offset` into `reg`
/// itself (used when taking the address of a local, e.g. as the base of
/// a `getelemptr` chain).
pub fn emit_addr_of(out: &mut String, reg: &str, offset: i32) {
    if fits_imm12(offset) {
        out.push_str(&format!("  addi {reg}, sp, {offset}\n"));
    } else {
        out.push_str(&format!("  li {reg}, {offset}\n"));
        out.push_str(&format!("  add {reg}, sp, {reg}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_offset_uses_direct_form() {
        let mut out = String::new();
        emit_load(&mut out, "t0", 16);
        assert_eq!(out, "  lw t0, 16(sp)\n");
    }

    #[test]
    fn large_offset_uses_three_instruction_form() {
        let mut out = String::new();
        emit_store(&mut out, "t0", 4096);
        assert_eq!(out, "  li t3, 4096\n  add t3, sp, t3\n  sw t0, 0(t3)\n");
    }

    #[test]
    fn boundary_offset_is_inclusive() {
        let mut out = String::new();
        emit_load(&mut out, "t0", 2047);
        assert!(out.starts_with("  lw"));
        out.clear();
        emit_load(&mut out, "t0", 2048);
        assert!(out.starts_with("  li"));
    }
}
