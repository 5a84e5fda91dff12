//! Koopa IR → RV32IM assembly (§4.7, §4.8). Takes the Koopa text the
//! `koopa_gen` module produced, parses it back through the external
//! `koopa` crate (the course-provided IR library, not reimplemented
//! here), and emits assembly from the resulting typed raw program.

mod emit;
mod error;
mod frame;
mod imm;
mod program;
mod slots;

pub use error::BackendError;

pub fn emit(ir_text: String) -> Result<String, BackendError> {
    program::emit_riscv(ir_text)
}
