//! Hands the emitter's own Koopa text to the external `koopa` crate's
//! parser and drives the resulting typed `Program` through the
//! instruction-level emitter in `emit.rs`.
//!
//! Ownership here is ordinary Rust: the parsed `Program` is a normal
//! value, borrowed for the duration of the visit and dropped when this
//! function returns — no manual release call, unlike the C API the
//! original implementation wrapped by hand.

use koopa::front::Driver;

use super::emit::Backend;
use super::error::BackendError;

pub fn emit_riscv(ir_text: String) -> Result<String, BackendError> {
    let driver: Driver<String> = Driver::from(ir_text);
    let program = driver
        .generate_program()
        .map_err(|e| BackendError::Parse(format!("{e:?}")))?;
    Backend::new(&program).emit_program()
}
