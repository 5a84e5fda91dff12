//! Array and pointer-parameter addressing (§4.5): turns `a[e1][e2]…`
//! into a chain of `getelemptr`/`getptr` instructions, then either loads
//! the scalar at the end or decays to a sub-array pointer.

use crate::ast::LVal;
use crate::scope::{ScopeStack, Symbol};

use super::error::CodegenError;
use super::expr::emit_expr;
use super::state::{Emitter, Value};

/// Rank of the storage an lvalue's root name denotes: for an array, the
/// number of declared dimensions; for a pointer parameter, one (the
/// unsized leading dimension) plus the inner dimensions.
fn root_rank(sym: &Symbol) -> Option<usize> {
    match sym {
        Symbol::ConstArray { shape, .. } | Symbol::VarArray { shape, .. } => Some(shape.len()),
        Symbol::Pointer { shape, .. } => Some(1 + shape.len()),
        _ => None,
    }
}

/// Build the `getelemptr`/`getptr` chain for `lv`. Returns the pointer
/// operand after the last index step, and whether that many indices
/// cover the full rank (so the caller should `load` a scalar rather
/// than decay to a sub-array pointer).
fn build_chain(
    em: &mut Emitter,
    scopes: &ScopeStack,
    lv: &LVal,
) -> Result<(Value, bool), CodegenError> {
    let sym = scopes
        .lookup(&lv.name)
        .ok_or_else(|| format!("use of undeclared identifier `{}`", lv.name))?
        .clone();
    let rank = root_rank(&sym).ok_or_else(|| format!("`{}` is not an array", lv.name))?;
    if lv.indices.len() > rank {
        return Err(format!("too many indices into `{}`", lv.name).into());
    }

    let mut indices = Vec::with_capacity(lv.indices.len());
    for idx_expr in &lv.indices {
        indices.push(emit_expr(em, scopes, idx_expr)?);
    }

    let mut ptr = match &sym {
        Symbol::Pointer { koopa_id, .. } => {
            let id = em.fresh_temp();
            em.line(format!("  %{id} = load {koopa_id}"));
            let base = Value::Temp(id);
            if let Some(first) = indices.first() {
                let gid = em.fresh_temp();
                em.line(format!("  %{gid} = getptr {}, {}", base.operand(), first.operand()));
                Value::Temp(gid)
            } else {
                base
            }
        }
        Symbol::VarArray { koopa_id, .. } | Symbol::ConstArray { koopa_id, .. } => {
            if let Some(first) = indices.first() {
                let gid = em.fresh_temp();
                em.line(format!("  %{gid} = getelemptr {koopa_id}, {}", first.operand()));
                Value::Temp(gid)
            } else {
                // No index at all: the array decays to a pointer to its
                // first element for e.g. passing it as an argument.
                let gid = em.fresh_temp();
                em.line(format!("  %{gid} = getelemptr {koopa_id}, 0"));
                return Ok((Value::Temp(gid), false));
            }
        }
        _ => unreachable!("root_rank already filtered to array/pointer symbols"),
    };

    // The first index was already consumed above (via `getptr` for a
    // pointer root, `getelemptr` for an array root); every remaining
    // index strides one further dimension.
    for idx in indices.iter().skip(1) {
        let gid = em.fresh_temp();
        em.line(format!("  %{gid} = getelemptr {}, {}", ptr.operand(), idx.operand()));
        ptr = Value::Temp(gid);
    }

    let full = lv.indices.len() == rank;
    if !full && !lv.indices.is_empty() {
        // Partial indexing: decay the remaining sub-array to a pointer
        // suitable for e.g. passing to a function.
        let gid = em.fresh_temp();
        em.line(format!("  %{gid} = getelemptr {}, 0", ptr.operand()));
        ptr = Value::Temp(gid);
    }
    Ok((ptr, full))
}

/// Read `a[e1]…[ek]`: a full index loads the scalar; a partial index
/// yields the decayed sub-array pointer as the value itself.
pub fn emit_lval_value(
    em: &mut Emitter,
    scopes: &ScopeStack,
    lv: &LVal,
) -> Result<Value, CodegenError> {
    let (ptr, full) = build_chain(em, scopes, lv)?;
    if full {
        let id = em.fresh_temp();
        em.line(format!("  %{id} = load {}", ptr.operand()));
        Ok(Value::Temp(id))
    } else {
        Ok(ptr)
    }
}

/// Store `value` into `lv`. A bare (unindexed) name is a plain scalar
/// store to its `alloc`; an indexed name goes through the
/// `getelemptr`/`getptr` chain and requires a full index (assigning to
/// a whole sub-array is not part of SysY's grammar). Assigning through
/// a const name, scalar or array, is a name error (I4) regardless of
/// indexing.
pub fn emit_lval_store(
    em: &mut Emitter,
    scopes: &ScopeStack,
    lv: &LVal,
    value: Value,
) -> Result<(), CodegenError> {
    let sym = scopes
        .lookup(&lv.name)
        .ok_or_else(|| format!("use of undeclared identifier `{}`", lv.name))?;
    if matches!(sym, Symbol::ConstScalar(_) | Symbol::ConstArray { .. }) {
        return Err(format!("cannot assign to const `{}`", lv.name).into());
    }
    if let Symbol::VarScalar { koopa_id } = sym {
        if !lv.indices.is_empty() {
            return Err(format!("`{}` is not an array", lv.name).into());
        }
        let koopa_id = koopa_id.clone();
        em.line(format!("  store {}, {koopa_id}", value.operand()));
        return Ok(());
    }

    let (ptr, full) = build_chain(em, scopes, lv)?;
    if !full {
        return Err(format!("cannot assign to sub-array `{}`", lv.name).into());
    }
    em.line(format!("  store {}, {}", value.operand(), ptr.operand()));
    Ok(())
}
