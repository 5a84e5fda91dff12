//! Declaration and initializer emission (§4.4): scalars and arrays, each
//! in both their const and variable, global and local forms.

use crate::ast::{ConstDef, Decl, VarDef};
use crate::const_eval;
use crate::init;
use crate::scope::{ScopeStack, Symbol};

use super::addr;
use super::error::CodegenError;
use super::expr::emit_expr;
use super::state::{Emitter, Value};

pub(super) fn eval_dims(scopes: &ScopeStack, dim_exprs: &[crate::ast::Expr]) -> Result<Vec<usize>, CodegenError> {
    let mut dims = Vec::with_capacity(dim_exprs.len());
    for e in dim_exprs {
        let v = const_eval::eval(e, scopes)?;
        if v <= 0 {
            return Err(format!("array dimension must be a positive constant, found {v}").into());
        }
        dims.push(v as usize);
    }
    Ok(dims)
}

fn array_type(dims: &[usize]) -> String {
    let mut ty = "i32".to_string();
    for d in dims.iter().rev() {
        ty = format!("[{ty}, {d}]");
    }
    ty
}

/// Reconstruct the nested `{…}` aggregate literal from a flat value
/// list, grouping by dimension boundaries from the outermost dimension
/// inward.
fn aggregate_text(dims: &[usize], flat: &[i32]) -> String {
    if dims.len() <= 1 {
        let items: Vec<String> = flat.iter().map(|v| v.to_string()).collect();
        return format!("{{{}}}", items.join(", "));
    }
    let chunk = flat.len() / dims[0];
    let parts: Vec<String> = flat
        .chunks(chunk)
        .map(|c| aggregate_text(&dims[1..], c))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

pub fn emit_global_decl(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    decl: &Decl,
) -> Result<(), CodegenError> {
    match decl {
        Decl::Const(_, defs) => {
            for def in defs {
                emit_global_const_def(em, scopes, def)?;
            }
        }
        Decl::Var(_, defs) => {
            for def in defs {
                emit_global_var_def(em, scopes, def)?;
            }
        }
    }
    Ok(())
}

fn emit_global_const_def(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    def: &ConstDef,
) -> Result<(), CodegenError> {
    let dims = eval_dims(scopes, &def.dims)?;
    let tid = em.fresh_table_id();
    let koopa_id = format!("@{}_{tid}", def.name);
    if dims.is_empty() {
        let v = const_eval::eval(expect_scalar(&def.init)?, scopes)?;
        em.output.push_str(&format!("global {koopa_id} = alloc i32, {v}\n"));
        scopes.declare(def.name.clone(), Symbol::ConstScalar(v))?;
    } else {
        let total: usize = dims.iter().product();
        let slots = init::flatten(&dims, &def.init);
        let flat = fold_slots(scopes, &slots, total)?;
        let text = if flat.iter().all(|v| *v == 0) {
            "zeroinit".to_string()
        } else {
            aggregate_text(&dims, &flat)
        };
        em.output
            .push_str(&format!("global {koopa_id} = alloc {}, {text}\n", array_type(&dims)));
        scopes.declare(
            def.name.clone(),
            Symbol::ConstArray { shape: dims, values: flat, koopa_id },
        )?;
    }
    Ok(())
}

fn emit_global_var_def(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    def: &VarDef,
) -> Result<(), CodegenError> {
    let dims = eval_dims(scopes, &def.dims)?;
    let tid = em.fresh_table_id();
    let koopa_id = format!("@{}_{tid}", def.name);
    if dims.is_empty() {
        let v = match &def.init {
            Some(init_val) => const_eval::eval(expect_scalar(init_val)?, scopes)?,
            None => 0,
        };
        let text = if v == 0 { "zeroinit".to_string() } else { v.to_string() };
        em.output.push_str(&format!("global {koopa_id} = alloc i32, {text}\n"));
        scopes.declare(def.name.clone(), Symbol::VarScalar { koopa_id })?;
    } else {
        let total: usize = dims.iter().product();
        let text = match &def.init {
            Some(init_val) => {
                let slots = init::flatten(&dims, init_val);
                let flat = fold_slots(scopes, &slots, total)?;
                if flat.iter().all(|v| *v == 0) {
                    "zeroinit".to_string()
                } else {
                    aggregate_text(&dims, &flat)
                }
            }
            None => "zeroinit".to_string(),
        };
        em.output
            .push_str(&format!("global {koopa_id} = alloc {}, {text}\n", array_type(&dims)));
        scopes.declare(def.name.clone(), Symbol::VarArray { shape: dims, koopa_id })?;
    }
    Ok(())
}

fn fold_slots(
    scopes: &ScopeStack,
    slots: &[Option<&crate::ast::Expr>],
    total: usize,
) -> Result<Vec<i32>, CodegenError> {
    let mut out = Vec::with_capacity(total);
    for slot in slots {
        out.push(match slot {
            Some(e) => const_eval::eval(e, scopes)?,
            None => 0,
        });
    }
    Ok(out)
}

fn expect_scalar(init: &crate::ast::InitVal) -> Result<&crate::ast::Expr, CodegenError> {
    match init {
        crate::ast::InitVal::Expr(e) => Ok(e),
        crate::ast::InitVal::List(_) => Err("scalar declaration cannot take a brace initializer".to_string().into()),
    }
}

pub fn emit_local_decl(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    decl: &Decl,
) -> Result<(), CodegenError> {
    match decl {
        Decl::Const(_, defs) => {
            for def in defs {
                emit_local_const_def(em, scopes, def)?;
            }
        }
        Decl::Var(_, defs) => {
            for def in defs {
                emit_local_var_def(em, scopes, def)?;
            }
        }
    }
    Ok(())
}

fn emit_local_const_def(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    def: &ConstDef,
) -> Result<(), CodegenError> {
    let dims = eval_dims(scopes, &def.dims)?;
    if dims.is_empty() {
        let v = const_eval::eval(expect_scalar(&def.init)?, scopes)?;
        scopes.declare(def.name.clone(), Symbol::ConstScalar(v))?;
        return Ok(());
    }
    let tid = em.fresh_table_id();
    let koopa_id = format!("@{}_{tid}", def.name);
    em.line(format!("  {koopa_id} = alloc {}", array_type(&dims)));
    let total: usize = dims.iter().product();
    let slots = init::flatten(&dims, &def.init);
    let flat = fold_slots(scopes, &slots, total)?;
    store_flat_array(em, &koopa_id, &dims, &flat);
    scopes.declare(
        def.name.clone(),
        Symbol::ConstArray { shape: dims, values: flat, koopa_id },
    )?;
    Ok(())
}

fn emit_local_var_def(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    def: &VarDef,
) -> Result<(), CodegenError> {
    let dims = eval_dims(scopes, &def.dims)?;
    let tid = em.fresh_table_id();
    let koopa_id = format!("@{}_{tid}", def.name);
    if dims.is_empty() {
        em.line(format!("  {koopa_id} = alloc i32"));
        scopes.declare(def.name.clone(), Symbol::VarScalar { koopa_id: koopa_id.clone() })?;
        if let Some(init_val) = &def.init {
            let e = expect_scalar(init_val)?;
            let v = emit_expr(em, scopes, e)?;
            em.line(format!("  store {}, {koopa_id}", v.operand()));
        }
        return Ok(());
    }
    em.line(format!("  {koopa_id} = alloc {}", array_type(&dims)));
    scopes.declare(def.name.clone(), Symbol::VarArray { shape: dims.clone(), koopa_id: koopa_id.clone() })?;
    if let Some(init_val) = &def.init {
        let total: usize = dims.iter().product();
        let slots = init::flatten(&dims, init_val);
        for (i, slot) in slots.iter().enumerate().take(total) {
            let lv = index_lval(&def.name, &dims, i, def.line);
            match slot {
                Some(e) => {
                    let v = emit_expr(em, scopes, e)?;
                    addr::emit_lval_store(em, scopes, &lv, v)?;
                }
                None => {
                    addr::emit_lval_store(em, scopes, &lv, Value::Imm(0))?;
                }
            }
        }
    }
    Ok(())
}

/// For globals, a nested aggregate literal is emitted directly and no
/// per-element store is needed. For locals, each flat position is
/// lowered to its own `store` through the address chain, so this
/// synthesizes the `LVal` indices for flat position `idx`.
fn index_lval(name: &str, dims: &[usize], idx: usize, line: usize) -> crate::ast::LVal {
    let mut indices = Vec::with_capacity(dims.len());
    let mut rem = idx;
    for i in 0..dims.len() {
        let stride: usize = dims[i + 1..].iter().product();
        let coord = rem / stride;
        rem %= stride;
        indices.push(crate::ast::Expr::Literal(coord as i32));
    }
    crate::ast::LVal { name: name.to_string(), indices, line }
}

fn store_flat_array(em: &mut Emitter, koopa_id: &str, dims: &[usize], flat: &[i32]) {
    // Used only for local const arrays, which const_eval has already
    // fully folded; addressing goes through the same getelemptr chain
    // shape as `emit_local_var_def`, inlined here since no `Expr` nodes
    // exist for already-folded values.
    for (i, v) in flat.iter().enumerate() {
        let mut rem = i;
        let mut ptr = koopa_id.to_string();
        for d in 0..dims.len() {
            let stride: usize = dims[d + 1..].iter().product();
            let coord = rem / stride;
            rem %= stride;
            let id = em.fresh_temp();
            em.line(format!("  %{id} = getelemptr {ptr}, {coord}"));
            ptr = format!("%{id}");
        }
        em.line(format!("  store {v}, {ptr}"));
    }
}
