//! Statement and control-flow emission (§4.6): `if`/`while`/`break`/
//! `continue`/`return`, plus the block/declaration dispatch that ties
//! every other emission module together.
//!
//! The "has this linear section already returned on every path" flag
//! from the distilled design is represented two ways here, deliberately
//! kept in sync: `Emitter::terminated` suppresses emission of dead
//! instructions *within* one label's worth of code (the discard
//! buffer), while `emit_stmt`'s `bool` return threads the equivalent
//! fact *across* statement boundaries, so an `if`/`else` that returns on
//! both arms can skip opening its `end` label at all instead of leaving
//! an unreachable block behind.

use crate::ast::{Block, BlockItem, BType, Stmt};
use crate::scope::ScopeStack;

use super::addr;
use super::decl;
use super::error::CodegenError;
use super::expr::emit_expr;
use super::state::Emitter;

/// Innermost-loop targets for `break`/`continue`. Not an RAII guard
/// itself — see `enter_loop` below — but the type `break`/`continue`
/// read from.
pub struct LoopCtx {
    pub entry_label: String,
    pub end_label: String,
}

/// Pops its loop context on drop, so an early `?`-return while emitting
/// a loop body still restores the enclosing loop's targets.
pub struct LoopGuard<'a> {
    loops: &'a mut Vec<LoopCtx>,
}

impl<'a> LoopGuard<'a> {
    pub fn loops(&mut self) -> &mut Vec<LoopCtx> {
        self.loops
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.loops.pop();
    }
}

fn enter_loop<'a>(loops: &'a mut Vec<LoopCtx>, entry_label: String, end_label: String) -> LoopGuard<'a> {
    loops.push(LoopCtx { entry_label, end_label });
    LoopGuard { loops }
}

/// Emit a block in a fresh nested scope. Returns whether every path
/// through the block ends in a terminator.
pub fn emit_block(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    loops: &mut Vec<LoopCtx>,
    ret_ty: Option<BType>,
    block: &Block,
) -> Result<bool, CodegenError> {
    let mut inner = scopes.enter();
    let mut returns = false;
    for item in &block.items {
        if returns {
            break;
        }
        match item {
            BlockItem::Decl(d) => decl::emit_local_decl(em, &mut inner, d)?,
            BlockItem::Stmt(s) => {
                returns = emit_stmt(em, &mut inner, loops, ret_ty, s)?;
            }
        }
    }
    Ok(returns)
}

pub fn emit_stmt(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    loops: &mut Vec<LoopCtx>,
    ret_ty: Option<BType>,
    stmt: &Stmt,
) -> Result<bool, CodegenError> {
    match stmt {
        Stmt::Assign(lv, expr, _line) => {
            let v = emit_expr(em, scopes, expr)?;
            addr::emit_lval_store(em, scopes, lv, v)?;
            Ok(false)
        }
        Stmt::Expr(expr, _line) => {
            if let Some(e) = expr {
                // A bare expression statement that is directly a call
                // may legitimately be void (`putint(x);`); anything
                // else goes through `emit_expr`, which rejects a
                // nested void call as a value.
                if let crate::ast::Expr::Call(name, args, _) = e {
                    super::expr::emit_call_stmt(em, scopes, name, args)?;
                } else {
                    emit_expr(em, scopes, e)?;
                }
            }
            Ok(false)
        }
        Stmt::Block(b) => emit_block(em, scopes, loops, ret_ty, b),
        Stmt::If(cond, then_branch, else_branch, _line) => {
            emit_if(em, scopes, loops, ret_ty, cond, then_branch, else_branch.as_deref())
        }
        Stmt::While(cond, body, _line) => emit_while(em, scopes, loops, ret_ty, cond, body),
        Stmt::Break(line) => {
            let end = loops
                .last()
                .ok_or_else(|| format!("`break` outside of a loop at line {line}"))?
                .end_label
                .clone();
            em.terminate_with(format!("  jump {end}"));
            Ok(true)
        }
        Stmt::Continue(line) => {
            let entry = loops
                .last()
                .ok_or_else(|| format!("`continue` outside of a loop at line {line}"))?
                .entry_label
                .clone();
            em.terminate_with(format!("  jump {entry}"));
            Ok(true)
        }
        Stmt::Return(expr, line) => {
            match (ret_ty, expr) {
                (Some(_), None) => {
                    return Err(format!("missing return value at line {line}").into())
                }
                (None, Some(_)) => {
                    return Err(format!("void function returns a value at line {line}").into())
                }
                _ => {}
            }
            match expr {
                Some(e) => {
                    let v = emit_expr(em, scopes, e)?;
                    em.terminate_with(format!("  ret {}", v.operand()));
                }
                None => em.terminate_with("  ret"),
            }
            Ok(true)
        }
    }
}

fn emit_if(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    loops: &mut Vec<LoopCtx>,
    ret_ty: Option<BType>,
    cond: &crate::ast::Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
) -> Result<bool, CodegenError> {
    let id = em.fresh_label_id();
    let then_label = format!("%then_{id}");
    let else_label = format!("%else_{id}");
    let end_label = format!("%end_{id}");

    let cond_v = emit_expr(em, scopes, cond)?;
    let target_else = if else_branch.is_some() { else_label.clone() } else { end_label.clone() };
    let cond_id = em.fresh_temp();
    em.line(format!("  %{cond_id} = ne {}, 0", cond_v.operand()));
    em.terminate_with(format!("  br %{cond_id}, {then_label}, {target_else}"));

    em.open_label(then_label.trim_start_matches('%'));
    let then_returns = emit_stmt(em, scopes, loops, ret_ty, then_branch)?;
    if !then_returns {
        em.terminate_with(format!("  jump {end_label}"));
    }

    let else_returns = if let Some(else_stmt) = else_branch {
        em.open_label(else_label.trim_start_matches('%'));
        let r = emit_stmt(em, scopes, loops, ret_ty, else_stmt)?;
        if !r {
            em.terminate_with(format!("  jump {end_label}"));
        }
        r
    } else {
        false
    };

    let both_return = then_returns && else_returns;
    if both_return {
        // The end label would be unreachable; skip it entirely rather
        // than emit a dead block.
        Ok(true)
    } else {
        em.open_label(end_label.trim_start_matches('%'));
        Ok(false)
    }
}

fn emit_while(
    em: &mut Emitter,
    scopes: &mut ScopeStack,
    loops: &mut Vec<LoopCtx>,
    ret_ty: Option<BType>,
    cond: &crate::ast::Expr,
    body: &Stmt,
) -> Result<bool, CodegenError> {
    let id = em.fresh_label_id();
    let entry_label = format!("%entry_{id}");
    let body_label = format!("%body_{id}");
    let end_label = format!("%end_{id}");

    em.terminate_with(format!("  jump {entry_label}"));
    em.open_label(entry_label.trim_start_matches('%'));
    let cond_v = emit_expr(em, scopes, cond)?;
    let cond_id = em.fresh_temp();
    em.line(format!("  %{cond_id} = ne {}, 0", cond_v.operand()));
    em.terminate_with(format!("  br %{cond_id}, {body_label}, {end_label}"));

    em.open_label(body_label.trim_start_matches('%'));
    {
        let mut guard = enter_loop(loops, entry_label.clone(), end_label.clone());
        let body_returns = emit_stmt(em, scopes, guard.loops(), ret_ty, body)?;
        if !body_returns {
            em.terminate_with(format!("  jump {entry_label}"));
        }
    }

    em.open_label(end_label.trim_start_matches('%'));
    // A loop may run zero times, so it never guarantees a return.
    Ok(false)
}
