//! Expression and lvalue-read emission.
//!
//! Every function here returns the `Value` handle of its result instead
//! of leaning on a shared "last temp" counter (see module-level note in
//! `state.rs`): the caller always has the handle it needs in hand.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::scope::{ScopeStack, Symbol};

use super::addr;
use super::error::CodegenError;
use super::state::{Emitter, Value};

pub fn emit_expr(
    em: &mut Emitter,
    scopes: &ScopeStack,
    expr: &Expr,
) -> Result<Value, CodegenError> {
    match expr {
        Expr::Literal(n) => Ok(Value::Imm(*n)),

        Expr::LVal(lv) => {
            let sym = scopes
                .lookup(&lv.name)
                .ok_or_else(|| format!("use of undeclared identifier `{}`", lv.name))?
                .clone();
            match sym {
                Symbol::ConstScalar(v) if lv.indices.is_empty() => Ok(Value::Imm(v)),
                Symbol::VarScalar { koopa_id } if lv.indices.is_empty() => {
                    let id = em.fresh_temp();
                    em.line(format!("  %{id} = load {koopa_id}"));
                    Ok(Value::Temp(id))
                }
                Symbol::Pointer { koopa_id, .. } if lv.indices.is_empty() => {
                    // Bare use of a pointer/array parameter as a value
                    // decays to the pointer itself.
                    let id = em.fresh_temp();
                    em.line(format!("  %{id} = load {koopa_id}"));
                    Ok(Value::Temp(id))
                }
                Symbol::ConstArray { .. } | Symbol::VarArray { .. } | Symbol::Pointer { .. } => {
                    addr::emit_lval_value(em, scopes, lv)
                }
                _ => Err(format!("`{}` is not usable as a value here", lv.name).into()),
            }
        }

        Expr::Unary(op, inner) => {
            let v = emit_expr(em, scopes, inner)?;
            Ok(match op {
                UnaryOp::Pos => v,
                UnaryOp::Neg => match v {
                    Value::Imm(n) => Value::Imm(n.wrapping_neg()),
                    v => em.emit_binary("sub", &Value::Imm(0), &v),
                },
                UnaryOp::Not => match v {
                    Value::Imm(n) => Value::Imm(i32::from(n == 0)),
                    v => em.emit_binary("eq", &v, &Value::Imm(0)),
                },
            })
        }

        Expr::Binary(BinaryOp::And, lhs, rhs) => emit_short_circuit(em, scopes, true, lhs, rhs),
        Expr::Binary(BinaryOp::Or, lhs, rhs) => emit_short_circuit(em, scopes, false, lhs, rhs),

        Expr::Binary(op, lhs, rhs) => {
            let a = emit_expr(em, scopes, lhs)?;
            let b = emit_expr(em, scopes, rhs)?;
            Ok(emit_binary_op(em, *op, a, b))
        }

        Expr::Call(name, args, line) => {
            emit_call(em, scopes, name, args)?.ok_or_else(|| {
                format!("void function `{name}` used as a value at line {line}").into()
            })
        }
    }
}

/// Emit a call that appears as a whole expression statement: unlike
/// `emit_expr`'s handling of a nested `Expr::Call`, a void return here
/// is not an error — `putint(x);` is exactly how SysY calls a
/// void-returning library function.
pub fn emit_call_stmt(
    em: &mut Emitter,
    scopes: &ScopeStack,
    name: &str,
    args: &[Expr],
) -> Result<(), CodegenError> {
    emit_call(em, scopes, name, args)?;
    Ok(())
}

fn binop_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Mod => "mod",
        BinaryOp::Lt => "lt",
        BinaryOp::Gt => "gt",
        BinaryOp::Le => "le",
        BinaryOp::Ge => "ge",
        BinaryOp::Eq => "eq",
        BinaryOp::Ne => "ne",
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops handled separately"),
    }
}

fn emit_binary_op(em: &mut Emitter, op: BinaryOp, a: Value, b: Value) -> Value {
    em.emit_binary(binop_mnemonic(op), &a, &b)
}

/// `is_and == true` lowers `&&`; `false` lowers `||`. Both share the same
/// alloc/store/branch/load skeleton, differing only in the seed value
/// and the test applied to the lhs.
fn emit_short_circuit(
    em: &mut Emitter,
    scopes: &ScopeStack,
    is_and: bool,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<Value, CodegenError> {
    let id = em.fresh_label_id();
    let cell = format!("%sc_{id}");
    let rhs_label = if is_and { format!("%then_{id}") } else { format!("%else_{id}") };
    let end_label = format!("%end_{id}");

    em.line(format!("  {cell} = alloc i32"));
    em.line(format!("  store {}, {cell}", if is_and { 0 } else { 1 }));

    let a = emit_expr(em, scopes, lhs)?;
    let test_op = if is_and { "ne" } else { "eq" };
    let cond_id = em.fresh_temp();
    em.line(format!("  %{cond_id} = {test_op} {}, 0", a.operand()));

    // `&&`'s cond is `lhs != 0` and `||`'s is `lhs == 0`; either way, a
    // true cond is exactly the case that needs the rhs evaluated, so
    // both operators branch the same way: cond true -> rhs, false -> end.
    em.terminate_with(format!("  br %{cond_id}, {rhs_label}, {end_label}"));

    em.open_label(&rhs_label.trim_start_matches('%').to_string());
    let b = emit_expr(em, scopes, rhs)?;
    let bool_id = em.fresh_temp();
    em.line(format!("  %{bool_id} = ne 0, {}", b.operand()));
    em.line(format!("  store %{bool_id}, {cell}"));
    em.terminate_with(format!("  jump {end_label}"));

    em.open_label(&end_label.trim_start_matches('%').to_string());
    let result_id = em.fresh_temp();
    em.line(format!("  %{result_id} = load {cell}"));
    Ok(Value::Temp(result_id))
}

/// `Ok(None)` means the callee is void — the caller decides whether
/// that's acceptable (a bare statement) or a type error (used as a
/// value).
fn emit_call(
    em: &mut Emitter,
    scopes: &ScopeStack,
    name: &str,
    args: &[Expr],
) -> Result<Option<Value>, CodegenError> {
    let sym = scopes
        .lookup_root(name)
        .ok_or_else(|| format!("call to undeclared function `{name}`"))?
        .clone();
    let (ret_ty, param_count) = match sym {
        Symbol::Func { ret_ty, param_count } => (ret_ty, param_count),
        _ => return Err(format!("`{name}` is not a function").into()),
    };
    if args.len() != param_count {
        return Err(format!(
            "`{name}` expects {param_count} argument(s), found {}",
            args.len()
        )
        .into());
    }
    let mut arg_values = Vec::with_capacity(args.len());
    for a in args {
        arg_values.push(emit_expr(em, scopes, a)?);
    }
    let operands = arg_values
        .iter()
        .map(Value::operand)
        .collect::<Vec<_>>()
        .join(", ");
    if ret_ty.is_some() {
        let id = em.fresh_temp();
        em.line(format!("  %{id} = call @{name}({operands})"));
        Ok(Some(Value::Temp(id)))
    } else {
        em.line(format!("  call @{name}({operands})"));
        Ok(None)
    }
}
