//! Constant folding for `const` declarations and array dimension
//! expressions, both of which SysY requires to be evaluable at compile
//! time.
//!
//! Folding uses `i32` wrapping arithmetic throughout (SysY `int` is
//! 32-bit two's complement) and never panics: division/modulo by a
//! folded zero is a program that the grammar admits but that real SysY
//! test suites don't exercise at the constant level, so we return an
//! error rather than abort the compiler.

use std::fmt;

use crate::ast::{BinaryOp, Expr, LVal, UnaryOp};
use crate::scope::{ScopeStack, Symbol};

#[derive(Debug)]
pub enum ConstEvalError {
    NotConstant(String),
    DivByZero,
    IndexNotArray(String),
}

impl fmt::Display for ConstEvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstEvalError::NotConstant(what) => write!(f, "not a constant expression: {what}"),
            ConstEvalError::DivByZero => write!(f, "division by zero in constant expression"),
            ConstEvalError::IndexNotArray(name) => {
                write!(f, "`{name}` is indexed but is not an array")
            }
        }
    }
}

impl std::error::Error for ConstEvalError {}

/// Fold `expr` to a scalar `i32`, resolving names through `scopes`.
pub fn eval(expr: &Expr, scopes: &ScopeStack) -> Result<i32, ConstEvalError> {
    match expr {
        Expr::Literal(n) => Ok(*n),
        Expr::LVal(lv) => eval_lval(lv, scopes),
        Expr::Unary(op, inner) => {
            let v = eval(inner, scopes)?;
            Ok(match op {
                UnaryOp::Pos => v,
                UnaryOp::Neg => v.wrapping_neg(),
                UnaryOp::Not => i32::from(v == 0),
            })
        }
        Expr::Binary(op, lhs, rhs) => {
            let a = eval(lhs, scopes)?;
            match op {
                // Short-circuit in constant folding too: SysY constant
                // expressions never call functions, so evaluating the
                // right side unconditionally would be harmless, but
                // matching runtime short-circuit semantics keeps this
                // one rule instead of two.
                BinaryOp::And => {
                    if a == 0 {
                        return Ok(0);
                    }
                    Ok(i32::from(eval(rhs, scopes)? != 0))
                }
                BinaryOp::Or => {
                    if a != 0 {
                        return Ok(1);
                    }
                    Ok(i32::from(eval(rhs, scopes)? != 0))
                }
                _ => {
                    let b = eval(rhs, scopes)?;
                    eval_binary(*op, a, b)
                }
            }
        }
        Expr::Call(name, _, _) => Err(ConstEvalError::NotConstant(format!("call to `{name}`"))),
    }
}

fn eval_binary(op: BinaryOp, a: i32, b: i32) -> Result<i32, ConstEvalError> {
    Ok(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(ConstEvalError::DivByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(ConstEvalError::DivByZero);
            }
            a.wrapping_rem(b)
        }
        BinaryOp::Lt => i32::from(a < b),
        BinaryOp::Gt => i32::from(a > b),
        BinaryOp::Le => i32::from(a <= b),
        BinaryOp::Ge => i32::from(a >= b),
        BinaryOp::Eq => i32::from(a == b),
        BinaryOp::Ne => i32::from(a != b),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled by caller for short-circuit"),
    })
}

fn eval_lval(lv: &LVal, scopes: &ScopeStack) -> Result<i32, ConstEvalError> {
    let sym = scopes
        .lookup(&lv.name)
        .ok_or_else(|| ConstEvalError::NotConstant(lv.name.clone()))?;
    match sym {
        Symbol::ConstScalar(v) if lv.indices.is_empty() => Ok(*v),
        Symbol::ConstArray { shape, values, .. } => {
            let idx = flat_index(shape, &lv.indices, scopes)?;
            values
                .get(idx)
                .copied()
                .ok_or_else(|| ConstEvalError::NotConstant(format!("{} out of bounds", lv.name)))
        }
        _ => Err(ConstEvalError::NotConstant(lv.name.clone())),
    }
}

/// Row-major flat offset for a (possibly partial) index list into an
/// array of the given shape. Used only against fully-constant indices;
/// runtime indexing goes through `koopa_gen::addr` instead.
fn flat_index(
    shape: &[usize],
    indices: &[Expr],
    scopes: &ScopeStack,
) -> Result<usize, ConstEvalError> {
    if indices.len() > shape.len() {
        return Err(ConstEvalError::IndexNotArray("<array>".into()));
    }
    let mut offset = 0usize;
    for (i, idx_expr) in indices.iter().enumerate() {
        let idx = eval(idx_expr, scopes)? as usize;
        let stride: usize = shape[i + 1..].iter().product();
        offset += idx * stride;
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(n: i32) -> Expr {
        Expr::Literal(n)
    }

    #[test]
    fn folds_arithmetic_with_wrapping() {
        let scopes = ScopeStack::new();
        let expr = Expr::Binary(BinaryOp::Add, Box::new(e(i32::MAX)), Box::new(e(1)));
        assert_eq!(eval(&expr, &scopes).unwrap(), i32::MIN);
    }

    #[test]
    fn div_by_zero_is_an_error_not_a_panic() {
        let scopes = ScopeStack::new();
        let expr = Expr::Binary(BinaryOp::Div, Box::new(e(1)), Box::new(e(0)));
        assert!(matches!(eval(&expr, &scopes), Err(ConstEvalError::DivByZero)));
    }

    #[test]
    fn short_circuit_or_skips_rhs_eval() {
        let scopes = ScopeStack::new();
        // `1 || (1 / 0)`: if the rhs were evaluated unconditionally this
        // would error.
        let expr = Expr::Binary(
            BinaryOp::Or,
            Box::new(e(1)),
            Box::new(Expr::Binary(BinaryOp::Div, Box::new(e(1)), Box::new(e(0)))),
        );
        assert_eq!(eval(&expr, &scopes).unwrap(), 1);
    }

    #[test]
    fn call_is_not_constant() {
        let scopes = ScopeStack::new();
        let expr = Expr::Call("f".into(), vec![], 1);
        assert!(matches!(eval(&expr, &scopes), Err(ConstEvalError::NotConstant(_))));
    }
}
