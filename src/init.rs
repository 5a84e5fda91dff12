//! Brace-alignment flattening for array initializers.
//!
//! SysY lets a nested initializer list align to any dimension boundary,
//! not just the innermost one: `int a[2][3] = {1, 2, 3, 4, 5, 6}` and
//! `int a[2][3] = {{1, 2, 3}, {4, 5, 6}}` are both legal and produce the
//! same array, and so is `int a[2][3] = {{1}, 2, 3, 4}`. The rule: a
//! nested `{...}` at flat position `idx` aligns to the *largest* valid
//! dimension suffix, i.e. the smallest `k` such that `idx` is a multiple
//! of `product(dims[k..])`.
//!
//! The result is a flat `Vec` the length of the full array, one slot per
//! scalar element, `None` standing for an implicit zero-fill. Callers
//! decide how to turn a slot into a value: `const_eval` folds it to
//! `i32`, `koopa_gen::decl` emits a store (or skips zero-filled slots
//! when the whole tail is zero, per the Koopa emitter's own rules).

use crate::ast::{Expr, InitVal};

/// `widths[i]` is the number of scalar elements spanned by one index at
/// dimension `i`, i.e. `product(dims[i..])`. `widths[dims.len()]` is 1.
fn widths(dims: &[usize]) -> Vec<usize> {
    let mut w = vec![1usize; dims.len() + 1];
    for i in (0..dims.len()).rev() {
        w[i] = w[i + 1] * dims[i];
    }
    w
}

/// Flatten `init` against `dims`. `dims` empty means a scalar
/// initializer (`init` must then be `InitVal::Expr`).
pub fn flatten<'a>(dims: &[usize], init: &'a InitVal) -> Vec<Option<&'a Expr>> {
    if dims.is_empty() {
        return match init {
            InitVal::Expr(e) => vec![Some(e)],
            InitVal::List(_) => vec![None],
        };
    }
    let w = widths(dims);
    let total = w[0];
    let items = match init {
        InitVal::Expr(e) => return {
            let mut v = vec![Some(e)];
            v.resize(total, None);
            v
        },
        InitVal::List(items) => items,
    };

    let mut out = Vec::with_capacity(total);
    let mut idx = 0usize;
    for item in items {
        if idx >= total {
            break;
        }
        match item {
            InitVal::Expr(e) => {
                out.push(Some(e));
                idx += 1;
            }
            InitVal::List(_) => {
                // Smallest k >= 1 with idx a multiple of widths[k], i.e.
                // the largest dims suffix this brace can legally close
                // over starting at the current position.
                let k = (1..=dims.len())
                    .find(|&k| idx % w[k] == 0)
                    .expect("widths[dims.len()] == 1 divides everything");
                let sub = flatten(&dims[k..], item);
                idx += w[k];
                out.extend(sub);
            }
        }
    }
    out.resize(total, None);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn lit(n: i32) -> InitVal {
        InitVal::Expr(Expr::Literal(n))
    }

    fn as_i32(slots: &[Option<&Expr>]) -> Vec<i32> {
        slots
            .iter()
            .map(|s| match s {
                Some(Expr::Literal(n)) => *n,
                Some(_) => panic!("non-literal in test fixture"),
                None => 0,
            })
            .collect()
    }

    #[test]
    fn fully_flat_initializer() {
        let init = InitVal::List(vec![lit(1), lit(2), lit(3), lit(4), lit(5), lit(6)]);
        let flat = flatten(&[2, 3], &init);
        assert_eq!(as_i32(&flat), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn fully_nested_initializer() {
        let init = InitVal::List(vec![
            InitVal::List(vec![lit(1), lit(2), lit(3)]),
            InitVal::List(vec![lit(4), lit(5), lit(6)]),
        ]);
        let flat = flatten(&[2, 3], &init);
        assert_eq!(as_i32(&flat), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn mixed_brace_alignment_pads_with_zero() {
        // {{1}, 2, 3, 4} over int[2][3]: the inner {1} closes over just
        // the innermost dimension (padded to [1, 0, 0]), then 2, 3, 4
        // fill flat slots 3, 4, 5.
        let init = InitVal::List(vec![InitVal::List(vec![lit(1)]), lit(2), lit(3), lit(4)]);
        let flat = flatten(&[2, 3], &init);
        assert_eq!(as_i32(&flat), vec![1, 0, 0, 2, 3, 4]);
    }

    #[test]
    fn partial_initializer_zero_fills_tail() {
        let init = InitVal::List(vec![lit(1), lit(2)]);
        let flat = flatten(&[2, 3], &init);
        assert_eq!(as_i32(&flat), vec![1, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn three_dimensional_brace_alignment() {
        // int a[2][2][2], {{1,2},{3,4},5,6,7,8} - first two braces align
        // to the innermost dim, then 5..8 continue flat from slot 4.
        let init = InitVal::List(vec![
            InitVal::List(vec![lit(1), lit(2)]),
            InitVal::List(vec![lit(3), lit(4)]),
            lit(5),
            lit(6),
            lit(7),
            lit(8),
        ]);
        let flat = flatten(&[2, 2, 2], &init);
        assert_eq!(as_i32(&flat), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
