//! Symbol table and scope stack.
//!
//! Scopes are entered and left through an RAII guard rather than paired
//! `enter`/`leave` calls on a global stack pointer: a guard's `Drop` pops
//! its scope even if the caller returns early via `?`, so a scope can
//! never outlive the block that opened it.

use std::collections::HashMap;

use crate::ast::BType;

/// Shape of an array/pointer type, outermost dimension first. A pointer
/// parameter's leading dimension is unsized and is not represented here;
/// only the dimensions after it (known at the call site) are kept.
pub type Shape = Vec<usize>;

#[derive(Debug, Clone)]
pub enum Symbol {
    /// A `const int` or element of a `const int[...]` array, already
    /// folded to its value(s) by the constant evaluator.
    ConstScalar(i32),
    /// `values` is the fully-folded flat initializer, used by
    /// `const_eval` when every index is itself constant; `koopa_id`
    /// names the backing `alloc`, used when an index is not constant
    /// (e.g. `a[i]`) and the element must be read through the IR.
    ConstArray { shape: Shape, values: Vec<i32>, koopa_id: String },
    /// A local or global variable. `koopa_id` is the Koopa value that
    /// names the `alloc`/`global alloc` holding it.
    VarScalar { koopa_id: String },
    VarArray { shape: Shape, koopa_id: String },
    /// A pointer-typed function parameter, i.e. `int a[]` or `int
    /// a[][3]`. `shape` holds the dimensions after the unsized leading
    /// one.
    Pointer { shape: Shape, koopa_id: String },
    /// `ret_ty` is `None` for `void` functions.
    Func { ret_ty: Option<BType>, param_count: usize },
}

#[derive(Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
}

pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { scopes: vec![Scope::default()] }
    }

    /// Enter a new nested scope. The returned guard pops it on drop.
    pub fn enter(&mut self) -> ScopeGuard<'_> {
        self.scopes.push(Scope::default());
        ScopeGuard { stack: self }
    }

    /// Insert into the innermost scope. Returns `false` if a symbol with
    /// the same name already exists in that same scope (shadowing an
    /// outer scope's binding is allowed; redeclaring within one scope is
    /// not).
    pub fn insert(&mut self, name: impl Into<String>, sym: Symbol) -> bool {
        let name = name.into();
        let scope = self.scopes.last_mut().expect("global scope is never popped");
        if scope.symbols.contains_key(&name) {
            return false;
        }
        scope.symbols.insert(name, sym);
        true
    }

    /// Insert into the innermost scope, failing hard (I1) if the name is
    /// already bound there. The error carries no line number — callers
    /// that have one attach it by mapping the error string.
    pub fn declare(&mut self, name: impl Into<String>, sym: Symbol) -> Result<(), String> {
        let name = name.into();
        if self.insert(name.clone(), sym) {
            Ok(())
        } else {
            Err(format!("redefinition of `{name}`"))
        }
    }

    /// Look up a name, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.symbols.get(name))
    }

    /// Resolve an lvalue's root symbol, following nothing further: Koopa
    /// addressing (`getelemptr`/`getptr`) is built by the caller from the
    /// shape recorded here, not by this table.
    pub fn lookup_root(&self, name: &str) -> Option<&Symbol> {
        self.lookup(name)
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }
}

pub struct ScopeGuard<'a> {
    stack: &'a mut ScopeStack,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.stack.scopes.pop();
        debug_assert!(!self.stack.scopes.is_empty(), "global scope popped");
    }
}

impl std::ops::Deref for ScopeGuard<'_> {
    type Target = ScopeStack;
    fn deref(&self) -> &ScopeStack {
        self.stack
    }
}

impl std::ops::DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut ScopeStack {
        self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_across_scopes_is_allowed() {
        let mut stack = ScopeStack::new();
        stack.insert("x", Symbol::ConstScalar(1));
        {
            let mut inner = stack.enter();
            assert!(inner.insert("x", Symbol::ConstScalar(2)));
            match inner.lookup("x") {
                Some(Symbol::ConstScalar(2)) => {}
                other => panic!("expected inner x = 2, got {other:?}"),
            }
        }
        match stack.lookup("x") {
            Some(Symbol::ConstScalar(1)) => {}
            other => panic!("expected outer x = 1 restored, got {other:?}"),
        }
    }

    #[test]
    fn redeclaration_in_same_scope_rejected() {
        let mut stack = ScopeStack::new();
        assert!(stack.insert("x", Symbol::ConstScalar(1)));
        assert!(!stack.insert("x", Symbol::ConstScalar(2)));
    }

    #[test]
    fn lookup_misses_return_none() {
        let stack = ScopeStack::new();
        assert!(stack.lookup("nope").is_none());
    }
}
