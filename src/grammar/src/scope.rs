//! Name bindings visible during evaluation.
//!
//! A [`Scope`] is a frame of bindings with an optional borrowed parent.
//! Frames are built before evaluation and never mutated afterwards; a `let`
//! pushes a child frame for its body and drops it when the body is done.

use std::collections::HashMap;

use crate::ast::Expression;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    /// Evaluated on every lookup, in the scope enclosing the frame that holds
    /// it. A deferred binding therefore cannot see itself.
    Deferred(Expression),
}

#[derive(Debug, Default)]
pub struct Scope<'p> {
    parent: Option<&'p Scope<'p>>,
    bindings: HashMap<String, Binding>,
}

impl<'p> Scope<'p> {
    /// Empty root scope
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings
            .insert(name.into(), Binding::Value(value.into()));
        self
    }

    pub fn with_deferred(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.bindings.insert(name.into(), Binding::Deferred(expr));
        self
    }

    /// Empty frame whose lookups fall back to `self`
    pub fn child(&self) -> Scope<'_> {
        Scope {
            parent: Some(self),
            bindings: HashMap::new(),
        }
    }

    /// Innermost binding for `name`
    pub fn get(&self, name: &str) -> Option<&Binding> {
        let mut frame = Some(self);
        while let Some(scope) = frame {
            if let Some(binding) = scope.bindings.get(name) {
                return Some(binding);
            }
            frame = scope.parent;
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolve `name`, evaluating deferred bindings.
    ///
    /// `context` is the referencing node's context, used for
    /// [`Error::UnboundReference`].
    pub fn lookup(&self, name: &str, context: Context) -> Result<Value> {
        let mut frame = Some(self);
        while let Some(scope) = frame {
            match scope.bindings.get(name) {
                Some(Binding::Value(value)) => return Ok(value.clone()),
                Some(Binding::Deferred(expr)) => {
                    return match scope.parent {
                        Some(parent) => expr.eval(parent),
                        None => expr.eval(&Scope::new()),
                    };
                }
                None => frame = scope.parent,
            }
        }

        Err(Error::UnboundReference {
            context,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::parse;

    #[test]
    fn test_lookup_and_shadowing() {
        let root = Scope::new().with_value("x", 1).with_value("y", 2);
        let child = root.child().with_value("x", 10);

        assert_eq!(child.lookup("x", Context::default()).unwrap(), Value::Integer(10));
        assert_eq!(child.lookup("y", Context::default()).unwrap(), Value::Integer(2));
        assert_eq!(root.lookup("x", Context::default()).unwrap(), Value::Integer(1));
        assert!(child.contains("y"));
    }

    #[test]
    fn test_unbound() {
        let err = Scope::new().lookup("x", Context::new(4, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnboundReference);
        assert_eq!(err.context(), Context::new(4, 5));
        assert_eq!(err.to_string(), "unbound reference `x`");
    }

    #[test]
    fn test_deferred_evaluates_in_enclosing_scope() {
        let root = Scope::new().with_value("base", 5);
        let child = root
            .child()
            .with_value("base", 100)
            .with_deferred("total", parse("base * 2").unwrap());

        assert_eq!(child.lookup("total", Context::default()).unwrap(), Value::Integer(10));
    }

    #[test]
    fn test_deferred_cannot_see_itself() {
        let scope = Scope::new().with_deferred("x", parse("x + 1").unwrap());
        let err = scope.lookup("x", Context::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnboundReference);
        assert_eq!(err.context(), Context::new(0, 1));
    }
}
