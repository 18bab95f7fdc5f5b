//! Scope frames and scope chains.
//!
//! A [`Scope`] is one mutable binding frame with an optional parent; following parents
//! gives a single lexical lineage. A [`ScopeChain`] is an ordered list of independent
//! scopes consulted first to last, where each member's whole lineage is searched before
//! moving on to the next member. Call activations use it to present their argument frame,
//! the closure's captured chain and (optionally) the caller's chain as one environment.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::Error;
use crate::ast::Term;

/// One binding frame
#[derive(Default)]
pub struct Scope {
    bindings: RefCell<HashMap<String, Term>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn with_parent(parent: Rc<Scope>) -> Self {
        Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Bind `name` in this frame, replacing any existing binding here
    pub fn define(&self, name: impl Into<String>, value: Term) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Look `name` up in this frame, then its parents
    pub fn get(&self, name: &str) -> Option<Term> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            scope = current.parent.as_deref();
        }
        None
    }

    /// Overwrite the nearest existing binding of `name` in this lineage.
    /// Returns false when the name is bound nowhere in it.
    pub fn assign(&self, name: &str, value: Term) -> bool {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(slot) = current.bindings.borrow_mut().get_mut(name) {
                *slot = value;
                return true;
            }
            scope = current.parent.as_deref();
        }
        false
    }

    /// All bindings visible from this frame, nearest binding winning, sorted by name
    pub fn all_bindings(&self) -> Vec<(String, Term)> {
        let mut bindings = HashMap::new();

        // Start with parent bindings (so they can be overridden by local bindings)
        if let Some(parent) = &self.parent {
            bindings.extend(parent.all_bindings());
        }
        for (name, value) in self.bindings.borrow().iter() {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl std::fmt::Debug for Scope {
    // Values may hold closures that capture this very scope, so only names are printed
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Scope")
            .field("names", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Ordered collection of scopes forming one logical environment
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    scopes: Vec<Rc<Scope>>,
}

impl ScopeChain {
    pub fn new(scope: Rc<Scope>) -> Self {
        ScopeChain {
            scopes: vec![scope],
        }
    }

    /// Append every member of `other`, after the current members
    pub fn extend(&mut self, other: &ScopeChain) {
        self.scopes.extend(other.scopes.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Term> {
        self.scopes.iter().find_map(|scope| scope.get(name))
    }

    /// Look `name` up, failing with a NameError when it is unbound
    pub fn lookup(&self, name: &str) -> Result<Term, Error> {
        self.get(name)
            .ok_or_else(|| Error::name(format!("no such object: {name}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bind `name` in the first scope of the chain. Definitions never land anywhere else.
    pub fn define(&self, name: impl Into<String>, value: Term) -> Result<(), Error> {
        let Some(first) = self.scopes.first() else {
            return Err(Error::runtime("cannot define in an empty environment"));
        };
        first.define(name, value);
        Ok(())
    }

    /// Mutate the existing binding of `name` found first in chain order
    pub fn assign(&self, name: &str, value: Term) -> Result<(), Error> {
        for scope in &self.scopes {
            if scope.get(name).is_some() {
                scope.assign(name, value);
                return Ok(());
            }
        }
        Err(Error::name(format!("no such object: {name}")))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;
    use pretty_assertions::assert_eq;

    fn scope_with(bindings: &[(&str, i64)]) -> Rc<Scope> {
        let scope = Scope::new();
        for (name, value) in bindings {
            scope.define(*name, val(*value));
        }
        Rc::new(scope)
    }

    #[test]
    fn test_scope_lineage_lookup_and_shadowing() {
        let root = scope_with(&[("a", 1), ("b", 2)]);
        let child = Scope::with_parent(root.clone());
        child.define("b", val(20));

        assert_eq!(child.get("a"), Some(val(1)));
        assert_eq!(child.get("b"), Some(val(20)));
        assert_eq!(root.get("b"), Some(val(2)));
        assert_eq!(child.get("missing"), None);
        assert!(child.parent().is_some());
    }

    #[test]
    fn test_scope_assign_updates_nearest_binding() {
        let root = scope_with(&[("x", 1)]);
        let child = Scope::with_parent(root.clone());

        assert!(child.assign("x", val(5)));
        assert_eq!(root.get("x"), Some(val(5)));
        assert!(!child.assign("y", val(0)));
        assert_eq!(child.get("y"), None);
    }

    #[test]
    fn test_chain_searches_each_lineage_in_order() {
        let globals = scope_with(&[("shared", 0), ("only-global", 7)]);
        let captured = Rc::new(Scope::with_parent(globals.clone()));
        captured.define("shared", val(1));
        let caller = scope_with(&[("shared", 2), ("only-caller", 3)]);

        let mut chain = ScopeChain::new(Rc::new(Scope::new()));
        chain.extend(&ScopeChain::new(captured));
        chain.extend(&ScopeChain::new(caller));

        assert_eq!(chain.len(), 3);
        assert!(!chain.is_empty());
        // the captured lineage (including its parent) wins over the caller
        assert_eq!(chain.get("shared"), Some(val(1)));
        assert_eq!(chain.get("only-global"), Some(val(7)));
        assert_eq!(chain.get("only-caller"), Some(val(3)));
        assert!(chain.contains("only-caller"));
        assert!(matches!(chain.lookup("nope"), Err(Error::NameError(_))));
    }

    #[test]
    fn test_chain_define_writes_first_scope_only() {
        let frame = Rc::new(Scope::new());
        let outer = scope_with(&[("v", 1)]);
        let mut chain = ScopeChain::new(frame.clone());
        chain.extend(&ScopeChain::new(outer.clone()));

        chain.define("v", val(2)).unwrap();
        assert_eq!(frame.get("v"), Some(val(2)));
        assert_eq!(outer.get("v"), Some(val(1)));
        assert_eq!(chain.get("v"), Some(val(2)));

        assert!(ScopeChain::default().define("v", val(0)).is_err());
    }

    #[test]
    fn test_chain_assign() {
        let root = scope_with(&[("n", 0)]);
        let captured = Rc::new(Scope::with_parent(root.clone()));
        let mut chain = ScopeChain::new(Rc::new(Scope::new()));
        chain.extend(&ScopeChain::new(captured));

        chain.assign("n", val(1)).unwrap();
        assert_eq!(root.get("n"), Some(val(1)));

        let err = chain.assign("unbound", val(1)).unwrap_err();
        assert_eq!(err, Error::NameError("no such object: unbound".to_owned()));
    }

    #[test]
    fn test_all_bindings_sorted_with_overrides() {
        let root = scope_with(&[("b", 1), ("a", 1)]);
        let child = Scope::with_parent(root);
        child.define("b", val(2));
        child.define("c", val(3));

        let names: Vec<(String, Term)> = child.all_bindings();
        assert_eq!(
            names,
            vec![
                ("a".to_owned(), val(1)),
                ("b".to_owned(), val(2)),
                ("c".to_owned(), val(3)),
            ]
        );
    }
}
