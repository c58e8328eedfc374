use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A lexical scope: insertion-ordered name-to-slot mapping with a link to
/// the enclosing scope. The chain mirrors the runtime frame chain, so a
/// lookup yields the `(frame depth, slot)` pair the evaluator will use.
#[derive(Debug)]
pub struct SymTab {
    parent: Option<Rc<SymTab>>,
    names: RefCell<HashMap<String, usize>>,
}

impl SymTab {
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            names: RefCell::new(HashMap::new()),
        })
    }

    pub fn nested(parent: &Rc<SymTab>, names: &[String]) -> Rc<Self> {
        let scope = Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            names: RefCell::new(HashMap::new()),
        });
        for name in names {
            scope.add(name);
        }
        scope
    }

    /// Add `name` to this scope, returning its slot. Adding an existing name
    /// returns the slot it already has.
    pub fn add(&self, name: &str) -> usize {
        let mut names = self.names.borrow_mut();
        if let Some(&slot) = names.get(name) {
            return slot;
        }
        let slot = names.len();
        names.insert(name.to_string(), slot);
        slot
    }

    /// Resolve `name` to `(depth, slot)`, where depth counts scopes outward
    /// from this one.
    pub fn lookup(&self, name: &str) -> Option<(usize, usize)> {
        if let Some(&slot) = self.names.borrow().get(name) {
            return Some((0, slot));
        }
        let (depth, slot) = self.parent.as_ref()?.lookup(name)?;
        Some((depth + 1, slot))
    }

    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.borrow().is_empty()
    }
}
