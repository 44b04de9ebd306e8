//! Lexical scopes.
//!
//! A scope chain ends in a root scope that stores nothing itself: reads and
//! writes at the root go to the context's global object. A root created for
//! a proxy context additionally falls through to a delegate object when the
//! global has no own property of that name.

use crate::value::{ObjectId, Value};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Resolution {
    /// Names resolve against the global object only.
    Own,
    /// Names missing from the global object are looked up on `delegate`.
    Delegating { delegate: ObjectId },
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Root {
    pub global: ObjectId,
    pub resolution: Resolution,
}

#[derive(Debug)]
pub(crate) struct Env {
    vars: RefCell<Vec<(Rc<str>, Value)>>,
    parent: Option<Rc<Env>>,
    root: Option<Root>,
}

impl Env {
    pub fn root(global: ObjectId, resolution: Resolution) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(Vec::new()),
            parent: None,
            root: Some(Root { global, resolution }),
        })
    }

    pub fn child(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(Vec::new()),
            parent: Some(Rc::clone(parent)),
            root: None,
        })
    }

    pub const fn as_root(&self) -> Option<Root> {
        self.root
    }

    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.vars
            .borrow()
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.vars.borrow().iter().any(|(n, _)| &**n == name)
    }

    /// Overwrites an existing binding; returns `false` if there is none.
    pub fn set_local(&self, name: &str, value: Value) -> bool {
        let mut vars = self.vars.borrow_mut();
        match vars.iter_mut().find(|(n, _)| &**n == name) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn define_local(&self, name: &Rc<str>, value: Value) {
        if !self.set_local(name, value.clone()) {
            self.vars.borrow_mut().push((Rc::clone(name), value));
        }
    }
}
