//! Values that may cross from one realm into another.
//!
//! Realms never share heap objects, so only primitives and realm handles
//! cross; they are rebuilt inside the receiving isolate.

use crate::RealmHandle;
use alloc::rc::Rc;
use alloc::string::String;
use kernel_script::{Exception, Isolate, Value};

/// Script tag of host objects wrapping a [`RealmHandle`].
pub const REALM_TAG: &str = "Realm";

#[derive(Debug, Clone, PartialEq)]
pub enum Transferable {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Realm(RealmHandle),
}

impl Transferable {
    /// Copies `value` out of `isolate`; `None` for ordinary objects.
    #[must_use]
    pub fn from_value(isolate: &Isolate, value: &Value) -> Option<Self> {
        Some(match value {
            Value::Undefined => Self::Undefined,
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(*n),
            Value::String(s) => Self::String(String::from(&**s)),
            Value::Object(_) => Self::Realm(realm_handle(isolate, value)?),
        })
    }

    /// Rebuilds the value inside `isolate`.
    pub fn into_value(self, isolate: &mut Isolate) -> Result<Value, Exception> {
        Ok(match self {
            Self::Undefined => Value::Undefined,
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::String(s) => Value::from(s),
            Self::Realm(handle) => isolate.new_host_object(REALM_TAG, Rc::new(handle))?,
        })
    }
}

impl From<&str> for Transferable {
    fn from(s: &str) -> Self {
        Self::String(String::from(s))
    }
}

impl From<f64> for Transferable {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Transferable {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<RealmHandle> for Transferable {
    fn from(handle: RealmHandle) -> Self {
        Self::Realm(handle)
    }
}

/// The realm handle wrapped by `value`, if it is one.
#[must_use]
pub fn realm_handle(isolate: &Isolate, value: &Value) -> Option<RealmHandle> {
    let data = isolate.host_data(value)?;
    data.downcast_ref::<RealmHandle>().cloned()
}
