//! Object storage of a single isolate.
//!
//! Objects live in a vector and are addressed by [`ObjectId`]. Nothing is
//! collected while the isolate lives; disposing the isolate frees everything
//! at once. The object budget keeps a runaway script from exhausting the
//! kernel heap.

use crate::Isolate;
use crate::ast::FunctionDecl;
use crate::env::Env;
use crate::error::Exception;
use crate::value::{ObjectId, Value};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

pub type NativeFn = Rc<dyn Fn(&mut Isolate, &[Value]) -> Result<Value, Exception>>;

pub(crate) enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Closure { decl: Rc<FunctionDecl>, env: Rc<Env> },
    Native { name: Rc<str>, f: NativeFn },
    Memory(MemoryView),
    Host { tag: Rc<str>, data: Rc<dyn Any> },
}

impl fmt::Debug for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("Plain"),
            Self::Array(items) => write!(f, "Array({})", items.len()),
            Self::Closure { decl, .. } => write!(f, "Closure({:?})", decl.name),
            Self::Native { name, .. } => write!(f, "Native({name})"),
            Self::Memory(view) => write!(f, "{view:?}"),
            Self::Host { tag, .. } => write!(f, "Host({tag})"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct HeapObject {
    pub kind: ObjectKind,
    pub props: Vec<(Rc<str>, Value)>,
}

impl HeapObject {
    pub const fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            props: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.props.iter().find(|(k, _)| &**k == name).map(|(_, v)| v)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.props.iter_mut().find(|(k, _)| &**k == name) {
            Some((_, slot)) => *slot = value,
            None => self.props.push((Rc::from(name), value)),
        }
    }

    pub const fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Closure { .. } | ObjectKind::Native { .. })
    }
}

#[derive(Debug)]
pub(crate) struct Heap {
    objects: Vec<HeapObject>,
    limit: usize,
}

impl Heap {
    pub const fn new(limit: usize) -> Self {
        Self {
            objects: Vec::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Allocates within the budget.
    pub fn alloc(&mut self, object: HeapObject) -> Option<ObjectId> {
        if self.objects.len() >= self.limit {
            return None;
        }
        Some(self.alloc_unbudgeted(object))
    }

    /// Allocates regardless of the budget. Reserved for engine-internal
    /// objects such as globals and error values that must always exist.
    #[allow(clippy::cast_possible_truncation)]
    pub fn alloc_unbudgeted(&mut self, object: HeapObject) -> ObjectId {
        self.objects.push(object);
        ObjectId((self.objects.len() - 1) as u32)
    }

    /// Drops `id` if it is the most recent allocation.
    pub fn release_newest(&mut self, id: ObjectId) -> bool {
        if self.objects.len() != id.0 as usize + 1 {
            return false;
        }
        self.objects.pop();
        true
    }

    pub fn get(&self, id: ObjectId) -> &HeapObject {
        &self.objects[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut HeapObject {
        &mut self.objects[id.0 as usize]
    }
}

/// Element width of a [`MemoryView`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ElementWidth {
    U8 = 1,
    U16 = 2,
    U32 = 4,
}

impl ElementWidth {
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::U16),
            32 => Some(Self::U32),
            _ => None,
        }
    }

    pub const fn from_bytes(bytes: u32) -> Option<Self> {
        match bytes {
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            4 => Some(Self::U32),
            _ => None,
        }
    }

    pub const fn bytes(self) -> usize {
        self as usize
    }
}

/// Typed, bounds-checked window onto raw memory.
///
/// Reads and writes are volatile, so device memory behaves as expected.
#[derive(Debug, Copy, Clone)]
pub struct MemoryView {
    base: *mut u8,
    len: usize,
    width: ElementWidth,
}

impl MemoryView {
    /// Describes `size` bytes at `base` as elements of `width`.
    ///
    /// Returns `None` if `base` is not aligned to `width`. A trailing partial
    /// element is not addressable.
    ///
    /// # Safety
    /// `base..base + size` must stay valid for volatile reads and writes for
    /// as long as any script can reach the view.
    pub unsafe fn new(base: *mut u8, size: usize, width: ElementWidth) -> Option<Self> {
        if (base as usize) % width.bytes() != 0 {
            return None;
        }
        Some(Self {
            base,
            len: size / width.bytes(),
            width,
        })
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn width(&self) -> ElementWidth {
        self.width
    }

    pub fn read(&self, index: usize) -> Option<u32> {
        if index >= self.len {
            return None;
        }
        let offset = index * self.width.bytes();
        // SAFETY: in bounds and aligned per the constructor's contract.
        let value = unsafe {
            let ptr = self.base.add(offset);
            match self.width {
                ElementWidth::U8 => u32::from(ptr.read_volatile()),
                ElementWidth::U16 => u32::from(ptr.cast::<u16>().read_volatile()),
                ElementWidth::U32 => ptr.cast::<u32>().read_volatile(),
            }
        };
        Some(value)
    }

    /// Stores the low bits of `value`; returns `false` when out of bounds.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(&self, index: usize, value: u32) -> bool {
        if index >= self.len {
            return false;
        }
        let offset = index * self.width.bytes();
        // SAFETY: in bounds and aligned per the constructor's contract.
        unsafe {
            let ptr = self.base.add(offset);
            match self.width {
                ElementWidth::U8 => ptr.write_volatile(value as u8),
                ElementWidth::U16 => ptr.cast::<u16>().write_volatile(value as u16),
                ElementWidth::U32 => ptr.cast::<u32>().write_volatile(value),
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_enforced() {
        let mut heap = Heap::new(2);
        assert!(heap.alloc(HeapObject::new(ObjectKind::Plain)).is_some());
        assert!(heap.alloc(HeapObject::new(ObjectKind::Plain)).is_some());
        assert!(heap.alloc(HeapObject::new(ObjectKind::Plain)).is_none());
        let id = heap.alloc_unbudgeted(HeapObject::new(ObjectKind::Plain));
        assert_eq!(heap.len(), 3);
        heap.get_mut(id).set("x", Value::Number(1.0));
        assert!(matches!(heap.get(id).get("x"), Some(Value::Number(_))));
    }

    #[test]
    fn memory_view_is_bounds_checked() {
        let mut backing = [0u32; 4];
        let view = unsafe {
            MemoryView::new(backing.as_mut_ptr().cast(), 16, ElementWidth::U16).unwrap()
        };
        assert_eq!(view.len(), 8);
        assert!(view.write(1, 0x1_2345));
        assert_eq!(view.read(1), Some(0x2345));
        assert!(!view.write(8, 1));
        assert_eq!(view.read(8), None);
    }

    #[test]
    fn memory_view_rejects_misaligned_base() {
        let mut backing = [0u32; 2];
        let base = unsafe { backing.as_mut_ptr().cast::<u8>().add(1) };
        assert!(unsafe { MemoryView::new(base, 4, ElementWidth::U32) }.is_none());
    }
}
