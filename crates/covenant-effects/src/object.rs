//! Object and class handles the runtime keys its maps by.
//!
//! The runtime never looks inside objects. It only needs their identity, their
//! run-time class, and the superclass chain of that class. Identity is the
//! address of the shared allocation, so two clones of one `Arc` are the same
//! object and two equal-valued objects are not.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Run-time class descriptor.
#[derive(Debug)]
pub struct RuntimeClass {
    name: String,
    superclass: Option<ClassTag>,
}

/// Shared handle to a [`RuntimeClass`], compared by identity.
#[derive(Clone)]
pub struct ClassTag(Arc<RuntimeClass>);

impl ClassTag {
    /// The root class. It has no superclass and is never subject to permission checks.
    pub fn root(name: impl Into<String>) -> Self {
        ClassTag(Arc::new(RuntimeClass {
            name: name.into(),
            superclass: None,
        }))
    }

    pub fn new(name: impl Into<String>, superclass: &ClassTag) -> Self {
        ClassTag(Arc::new(RuntimeClass {
            name: name.into(),
            superclass: Some(superclass.clone()),
        }))
    }

    pub(crate) fn from_arc(class: Arc<RuntimeClass>) -> Self {
        ClassTag(class)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn superclass(&self) -> Option<&ClassTag> {
        self.0.superclass.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.0.superclass.is_none()
    }

    /// This class and its ancestors, excluding the root.
    pub fn chain(&self) -> impl Iterator<Item = &ClassTag> {
        std::iter::successors(Some(self), |c| c.superclass()).filter(|c| !c.is_root())
    }

    pub fn as_arc(&self) -> &Arc<RuntimeClass> {
        &self.0
    }
}

impl PartialEq for ClassTag {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassTag {}

impl Hash for ClassTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassTag({})", self.0.name)
    }
}

/// An object the runtime can track.
pub trait Tracked: Any + Send + Sync {
    fn runtime_class(&self) -> ClassTag;

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a tracked object.
pub type ObjectRef = Arc<dyn Tracked>;

/// Identity of the allocation behind an `Arc`, ignoring pointer metadata.
pub fn address<T: ?Sized>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    address(a) == address(b)
}
