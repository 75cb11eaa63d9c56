//! Runtime values of the interpreter.
//!
//! Primitives are stored inline. Objects, arrays and closures are shared
//! handles with interior mutability, so copying a [`Value`] copies a
//! reference.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use covenant_core::{LambdaBody, Param, Span, Type};
use covenant_effects::{ClassTag, ObjectRef, Tracked};
use indexmap::IndexMap;

/// Where a throwable was allocated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrowSite {
    pub span: Span,
    /// Innermost routine first.
    pub stack: Vec<String>,
}

/// An instance of a class.
pub struct HeapObject {
    class: ClassTag,
    fields: Mutex<IndexMap<String, Value>>,
    site: Option<ThrowSite>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HeapObject {
    pub fn new(class: ClassTag, fields: IndexMap<String, Value>, site: Option<ThrowSite>) -> Self {
        HeapObject {
            class,
            fields: Mutex::new(fields),
            site,
        }
    }

    pub fn class(&self) -> &ClassTag {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        lock(&self.fields).get(field).cloned()
    }

    pub fn has_field(&self, field: &str) -> bool {
        lock(&self.fields).contains_key(field)
    }

    pub fn set(&self, field: &str, value: Value) {
        lock(&self.fields).insert(field.to_string(), value);
    }

    pub fn site(&self) -> Option<&ThrowSite> {
        self.site.as_ref()
    }
}

impl Tracked for HeapObject {
    fn runtime_class(&self) -> ClassTag {
        self.class.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapObject")
            .field("class", &self.class.name())
            .field("fields", &lock(&self.fields).keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fixed-length array with mutable elements.
#[derive(Debug)]
pub struct ArrayObject {
    pub element: Type,
    items: Mutex<Vec<Value>>,
}

impl ArrayObject {
    pub fn new(element: Type, items: Vec<Value>) -> Self {
        ArrayObject {
            element,
            items: Mutex::new(items),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        lock(&self.items).get(index).cloned()
    }

    pub fn set(&self, index: usize, value: Value) -> bool {
        match lock(&self.items).get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy of the current elements.
    pub fn snapshot(&self) -> Vec<Value> {
        lock(&self.items).clone()
    }
}

/// A lambda together with the variables it captured.
#[derive(Debug)]
pub struct Closure {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: LambdaBody,
    pub captured: HashMap<String, Value>,
    pub this: Option<Value>,
    /// Class whose code created the closure.
    pub class: String,
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(Arc<str>),
    Object(Arc<HeapObject>),
    Array(Arc<ArrayObject>),
    Closure(Arc<Closure>),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Value {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Str(_) => "String",
            Value::Object(o) => o.class_name(),
            Value::Array(_) => "array",
            Value::Closure(_) => "lambda",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<HeapObject>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The permission-runtime handle of an object value.
    pub fn as_tracked(&self) -> Option<ObjectRef> {
        self.as_object().map(|o| {
            let tracked: ObjectRef = o.clone();
            tracked
        })
    }

    /// `==` semantics: identity for references, value equality for primitives
    /// (with `int` widened against `double`).
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Default value of a field or array element of type `ty`.
    pub fn default_for(ty: &Type) -> Value {
        match ty {
            Type::Boolean => Value::Bool(false),
            Type::Int => Value::Int(0),
            Type::Double => Value::Double(0.0),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(o) => write!(f, "{}", o.class_name()),
            Value::Array(a) => write!(f, "{}[{}]", a.element, a.len()),
            Value::Closure(c) => write!(f, "{}", c.name.as_deref().unwrap_or("lambda")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str) -> Arc<HeapObject> {
        let tag = ClassTag::new(name, &ClassTag::root("Object"));
        Arc::new(HeapObject::new(tag, IndexMap::new(), None))
    }

    #[test]
    fn references_compare_by_identity() {
        let a = object("Point");
        let b = object("Point");
        assert!(Value::Object(a.clone()).same(&Value::Object(a.clone())));
        assert!(!Value::Object(a).same(&Value::Object(b)));
        assert!(Value::string("x").same(&Value::string("x")));
        assert!(Value::Int(2).same(&Value::Double(2.0)));
        assert!(!Value::Null.same(&Value::Int(0)));
    }

    #[test]
    fn tracked_handle_shares_identity() {
        let a = object("Point");
        let v = Value::Object(a.clone());
        let tracked = v.as_tracked().unwrap();
        let direct: ObjectRef = a;
        assert!(covenant_effects::object::same_object(&tracked, &direct));
        assert_eq!(tracked.runtime_class().name(), "Point");
    }

    #[test]
    fn array_writes_are_shared() {
        let arr = Arc::new(ArrayObject::new(Type::Int, vec![Value::Int(0); 3]));
        let alias = Value::Array(arr.clone());
        assert!(arr.set(1, Value::Int(7)));
        assert!(!arr.set(3, Value::Int(7)));
        match alias {
            Value::Array(a) => assert_eq!(a.get(1).and_then(|v| v.as_int()), Some(7)),
            other => panic!("expected array, got {other:?}"),
        }
    }
}
