//! Declared types and access modifiers of the Java-like source language.
//!
//! Reference types use nominal identity by class name. The type checker in
//! `covenant-check` resolves class names against a [`Program`](crate::Program)
//! for subtyping; this module only carries the shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the root class every reference type derives from.
pub const OBJECT_CLASS: &str = "Object";
/// Name of the built-in string class.
pub const STRING_CLASS: &str = "String";
/// Name of the root of the exception hierarchy.
pub const THROWABLE_CLASS: &str = "Throwable";
/// Name of the class caught by guarded routine bodies.
pub const RUNTIME_EXCEPTION_CLASS: &str = "RuntimeException";
/// Name of the class raised by failed assertions.
pub const ASSERTION_ERROR_CLASS: &str = "AssertionError";
/// Name of the class raised when an array allocation cannot be satisfied.
pub const OUT_OF_MEMORY_CLASS: &str = "OutOfMemoryError";

/// A declared or inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    /// 64-bit signed integer (all integral types share one runtime width).
    Int,
    Double,
    Void,
    /// Type of the `null` literal; assignable to every reference type.
    Null,
    /// Nominal class type, including `Object`, `String` and exception types.
    Class(String),
    Array(Box<Type>),
    /// Type of a lambda expression.
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(name.into())
    }

    pub fn object() -> Type {
        Type::Class(OBJECT_CLASS.into())
    }

    pub fn string() -> Type {
        Type::Class(STRING_CLASS.into())
    }

    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    /// Reference types are the ones permission checks and `null` apply to.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Null | Type::Class(_) | Type::Array(_) | Type::Function { .. }
        )
    }

    /// The class name of a nominal type, if any.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Element type of an array type.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "boolean"),
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Class(name) => write!(f, "{}", name),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Function { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
        }
    }
}

/// Access level of a declaration.
///
/// Ordered from least to most restrictive, so `Public < Protected < Package < Private`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Access {
    Public,
    Protected,
    Package,
    Private,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => write!(f, "public"),
            Access::Protected => write!(f, "protected"),
            Access::Package => write!(f, "package"),
            Access::Private => write!(f, "private"),
        }
    }
}

/// Modifiers of a class, field or routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub access: Access,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_final: bool,
}

impl Modifiers {
    pub const fn new(access: Access) -> Self {
        Modifiers {
            access,
            is_static: false,
            is_final: false,
        }
    }

    pub const fn public() -> Self {
        Modifiers::new(Access::Public)
    }

    pub const fn private() -> Self {
        Modifiers::new(Access::Private)
    }

    pub const fn package() -> Self {
        Modifiers::new(Access::Package)
    }

    pub const fn protected() -> Self {
        Modifiers::new(Access::Protected)
    }

    pub const fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub const fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn is_public(&self) -> bool {
        self.access == Access::Public
    }

    pub fn is_private(&self) -> bool {
        self.access == Access::Private
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers::package()
    }
}
