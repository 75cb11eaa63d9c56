//! Symbol table of a whole program: classes, fields, routines and their contracts.
//!
//! A [`Program`] always contains the built-in `java.lang`-style classes
//! (`Object`, `String`, and the exception hierarchy rooted at `Throwable`).
//! User classes are added with [`Program::add_class`] or deserialized from JSON
//! and completed with [`Program::ensure_builtins`].

use std::collections::HashSet;

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::ast::{Expr, Param, Stmt};
use crate::contract::ContractSpecification;
use crate::error::CoreError;
use crate::span::Span;
use crate::types::{
    Modifiers, Type, ASSERTION_ERROR_CLASS, OBJECT_CLASS, OUT_OF_MEMORY_CLASS,
    RUNTIME_EXCEPTION_CLASS, STRING_CLASS, THROWABLE_CLASS,
};

/// Package of the built-in classes.
pub const BUILTIN_PACKAGE: &str = "java.lang";

/// Name used for constructors in [`MethodDecl::name`].
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Whether a routine is a method or a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutineKind {
    Method,
    Constructor,
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: Type, modifiers: Modifiers) -> Self {
        FieldDecl {
            name: name.into(),
            ty,
            modifiers,
        }
    }
}

/// A method or constructor declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub params: Vec<Param>,
    pub return_type: Type,
    pub kind: RoutineKind,
    /// `None` for routines implemented natively by the interpreter.
    pub body: Option<Vec<Stmt>>,
    #[serde(default)]
    pub spec: Option<ContractSpecification>,
    #[serde(default)]
    pub span: Span,
}

impl MethodDecl {
    pub fn method(
        name: impl Into<String>,
        modifiers: Modifiers,
        params: Vec<Param>,
        return_type: Type,
        body: Vec<Stmt>,
    ) -> Self {
        MethodDecl {
            name: name.into(),
            modifiers,
            params,
            return_type,
            kind: RoutineKind::Method,
            body: Some(body),
            spec: None,
            span: Span::default(),
        }
    }

    pub fn constructor(modifiers: Modifiers, params: Vec<Param>, body: Vec<Stmt>) -> Self {
        MethodDecl {
            name: CONSTRUCTOR_NAME.to_string(),
            modifiers,
            params,
            return_type: Type::Void,
            kind: RoutineKind::Constructor,
            body: Some(body),
            spec: None,
            span: Span::default(),
        }
    }

    pub fn with_spec(mut self, spec: ContractSpecification) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Mark the routine as implemented natively.
    pub fn native(mut self) -> Self {
        self.body = None;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == RoutineKind::Constructor
    }

    pub fn is_void(&self) -> bool {
        self.return_type == Type::Void
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default = "Modifiers::public")]
    pub modifiers: Modifiers,
    /// Declared superclass; `None` means `Object` (or nothing, for `Object` itself).
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub constructors: Vec<MethodDecl>,
    #[serde(default)]
    pub invariants: Vec<Expr>,
    /// Fields annotated `@peerObject`.
    #[serde(default)]
    pub peer_fields: Vec<String>,
    /// Fields annotated `@representationObject`.
    #[serde(default)]
    pub rep_fields: Vec<String>,
    #[serde(default)]
    pub builtin: bool,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        ClassDecl {
            name: name.into(),
            package: String::new(),
            modifiers: Modifiers::public(),
            superclass: None,
            fields: IndexMap::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            invariants: Vec::new(),
            peer_fields: Vec::new(),
            rep_fields: Vec::new(),
            builtin: false,
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn in_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn constructor(mut self, ctor: MethodDecl) -> Self {
        self.constructors.push(ctor);
        self
    }

    pub fn invariant(mut self, e: Expr) -> Self {
        self.invariants.push(e);
        self
    }

    pub fn peer_field(mut self, name: impl Into<String>) -> Self {
        self.peer_fields.push(name.into());
        self
    }

    pub fn rep_field(mut self, name: impl Into<String>) -> Self {
        self.rep_fields.push(name.into());
        self
    }

    /// Effective superclass name.
    pub fn superclass(&self) -> Option<&str> {
        if self.name == OBJECT_CLASS {
            None
        } else {
            Some(self.superclass.as_deref().unwrap_or(OBJECT_CLASS))
        }
    }

    /// Zero-based position of `methods[index]` among same-named methods of this class.
    pub fn overload_index(&self, index: usize) -> usize {
        let Some(target) = self.methods.get(index) else {
            return 0;
        };
        self.methods[..index]
            .iter()
            .filter(|m| m.name == target.name)
            .count()
    }
}

/// A whole program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub classes: IndexMap<String, ClassDecl>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// A program containing only the built-in classes.
    pub fn new() -> Self {
        let mut program = Program {
            classes: IndexMap::new(),
        };
        program.ensure_builtins();
        program
    }

    /// Decode a program from its JSON form and add any missing built-ins.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut program: Program =
            serde_json::from_str(json).map_err(|e| CoreError::Malformed {
                reason: e.to_string(),
            })?;
        program.ensure_builtins();
        Ok(program)
    }

    /// Encode the user classes of the program as JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        let user = Program {
            classes: self
                .classes
                .iter()
                .filter(|(_, c)| !c.builtin)
                .map(|(k, c)| (k.clone(), c.clone()))
                .collect(),
        };
        serde_json::to_string_pretty(&user).map_err(|e| CoreError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Insert every built-in class that is not already present.
    pub fn ensure_builtins(&mut self) {
        for class in builtin_classes() {
            if !self.classes.contains_key(&class.name) {
                self.classes.insert(class.name.clone(), class);
            }
        }
    }

    pub fn add_class(&mut self, class: ClassDecl) -> Result<(), CoreError> {
        if self.classes.contains_key(&class.name) {
            return Err(CoreError::DuplicateClass { name: class.name });
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassDecl> {
        self.classes.get_mut(name)
    }

    pub fn user_classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values().filter(|c| !c.builtin)
    }

    /// The class itself followed by its ancestors up to `Object`.
    ///
    /// Stops early at an unknown class or a cycle.
    pub fn superclass_chain(&self, name: &str) -> Vec<&ClassDecl> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.class(name);
        while let Some(class) = current {
            if !seen.insert(class.name.as_str()) {
                break;
            }
            chain.push(class);
            current = class.superclass().and_then(|s| self.class(s));
        }
        chain
    }

    /// Reflexive subclass test.
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        self.superclass_chain(sub).iter().any(|c| c.name == sup)
    }

    pub fn is_throwable(&self, name: &str) -> bool {
        self.is_subclass(name, THROWABLE_CLASS)
    }

    /// Find a field by walking up the superclass chain.
    pub fn lookup_field(&self, class: &str, field: &str) -> Option<(&ClassDecl, &FieldDecl)> {
        self.superclass_chain(class)
            .into_iter()
            .find_map(|c| c.fields.get(field).map(|f| (c, f)))
    }

    /// Find a method by name and arity, walking up the superclass chain.
    pub fn lookup_method(
        &self,
        class: &str,
        name: &str,
        arity: usize,
    ) -> Option<(&ClassDecl, &MethodDecl)> {
        self.superclass_chain(class).into_iter().find_map(|c| {
            c.methods
                .iter()
                .find(|m| m.name == name && m.arity() == arity)
                .map(|m| (c, m))
        })
    }

    /// Constructors are not inherited. A class without declared constructors
    /// has an implicit no-argument one, which is not listed here.
    pub fn lookup_constructor(&self, class: &str, arity: usize) -> Option<&MethodDecl> {
        self.class(class)?
            .constructors
            .iter()
            .find(|c| c.arity() == arity)
    }

    /// Check superclass links, inheritance cycles, member uniqueness and
    /// peer/representation annotations.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: IndexMap<&str, NodeIndex> = IndexMap::new();
        for name in self.classes.keys() {
            nodes.insert(name.as_str(), graph.add_node(name.as_str()));
        }
        for class in self.classes.values() {
            if let Some(sup) = class.superclass() {
                let Some(&to) = nodes.get(sup) else {
                    return Err(CoreError::UnknownSuperclass {
                        class: class.name.clone(),
                        superclass: sup.to_string(),
                    });
                };
                graph.add_edge(nodes[class.name.as_str()], to, ());
            }
        }
        if let Err(cycle) = toposort(&graph, None) {
            return Err(CoreError::InheritanceCycle {
                class: graph[cycle.node_id()].to_string(),
            });
        }

        for class in self.classes.values() {
            let mut seen = HashSet::new();
            for m in class.methods.iter().chain(class.constructors.iter()) {
                if !seen.insert((m.kind == RoutineKind::Constructor, &m.name, m.arity())) {
                    return Err(CoreError::DuplicateMember {
                        class: class.name.clone(),
                        member: format!("{}/{}", m.name, m.arity()),
                    });
                }
            }
            for field in class.peer_fields.iter().chain(class.rep_fields.iter()) {
                if self.lookup_field(&class.name, field).is_none() {
                    return Err(CoreError::UnknownAnnotatedField {
                        class: class.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in classes
// ---------------------------------------------------------------------------

fn builtin(name: &str, superclass: Option<&str>) -> ClassDecl {
    let mut class = ClassDecl::new(name).in_package(BUILTIN_PACKAGE);
    class.superclass = superclass.map(str::to_string);
    class.builtin = true;
    class
}

/// Exception class with the three conventional constructors delegating to `super`.
fn exception_class(name: &str, superclass: &str) -> ClassDecl {
    let msg = || Param::new("message", Type::string());
    let cause = || Param::new("cause", Type::class(THROWABLE_CLASS));
    builtin(name, Some(superclass))
        .constructor(MethodDecl::constructor(
            Modifiers::public(),
            vec![],
            vec![Stmt::super_call(vec![])],
        ))
        .constructor(MethodDecl::constructor(
            Modifiers::public(),
            vec![msg()],
            vec![Stmt::super_call(vec![Expr::name("message")])],
        ))
        .constructor(MethodDecl::constructor(
            Modifiers::public(),
            vec![msg(), cause()],
            vec![Stmt::super_call(vec![
                Expr::name("message"),
                Expr::name("cause"),
            ])],
        ))
}

fn builtin_classes() -> Vec<ClassDecl> {
    let object = builtin(OBJECT_CLASS, None)
        .constructor(MethodDecl::constructor(Modifiers::public(), vec![], vec![]))
        .method(
            MethodDecl::method(
                "equals",
                Modifiers::public(),
                vec![Param::new("other", Type::object())],
                Type::Boolean,
                vec![],
            )
            .native(),
        );

    let string = builtin(STRING_CLASS, None)
        .with_modifiers(Modifiers::public().with_final())
        .method(
            MethodDecl::method("length", Modifiers::public(), vec![], Type::Int, vec![]).native(),
        );

    let this_field = |name: &str| Expr::field(Expr::this(), name);
    let throwable = builtin(THROWABLE_CLASS, None)
        .field(FieldDecl::new("message", Type::string(), Modifiers::private()))
        .field(FieldDecl::new(
            "cause",
            Type::class(THROWABLE_CLASS),
            Modifiers::private(),
        ))
        .constructor(MethodDecl::constructor(Modifiers::public(), vec![], vec![]))
        .constructor(MethodDecl::constructor(
            Modifiers::public(),
            vec![Param::new("message", Type::string())],
            vec![Stmt::assign(this_field("message"), Expr::name("message"))],
        ))
        .constructor(MethodDecl::constructor(
            Modifiers::public(),
            vec![
                Param::new("message", Type::string()),
                Param::new("cause", Type::class(THROWABLE_CLASS)),
            ],
            vec![
                Stmt::assign(this_field("message"), Expr::name("message")),
                Stmt::assign(this_field("cause"), Expr::name("cause")),
            ],
        ))
        .method(MethodDecl::method(
            "getMessage",
            Modifiers::public(),
            vec![],
            Type::string(),
            vec![Stmt::ret(Some(this_field("message")))],
        ))
        .method(MethodDecl::method(
            "getCause",
            Modifiers::public(),
            vec![],
            Type::class(THROWABLE_CLASS),
            vec![Stmt::ret(Some(this_field("cause")))],
        ));

    vec![
        object,
        string,
        throwable,
        exception_class("Exception", THROWABLE_CLASS),
        exception_class("Error", THROWABLE_CLASS),
        exception_class(ASSERTION_ERROR_CLASS, "Error"),
        exception_class(OUT_OF_MEMORY_CLASS, "Error"),
        exception_class(RUNTIME_EXCEPTION_CLASS, "Exception"),
        exception_class("IllegalArgumentException", RUNTIME_EXCEPTION_CLASS),
        exception_class("IllegalStateException", RUNTIME_EXCEPTION_CLASS),
        exception_class("ArithmeticException", RUNTIME_EXCEPTION_CLASS),
        exception_class("NullPointerException", RUNTIME_EXCEPTION_CLASS),
        exception_class("ArrayIndexOutOfBoundsException", RUNTIME_EXCEPTION_CLASS),
        exception_class("UnsupportedOperationException", RUNTIME_EXCEPTION_CLASS),
    ]
}
