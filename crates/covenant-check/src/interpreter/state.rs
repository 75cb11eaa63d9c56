//! Interpreter state, routine invocation and object allocation.
//!
//! The [`Interpreter`] owns everything a run needs besides the program: the
//! run-time class tags, the permission frame stack, the named loggers, the
//! interpreted call stack and the optional trace. Statement and expression
//! evaluation live in `eval.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use covenant_core::types::{ASSERTION_ERROR_CLASS, OBJECT_CLASS, STRING_CLASS};
use covenant_core::{ClassDecl, LambdaBody, MethodDecl, Program, Span};
use covenant_effects::{
    ClassInfo, ClassTag, EffectRegistry, ObjectRef, RelatedObjects, VerificationContext,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ExecError, RuntimeError, UncaughtException};
use super::logging::{DiagnosticSink, LoggerRegistry};
use super::trace::{TraceEntry, TraceOutcome};
use super::value::{Closure, HeapObject, ThrowSite, Value};
use crate::contracts::{ViolationKind, INVARIANT_REENTRANCY};

/// Configuration for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Maximum depth of the interpreted call stack. Default: 256.
    pub max_call_depth: usize,
    /// Execute `assert` statements, contract checks included.
    pub enable_assertions: bool,
    /// Maintain permission frames and check field accesses against them.
    pub check_effects: bool,
    /// Record a [`TraceEntry`] per routine invocation.
    pub trace_enabled: bool,
    /// Longest array `new T[n]` may allocate; longer requests raise
    /// `OutOfMemoryError`. Default: 16M elements.
    pub max_array_length: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_call_depth: 256,
            enable_assertions: true,
            check_effects: true,
            trace_enabled: false,
            max_array_length: 1 << 24,
        }
    }
}

/// Abrupt completion of a statement or expression.
#[derive(Debug)]
pub(crate) enum Unwind {
    /// An interpreted exception in flight.
    Throw(Arc<HeapObject>),
    Fault(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Unwind::Fault(e)
    }
}

pub(crate) type Exec<T> = Result<T, Unwind>;

/// Normal completion of a statement.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

/// Local variables of one routine or closure activation.
pub(crate) struct Env {
    scopes: Vec<HashMap<String, Value>>,
    pub(crate) this: Option<Value>,
    /// Class whose code is executing.
    pub(crate) class: String,
}

impl Env {
    pub(crate) fn new(class: impl Into<String>, this: Option<Value>) -> Self {
        Env {
            scopes: vec![HashMap::new()],
            this,
            class: class.into(),
        }
    }

    fn with_captured(
        class: impl Into<String>,
        this: Option<Value>,
        captured: HashMap<String, Value>,
    ) -> Self {
        Env {
            scopes: vec![captured, HashMap::new()],
            this,
            class: class.into(),
        }
    }

    pub(crate) fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(crate) fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub(crate) fn declare(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes.iter().rev().find_map(|s| s.get(name).cloned())
    }

    /// Assign an existing local. Returns `false` if no local has that name.
    pub(crate) fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Every visible local, inner declarations shadowing outer ones.
    pub(crate) fn flatten(&self) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        for scope in &self.scopes {
            for (k, v) in scope {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }
}

/// Tree-walking interpreter for (lowered) programs.
pub struct Interpreter<'p> {
    pub(crate) program: &'p Program,
    pub(crate) config: InterpreterConfig,
    tags: HashMap<String, ClassTag>,
    pub(crate) effects: VerificationContext,
    pub(crate) loggers: LoggerRegistry,
    /// `Class.routine` labels, outermost first.
    pub(crate) call_stack: Vec<String>,
    /// Objects whose invariants are being evaluated.
    pub(crate) invariant_subjects: Vec<Arc<HeapObject>>,
    trace: Option<Vec<TraceEntry>>,
}

impl<'p> Interpreter<'p> {
    /// An interpreter over the process-wide effect registry.
    pub fn new(program: &'p Program, config: InterpreterConfig) -> Result<Self, RuntimeError> {
        Self::with_registry(program, config, EffectRegistry::global())
    }

    pub fn with_registry(
        program: &'p Program,
        config: InterpreterConfig,
        registry: Arc<EffectRegistry>,
    ) -> Result<Self, RuntimeError> {
        program.validate().map_err(|e| RuntimeError::InvalidProgram {
            reason: e.to_string(),
        })?;
        let mut tags = HashMap::new();
        for name in program.classes.keys() {
            tag_for(program, name, &mut tags)?;
        }
        for class in program.classes.values() {
            if class.rep_fields.is_empty() && class.peer_fields.is_empty() {
                continue;
            }
            let Some(tag) = tags.get(&class.name) else {
                continue;
            };
            let info = ClassInfo::new(
                related_through(class.rep_fields.clone()),
                related_through(class.peer_fields.clone()),
            );
            registry
                .register_class_info(tag, info)
                .map_err(|e| RuntimeError::InvalidProgram {
                    reason: e.to_string(),
                })?;
        }
        debug!(classes = tags.len(), "interpreter ready");
        let trace = config.trace_enabled.then(Vec::new);
        Ok(Interpreter {
            program,
            config,
            tags,
            effects: VerificationContext::new(registry),
            loggers: LoggerRegistry::new(),
            call_stack: Vec::new(),
            invariant_subjects: Vec::new(),
            trace,
        })
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Register a diagnostic sink under `name`.
    pub fn register_logger(&mut self, name: impl Into<String>, sink: Arc<dyn DiagnosticSink>) {
        self.loggers.register(name, sink);
    }

    pub fn effects(&self) -> &VerificationContext {
        &self.effects
    }

    /// The frame stack, e.g. to run a call inside an enclosing frame.
    pub fn effects_mut(&mut self) -> &mut VerificationContext {
        &mut self.effects
    }

    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.trace.as_deref()
    }

    pub fn class_tag(&self, class: &str) -> Option<&ClassTag> {
        self.tags.get(class)
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// `new class(args)`
    pub fn instantiate(&mut self, class: &str, args: Vec<Value>) -> Result<Value, ExecError> {
        let result = self.construct(class, args, Span::default());
        self.finish(result)
    }

    /// `receiver.method(args)`
    pub fn call_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExecError> {
        let result = self.invoke_method(receiver.clone(), None, method, args, Span::default());
        self.finish(result)
    }

    /// `Class.method(args)`
    pub fn call_static(
        &mut self,
        class: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExecError> {
        let result = self.invoke_static(class, method, args, Span::default());
        self.finish(result)
    }

    /// Read a field without any permission check.
    pub fn field(&self, object: &Value, field: &str) -> Option<Value> {
        object.as_object().and_then(|o| o.get(field))
    }

    fn finish<T>(&mut self, result: Exec<T>) -> Result<T, ExecError> {
        self.call_stack.clear();
        self.invariant_subjects.clear();
        result.map_err(|unwind| match unwind {
            Unwind::Throw(exception) => ExecError::Uncaught(self.describe(&exception, 0)),
            Unwind::Fault(fault) => ExecError::Fault(fault),
        })
    }

    /// Snapshot of an interpreted exception, with its cause chain.
    pub(crate) fn describe(&self, exception: &Arc<HeapObject>, depth: usize) -> UncaughtException {
        let lineage: Vec<String> =
            std::iter::successors(Some(exception.class()), |c| c.superclass())
                .map(|c| c.name().to_string())
                .collect();
        let message = match exception.get("message") {
            Some(Value::Str(s)) => Some(s.to_string()),
            _ => None,
        };
        let cause = match exception.get("cause") {
            Some(Value::Object(c)) if depth < 32 => Some(Box::new(self.describe(&c, depth + 1))),
            _ => None,
        };
        let kind = lineage
            .iter()
            .any(|c| c == ASSERTION_ERROR_CLASS)
            .then(|| ViolationKind::classify(message.as_deref().unwrap_or("")));
        let site = exception.site().cloned().unwrap_or_default();
        UncaughtException {
            class: exception.class_name().to_string(),
            lineage,
            message,
            cause,
            span: site.span,
            stack: site.stack,
            kind,
        }
    }

    // -----------------------------------------------------------------------
    // Classes and objects
    // -----------------------------------------------------------------------

    pub(crate) fn class_decl(&self, name: &str) -> Result<&'p ClassDecl, RuntimeError> {
        let program: &'p Program = self.program;
        program
            .class(name)
            .ok_or_else(|| RuntimeError::UnknownClass {
                name: name.to_string(),
            })
    }

    pub(crate) fn is_builtin(&self, object: &HeapObject) -> bool {
        self.program
            .class(object.class_name())
            .is_some_and(|c| c.builtin)
    }

    /// `instanceof` on run-time values.
    pub(crate) fn is_instance(&self, value: &Value, class: &str) -> bool {
        match value {
            Value::Object(o) => self.program.is_subclass(o.class_name(), class),
            Value::Str(_) => class == STRING_CLASS || class == OBJECT_CLASS,
            Value::Array(_) | Value::Closure(_) => class == OBJECT_CLASS,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Double(_) => false,
        }
    }

    /// Allocate an instance of `class` with every field at its default value.
    pub(crate) fn allocate(&self, class: &str, span: Span) -> Result<Arc<HeapObject>, RuntimeError> {
        let tag = self
            .tags
            .get(class)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownClass {
                name: class.to_string(),
            })?;
        let mut fields = IndexMap::new();
        for c in self.program.superclass_chain(class).iter().rev() {
            for f in c.fields.values().filter(|f| !f.modifiers.is_static) {
                fields.insert(f.name.clone(), Value::default_for(&f.ty));
            }
        }
        let site = self.program.is_throwable(class).then(|| ThrowSite {
            span,
            stack: self.stack_snapshot(),
        });
        Ok(Arc::new(HeapObject::new(tag, fields, site)))
    }

    /// A new exception of `class`, built without running its constructors.
    pub(crate) fn exception(
        &self,
        class: &str,
        message: Option<String>,
        cause: Option<Arc<HeapObject>>,
        span: Span,
    ) -> Unwind {
        match self.allocate(class, span) {
            Ok(object) => {
                object.set("message", message.map_or(Value::Null, Value::string));
                object.set("cause", cause.map_or(Value::Null, Value::Object));
                Unwind::Throw(object)
            }
            Err(e) => Unwind::Fault(e),
        }
    }

    pub(crate) fn raise<T>(&self, class: &str, message: impl Into<String>, span: Span) -> Exec<T> {
        Err(self.exception(class, Some(message.into()), None, span))
    }

    /// Interpreted call stack, innermost first.
    pub(crate) fn stack_snapshot(&self) -> Vec<String> {
        self.call_stack.iter().rev().cloned().collect()
    }

    /// `new class(args)`: allocate, then run the matching constructor.
    pub(crate) fn construct(&mut self, class: &str, args: Vec<Value>, span: Span) -> Exec<Value> {
        if class == STRING_CLASS {
            return Err(RuntimeError::NotInstantiable {
                class: class.to_string(),
            }
            .into());
        }
        let object = self.allocate(class, span)?;
        let value = Value::Object(object);
        self.run_constructor(class, value.clone(), args)?;
        Ok(value)
    }

    /// Run the constructor of `class` with `args` on an allocated object.
    pub(crate) fn run_constructor(&mut self, class: &str, this: Value, args: Vec<Value>) -> Exec<()> {
        let decl = self.class_decl(class)?;
        match self.program.lookup_constructor(class, args.len()) {
            Some(ctor) => self.invoke_routine(decl, ctor, Some(this), args).map(|_| ()),
            None if args.is_empty() && decl.constructors.is_empty() => match decl.superclass() {
                Some(sup) => self.run_constructor(sup, this, args),
                None => Ok(()),
            },
            None => Err(RuntimeError::UnknownConstructor {
                class: class.to_string(),
                arity: args.len(),
            }
            .into()),
        }
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Method lookup. Private methods of the executing class are bound
    /// statically when the receiver is `this`.
    fn resolve_method(
        &self,
        runtime_class: &str,
        lexical_class: Option<&str>,
        method: &str,
        arity: usize,
    ) -> Result<(&'p ClassDecl, &'p MethodDecl), RuntimeError> {
        let program: &'p Program = self.program;
        if let Some(lexical) = lexical_class.and_then(|c| program.class(c)) {
            if let Some(m) = lexical
                .methods
                .iter()
                .find(|m| m.name == method && m.arity() == arity && m.modifiers.is_private())
            {
                return Ok((lexical, m));
            }
        }
        program
            .lookup_method(runtime_class, method, arity)
            .ok_or_else(|| RuntimeError::UnknownMethod {
                class: runtime_class.to_string(),
                method: method.to_string(),
                arity,
            })
    }

    /// `receiver.method(args)` on any run-time value.
    pub(crate) fn invoke_method(
        &mut self,
        receiver: Value,
        lexical_class: Option<&str>,
        method: &str,
        args: Vec<Value>,
        span: Span,
    ) -> Exec<Value> {
        match &receiver {
            Value::Closure(closure) => self.invoke_closure(closure, args),
            Value::Object(object) => {
                let (owner, decl) =
                    self.resolve_method(object.class_name(), lexical_class, method, args.len())?;
                if self.config.enable_assertions
                    && !decl.modifiers.is_private()
                    && self
                        .invariant_subjects
                        .iter()
                        .any(|s| Arc::ptr_eq(s, object))
                {
                    return self.raise(ASSERTION_ERROR_CLASS, INVARIANT_REENTRANCY, span);
                }
                self.invoke_routine(owner, decl, Some(receiver.clone()), args)
            }
            Value::Null => self.raise(
                "NullPointerException",
                format!("cannot invoke {}() on null", method),
                span,
            ),
            Value::Str(s) => match (method, args.as_slice()) {
                ("length", []) => Ok(Value::Int(s.chars().count() as i64)),
                ("equals", [other]) => Ok(Value::Bool(receiver.same(other))),
                _ => Err(unknown_method(STRING_CLASS, method, args.len()).into()),
            },
            other => match (method, args.as_slice()) {
                ("equals", [arg]) => Ok(Value::Bool(other.same(arg))),
                _ => Err(unknown_method(other.type_name(), method, args.len()).into()),
            },
        }
    }

    /// `Class.method(args)`
    pub(crate) fn invoke_static(
        &mut self,
        class: &str,
        method: &str,
        args: Vec<Value>,
        _span: Span,
    ) -> Exec<Value> {
        let (owner, decl) = self.resolve_method(class, Some(class), method, args.len())?;
        self.invoke_routine(owner, decl, None, args)
    }

    /// Run one routine activation.
    pub(crate) fn invoke_routine(
        &mut self,
        owner: &'p ClassDecl,
        decl: &'p MethodDecl,
        this: Option<Value>,
        args: Vec<Value>,
    ) -> Exec<Value> {
        if args.len() != decl.arity() {
            return Err(unknown_method(&owner.name, &decl.name, args.len()).into());
        }
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            }
            .into());
        }
        let label = format!("{}.{}", owner.name, decl.name);
        let rendered: Vec<String> = if self.trace.is_some() {
            args.iter().map(ToString::to_string).collect()
        } else {
            Vec::new()
        };
        self.call_stack.push(label.clone());
        let depth = self.call_stack.len();

        let this = if decl.modifiers.is_static { None } else { this };
        let result = match &decl.body {
            None => self.invoke_native(owner, decl, this.as_ref(), &args),
            Some(body) => {
                let mut env = Env::new(owner.name.clone(), this);
                for (param, arg) in decl.params.iter().zip(args) {
                    env.declare(&param.name, arg);
                }
                if decl.is_constructor() {
                    self.run_constructor_body(&mut env, owner, body)
                        .map(|_| Value::Null)
                } else {
                    self.exec_stmts(&mut env, body).map(|flow| match flow {
                        Flow::Return(v) => v,
                        Flow::Normal => Value::Null,
                    })
                }
            }
        };

        self.call_stack.pop();
        if let Some(trace) = self.trace.as_mut() {
            let outcome = match &result {
                Ok(v) if decl.is_void() => TraceOutcome::Returned(if v.is_null() {
                    "void".to_string()
                } else {
                    v.to_string()
                }),
                Ok(v) => TraceOutcome::Returned(v.to_string()),
                Err(Unwind::Throw(e)) => TraceOutcome::Threw(e.class_name().to_string()),
                Err(Unwind::Fault(_)) => TraceOutcome::Faulted,
            };
            trace.push(TraceEntry {
                routine: label,
                args: rendered,
                depth,
                outcome,
            });
        }
        result
    }

    fn invoke_native(
        &mut self,
        owner: &ClassDecl,
        decl: &MethodDecl,
        this: Option<&Value>,
        args: &[Value],
    ) -> Exec<Value> {
        match (owner.name.as_str(), decl.name.as_str(), this, args) {
            (OBJECT_CLASS, "equals", Some(this), [other]) => Ok(Value::Bool(this.same(other))),
            _ => Err(RuntimeError::Internal {
                message: format!("no native implementation of {}.{}", owner.name, decl.name),
            }
            .into()),
        }
    }

    pub(crate) fn invoke_closure(&mut self, closure: &Arc<Closure>, args: Vec<Value>) -> Exec<Value> {
        if args.len() != closure.params.len() {
            return Err(RuntimeError::TypeMismatch {
                expected: format!("{} arguments", closure.params.len()),
                found: format!("{} arguments", args.len()),
                span: Span::default(),
            }
            .into());
        }
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            }
            .into());
        }
        self.call_stack.push(format!(
            "{}.{}",
            closure.class,
            closure.name.as_deref().unwrap_or("lambda")
        ));
        let mut env = Env::with_captured(
            closure.class.clone(),
            closure.this.clone(),
            closure.captured.clone(),
        );
        for (param, arg) in closure.params.iter().zip(args) {
            env.declare(&param.name, arg);
        }
        let result = match &closure.body {
            LambdaBody::Expr(e) => self.eval(&mut env, e),
            LambdaBody::Block(stmts) => self.exec_stmts(&mut env, stmts).map(|flow| match flow {
                Flow::Return(v) => v,
                Flow::Normal => Value::Null,
            }),
        };
        self.call_stack.pop();
        result
    }
}

fn unknown_method(class: &str, method: &str, arity: usize) -> RuntimeError {
    RuntimeError::UnknownMethod {
        class: class.to_string(),
        method: method.to_string(),
        arity,
    }
}

fn tag_for(
    program: &Program,
    name: &str,
    tags: &mut HashMap<String, ClassTag>,
) -> Result<ClassTag, RuntimeError> {
    if let Some(tag) = tags.get(name) {
        return Ok(tag.clone());
    }
    let class = program.class(name).ok_or_else(|| RuntimeError::UnknownClass {
        name: name.to_string(),
    })?;
    let tag = match class.superclass() {
        None => ClassTag::root(name),
        Some(sup) => {
            let sup = tag_for(program, sup, tags)?;
            ClassTag::new(name, &sup)
        }
    };
    tags.insert(name.to_string(), tag.clone());
    Ok(tag)
}

/// Objects held in `fields` of a subject, including the elements of array fields.
fn related_through(fields: Vec<String>) -> RelatedObjects {
    Arc::new(move |subject: &ObjectRef, sink: &mut dyn FnMut(ObjectRef)| {
        let Some(object) = subject.as_any().downcast_ref::<HeapObject>() else {
            return;
        };
        for field in &fields {
            match object.get(field) {
                Some(Value::Object(o)) => sink(o as ObjectRef),
                Some(Value::Array(a)) => {
                    for item in a.snapshot() {
                        if let Value::Object(o) = item {
                            sink(o as ObjectRef);
                        }
                    }
                }
                _ => {}
            }
        }
    })
}
