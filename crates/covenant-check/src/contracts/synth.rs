//! Assembly of guarded routine bodies.
//!
//! A contracted method `m` is lowered to
//!
//! ```text
//! effectScope {                                   // only with effect clauses
//!     assert inspects(e); assert mutates(e); ...
//!     var  $post = (m$pre: () -> {
//!         assert P : "Precondition does not hold"; ...
//!         <old captures>
//!         return (m$post: (Object  $result, Throwable  $exception) -> {
//!             if ( $exception != null) { <exceptional dispatch> }
//!             <normal @throws checks>
//!             var result =  $result;
//!             assert Q : "Postcondition does not hold"; ...
//!             this.C$invariants(); ...
//!         });
//!     }).get();
//!     var  $completed = false;                    // only with exception clauses
//!     try { <body, returns routed through  $post> }
//!     catch (RuntimeException  $exception) { ... }
//! }
//! ```
//!
//! Constructors run the same prologue inline before their `super(...)` or
//! `this(...)` call, and never push a frame of their own.

use covenant_core::types::{OBJECT_CLASS, RUNTIME_EXCEPTION_CLASS, THROWABLE_CLASS};
use covenant_core::{
    CatchClause, ClassDecl, ContractSpecification, ExceptionClause, Expr, ExprKind, Intrinsic,
    LambdaBody, MethodDecl, Modifiers, Param, Program, ScopeKind, Stmt, StmtKind, Type,
};
use tracing::debug;

use super::names::{
    invariants_method, selector, COMPLETED_VAR, EXCEPTION_PARAM, POST_VAR, RESULT_LOCAL,
    RESULT_PARAM, RETURN_VAR, SPREAD_ELEMENT,
};
use super::old::OldCaptures;
use super::throws::{self, MayThrowGuard};
use super::{CompileOptions, INVARIANT_FAILED, POSTCONDITION_FAILED, PRECONDITION_FAILED};

pub(crate) struct Synthesizer<'p> {
    program: &'p Program,
    options: &'p CompileOptions,
}

impl<'p> Synthesizer<'p> {
    pub(crate) fn new(program: &'p Program, options: &'p CompileOptions) -> Self {
        Synthesizer { program, options }
    }

    pub(crate) fn lower_class(&self, class: &ClassDecl) -> ClassDecl {
        let mut lowered = class.clone();
        lowered.methods = class
            .methods
            .iter()
            .enumerate()
            .map(|(i, m)| self.lower_routine(class, m, class.overload_index(i)))
            .collect();

        let constructors = if class.constructors.is_empty() && self.needs_implicit_constructor(class)
        {
            vec![MethodDecl::constructor(
                Modifiers::public(),
                vec![],
                vec![Stmt::super_call(vec![])],
            )]
        } else {
            class.constructors.clone()
        };
        lowered.constructors = constructors
            .iter()
            .enumerate()
            .map(|(i, c)| self.lower_routine(class, c, i))
            .collect();

        if self.options.check_invariants && !class.invariants.is_empty() {
            lowered.methods.push(self.invariants_routine(class));
        }
        lowered
    }

    fn needs_implicit_constructor(&self, class: &ClassDecl) -> bool {
        self.options.effect_frames
            || (self.options.check_invariants && !self.invariant_owners(class).is_empty())
    }

    /// Classes of the chain of `class`, itself first, that declare invariants.
    fn invariant_owners(&self, class: &ClassDecl) -> Vec<String> {
        self.program
            .superclass_chain(&class.name)
            .into_iter()
            .filter(|c| !c.builtin && !c.invariants.is_empty())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Whether normal completion of `routine` re-checks the invariants of `this`.
    fn checks_invariants(&self, routine: &MethodDecl) -> bool {
        if !self.options.check_invariants || routine.modifiers.is_static {
            return false;
        }
        if routine.is_constructor() {
            return true;
        }
        !routine.modifiers.is_private()
            && routine.spec.as_ref().map_or(true, |s| {
                !s.has_effect_clauses() || s.mutates_this_location().is_some()
            })
    }

    fn invariant_calls(&self, class: &ClassDecl) -> Vec<Stmt> {
        self.invariant_owners(class)
            .iter()
            .map(|owner| Stmt::expr(Expr::call(Expr::this(), invariants_method(owner), vec![])))
            .collect()
    }

    /// `private void C$invariants() { invariantScope { ... } }`
    fn invariants_routine(&self, class: &ClassDecl) -> MethodDecl {
        let mut body = vec![Stmt::assert(
            Expr::intrinsic(Intrinsic::Inspects(Box::new(Expr::this()))),
            None,
        )];
        body.extend(class.invariants.iter().map(|inv| {
            Stmt::assert(inv.clone(), Some(Expr::string(INVARIANT_FAILED))).at(inv.span)
        }));
        MethodDecl::method(
            invariants_method(&class.name),
            Modifiers::private(),
            vec![],
            Type::Void,
            vec![Stmt::spec_scope(ScopeKind::Invariant, body)],
        )
    }

    pub(crate) fn lower_routine(
        &self,
        class: &ClassDecl,
        routine: &MethodDecl,
        overload: usize,
    ) -> MethodDecl {
        let Some(body) = &routine.body else {
            return routine.clone();
        };
        let spec = routine.spec.clone().unwrap_or_default();
        let invariants = if self.checks_invariants(routine) {
            self.invariant_calls(class)
        } else {
            Vec::new()
        };
        let label = if routine.is_constructor() {
            class.name.as_str()
        } else {
            routine.name.as_str()
        };
        let plan = RoutinePlan::new(&spec, routine, label, overload, invariants);

        let mut lowered = routine.clone();
        lowered.body = Some(if routine.is_constructor() {
            plan.constructor_body(body, self.options.effect_frames)
        } else {
            let statements = plan.method_body(body.clone());
            if self.options.effect_frames && spec.has_effect_clauses() {
                let mut scoped = effect_requirements(&spec);
                scoped.extend(statements);
                vec![Stmt::spec_scope(ScopeKind::Routine, scoped).at(routine.span)]
            } else {
                statements
            }
        });
        debug!(
            class = %class.name,
            routine = label,
            guarded = plan.guarded(),
            "lowered routine"
        );
        lowered
    }
}

/// `assert inspects(e)` / `assert mutates(e)` for every effect clause.
fn effect_requirements(spec: &ContractSpecification) -> Vec<Stmt> {
    let require = |e: Expr, mutate: bool| {
        let span = e.span;
        let intrinsic = if mutate {
            Intrinsic::Mutates(Box::new(e))
        } else {
            Intrinsic::Inspects(Box::new(e))
        };
        Stmt::assert(Expr::intrinsic(intrinsic).at(span), None)
    };
    let mut out = Vec::new();
    for e in spec.inspects.iter().flatten() {
        out.push(require(e.clone(), false));
    }
    for e in spec.mutates.iter().flatten() {
        out.push(require(e.clone(), true));
    }
    for e in spec.mutates_properties.iter().flatten() {
        let ExprKind::Call { receiver, .. } = &e.kind else {
            continue;
        };
        match receiver.as_deref() {
            None => out.push(require(Expr::this().at(e.span), true)),
            Some(Expr {
                kind: ExprKind::Spread(collection),
                ..
            }) => out.push(
                Stmt::for_each(
                    SPREAD_ELEMENT,
                    (**collection).clone(),
                    vec![require(Expr::name(SPREAD_ELEMENT).at(e.span), true)],
                )
                .at(e.span),
            ),
            Some(r) => out.push(require(r.clone(), true)),
        }
    }
    out
}

/// The pieces of one routine's lowering.
struct RoutinePlan {
    preconditions: Vec<Stmt>,
    captures: Vec<Stmt>,
    /// Statements of the postcondition closure, if the routine needs one.
    post: Option<Vec<Stmt>>,
    /// Whether the body is wrapped in the exception dispatch.
    catches: bool,
    invariants: Vec<Stmt>,
    pre_name: String,
    post_name: String,
}

impl RoutinePlan {
    fn new(
        spec: &ContractSpecification,
        routine: &MethodDecl,
        label: &str,
        overload: usize,
        invariants: Vec<Stmt>,
    ) -> Self {
        let preconditions = spec
            .preconditions
            .iter()
            .flatten()
            .map(|p| Stmt::assert(p.clone(), Some(Expr::string(PRECONDITION_FAILED))).at(p.span))
            .collect();

        let mut captures = OldCaptures::new();
        let mut posts: Vec<Expr> = spec.postconditions.clone().unwrap_or_default();
        for q in &mut posts {
            captures.rewrite(q);
        }
        let mut guarantees: Vec<ExceptionClause> = spec.throws.clone().unwrap_or_default();
        for c in &mut guarantees {
            captures.rewrite(&mut c.condition);
        }
        let permissions: Vec<MayThrowGuard> = spec
            .may_throw
            .iter()
            .flatten()
            .filter_map(|c| {
                let exception = c.exception.clone()?;
                Some(MayThrowGuard {
                    exception,
                    guard: captures.capture(&c.condition, c.span),
                    span: c.span,
                })
            })
            .collect();

        let catches = spec.throws.is_some() || spec.may_throw.is_some();
        let post = if spec.postconditions.is_some() || catches {
            let mut stmts = Vec::new();
            if catches {
                stmts.push(Stmt::if_then(
                    Expr::ne(Expr::name(EXCEPTION_PARAM), Expr::null()),
                    throws::exceptional_completion(&guarantees, &permissions),
                ));
            }
            stmts.extend(throws::normal_completion(&guarantees));
            if !routine.is_constructor() && !routine.is_void() {
                stmts.push(Stmt::local(
                    RESULT_LOCAL,
                    Some(routine.return_type.clone()),
                    Some(Expr::name(RESULT_PARAM)),
                ));
            }
            stmts.extend(posts.into_iter().map(|q| {
                let span = q.span;
                Stmt::assert(q, Some(Expr::string(POSTCONDITION_FAILED))).at(span)
            }));
            stmts.extend(invariants.iter().cloned());
            Some(stmts)
        } else {
            None
        };

        RoutinePlan {
            preconditions,
            captures: captures.statements(),
            post,
            catches,
            invariants,
            pre_name: selector(label, overload, "pre"),
            post_name: selector(label, overload, "post"),
        }
    }

    fn guarded(&self) -> bool {
        self.post.is_some()
    }

    fn post_lambda(&self, body: Vec<Stmt>) -> Expr {
        Expr::named_lambda(
            self.post_name.clone(),
            vec![
                Param::new(RESULT_PARAM, Type::class(OBJECT_CLASS)),
                Param::new(EXCEPTION_PARAM, Type::class(THROWABLE_CLASS)),
            ],
            LambdaBody::Block(body),
        )
    }

    /// Statements run before the body of a method: the `m$pre` closure.
    fn method_prologue(&self) -> Vec<Stmt> {
        if self.preconditions.is_empty() && self.captures.is_empty() && self.post.is_none() {
            return Vec::new();
        }
        let mut pre = self.preconditions.clone();
        pre.extend(self.captures.iter().cloned());
        match &self.post {
            Some(post) => {
                pre.push(Stmt::ret(Some(self.post_lambda(post.clone()))));
                let closure =
                    Expr::named_lambda(self.pre_name.clone(), vec![], LambdaBody::Block(pre));
                vec![Stmt::local(
                    POST_VAR,
                    None,
                    Some(Expr::call(closure, "get", vec![])),
                )]
            }
            None => {
                let closure =
                    Expr::named_lambda(self.pre_name.clone(), vec![], LambdaBody::Block(pre));
                vec![Stmt::expr(Expr::call(closure, "run", vec![]))]
            }
        }
    }

    /// Statements run before the body of a constructor: everything inline.
    fn constructor_prologue(&self) -> Vec<Stmt> {
        let mut out = self.preconditions.clone();
        out.extend(self.captures.iter().cloned());
        if let Some(post) = &self.post {
            out.push(Stmt::local(POST_VAR, None, Some(self.post_lambda(post.clone()))));
        }
        out
    }

    /// What runs on every normal exit, given the returned value.
    fn exit_hook(&self, value: Option<Expr>) -> Vec<Stmt> {
        if self.post.is_none() {
            return self.invariants.clone();
        }
        let mut out = Vec::new();
        if self.catches {
            out.push(Stmt::assign(Expr::name(COMPLETED_VAR), Expr::bool(true)));
        }
        out.push(Stmt::expr(Expr::call(
            Expr::name(POST_VAR),
            "accept",
            vec![value.unwrap_or_else(Expr::null), Expr::null()],
        )));
        out
    }

    /// Body with every exit routed through the hook, wrapped in the
    /// exception dispatch when the routine has exception clauses.
    fn guarded_body(&self, body: Vec<Stmt>) -> Vec<Stmt> {
        let hook = |value: Option<Expr>| self.exit_hook(value);
        let mut main = if hook(None).is_empty() {
            body
        } else {
            let falls_through = !matches!(body.last().map(|s| &s.kind), Some(StmtKind::Return(_)));
            let mut main = route_returns(body, &hook);
            if falls_through {
                main.extend(hook(None));
            }
            main
        };
        if self.catches {
            let exception = || Expr::name(EXCEPTION_PARAM);
            let handler = vec![
                Stmt::if_then(Expr::name(COMPLETED_VAR), vec![Stmt::throw(exception())]),
                Stmt::expr(Expr::call(
                    Expr::name(POST_VAR),
                    "accept",
                    vec![Expr::null(), exception()],
                )),
                Stmt::throw(exception()),
            ];
            main = vec![
                Stmt::local(COMPLETED_VAR, Some(Type::Boolean), Some(Expr::bool(false))),
                Stmt::try_catch(
                    main,
                    vec![CatchClause {
                        param: EXCEPTION_PARAM.to_string(),
                        class: RUNTIME_EXCEPTION_CLASS.to_string(),
                        body: handler,
                    }],
                ),
            ];
        }
        main
    }

    fn method_body(&self, body: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = self.method_prologue();
        out.extend(self.guarded_body(body));
        out
    }

    fn constructor_body(&self, body: &[Stmt], mark_created: bool) -> Vec<Stmt> {
        let (call, rest) = match body.split_first() {
            Some((first, rest)) if matches!(first.kind, StmtKind::ConstructorCall { .. }) => {
                (first.clone(), rest.to_vec())
            }
            _ => (Stmt::super_call(vec![]), body.to_vec()),
        };
        let mut out = Vec::new();
        if mark_created {
            out.push(Stmt::expr(Expr::intrinsic(Intrinsic::AssertCanCreate(
                Box::new(Expr::this()),
            ))));
        }
        out.extend(self.constructor_prologue());
        out.push(call);
        out.extend(self.guarded_body(rest));
        out
    }
}

/// Rewrite `return e;` into `{ var  $ret = e; <hook>; return  $ret; }`.
/// Lambda bodies are expressions and are left alone.
fn route_returns(stmts: Vec<Stmt>, hook: &dyn Fn(Option<Expr>) -> Vec<Stmt>) -> Vec<Stmt> {
    stmts.into_iter().map(|s| route_stmt(s, hook)).collect()
}

fn route_stmt(stmt: Stmt, hook: &dyn Fn(Option<Expr>) -> Vec<Stmt>) -> Stmt {
    let span = stmt.span;
    let kind = match stmt.kind {
        StmtKind::Return(Some(value)) => {
            let mut block = vec![Stmt::local(RETURN_VAR, None, Some(value)).at(span)];
            block.extend(hook(Some(Expr::name(RETURN_VAR))));
            block.push(Stmt::ret(Some(Expr::name(RETURN_VAR))).at(span));
            StmtKind::Block(block)
        }
        StmtKind::Return(None) => {
            let mut block = hook(None);
            block.push(Stmt::ret(None).at(span));
            StmtKind::Block(block)
        }
        StmtKind::If {
            cond,
            then,
            otherwise,
        } => StmtKind::If {
            cond,
            then: route_returns(then, hook),
            otherwise: otherwise.map(|o| route_returns(o, hook)),
        },
        StmtKind::While { cond, body } => StmtKind::While {
            cond,
            body: route_returns(body, hook),
        },
        StmtKind::ForEach {
            var,
            iterable,
            body,
        } => StmtKind::ForEach {
            var,
            iterable,
            body: route_returns(body, hook),
        },
        StmtKind::Block(body) => StmtKind::Block(route_returns(body, hook)),
        StmtKind::Try {
            body,
            catches,
            finally,
        } => StmtKind::Try {
            body: route_returns(body, hook),
            catches: catches
                .into_iter()
                .map(|c| CatchClause {
                    body: route_returns(c.body, hook),
                    ..c
                })
                .collect(),
            finally: finally.map(|f| route_returns(f, hook)),
        },
        StmtKind::SpecScope { kind, body } => StmtKind::SpecScope {
            kind,
            body: route_returns(body, hook),
        },
        other @ (StmtKind::Local { .. }
        | StmtKind::Expr(_)
        | StmtKind::Throw(_)
        | StmtKind::Assert { .. }
        | StmtKind::ConstructorCall { .. }) => other,
    };
    Stmt { kind, span }
}
