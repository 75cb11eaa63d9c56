//! End-to-end tests: contracted programs are compiled with
//! `ContractCompiler` and the lowered program is executed by the interpreter.
//!
//! Tests cover:
//! - Preconditions, postconditions and `old(...)` captures
//! - Class invariants, including inherited ones and re-entrant calls
//! - `@throws` guarantees and `@may_throw` permissions
//! - Effect clauses: frames, peers, spreads
//! - Compile-time exclusion of classes with unresolvable contracts

use std::sync::Arc;

use covenant_core::{
    BinaryOp, ClassDecl, ContractSpecification, ExceptionClause, Expr, FieldDecl, MethodDecl,
    Modifiers, Param, Program, Span, Stmt, Type, UnaryOp,
};
use covenant_effects::EffectRegistry;

use covenant_check::contracts::{
    EXCEPTION_NOT_SPECIFIED, INVARIANT_REENTRANCY, LOGGER_NAME,
};
use covenant_check::interpreter::{ArrayObject, RecordingSink};
use covenant_check::{
    CompileOptions, ContractCompiler, ContractError, ExecError, Interpreter, InterpreterConfig,
    Value, ViolationKind,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn program(classes: Vec<ClassDecl>) -> Program {
    let mut p = Program::new();
    for c in classes {
        p.add_class(c).unwrap();
    }
    p
}

/// Compile `p`, asserting that every class resolved.
fn compile(p: &Program) -> Program {
    let result = ContractCompiler::default().compile(p);
    assert!(
        result.is_clean(),
        "unexpected diagnostics: {:?}",
        result.diagnostics
    );
    result.program
}

fn interpreter(p: &Program, config: InterpreterConfig) -> Interpreter<'_> {
    Interpreter::with_registry(p, config, Arc::new(EffectRegistry::new())).unwrap()
}

fn violation(err: &ExecError) -> Option<ViolationKind> {
    err.uncaught().and_then(|e| e.violation())
}

fn thrown(err: &ExecError) -> &str {
    err.uncaught().map(|e| e.class.as_str()).unwrap_or("<fault>")
}

fn int_param(name: &str) -> Param {
    Param::new(name, Type::Int)
}

fn getter(name: &str, field: &str) -> MethodDecl {
    MethodDecl::method(
        name,
        Modifiers::public(),
        vec![],
        Type::Int,
        vec![Stmt::ret(Some(Expr::name(field)))],
    )
}

fn void_method(name: &str, params: Vec<Param>, body: Vec<Stmt>) -> MethodDecl {
    MethodDecl::method(name, Modifiers::public(), params, Type::Void, body)
}

fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(op, lhs, rhs)
}

fn int_of(interp: &Interpreter<'_>, object: &Value, field: &str) -> Option<i64> {
    interp.field(object, field).and_then(|v| v.as_int())
}

// ---------------------------------------------------------------------------
// Preconditions, postconditions, invariants
// ---------------------------------------------------------------------------

/// `health` must stay non-negative; `heal` over-heals by one.
fn game_character() -> Program {
    let health = || Expr::name("health");
    let get_health = || Expr::call_self("getHealth", vec![]);
    program(vec![ClassDecl::new("GameCharacter")
        .in_package("game")
        .field(FieldDecl::new("health", Type::Int, Modifiers::private()))
        .invariant(bin(BinaryOp::Ge, health(), Expr::int(0)))
        .constructor(
            MethodDecl::constructor(
                Modifiers::public(),
                vec![int_param("health")],
                vec![Stmt::assign(Expr::field(Expr::this(), "health"), health())],
            )
            .with_spec(ContractSpecification::new().pre(bin(BinaryOp::Gt, health(), Expr::int(0)))),
        )
        .method(getter("getHealth", "health"))
        .method(
            void_method(
                "takeDamage",
                vec![int_param("amount")],
                vec![Stmt::assign(
                    health(),
                    bin(BinaryOp::Sub, health(), Expr::name("amount")),
                )],
            )
            .with_spec(
                ContractSpecification::new()
                    .pre(bin(BinaryOp::Ge, Expr::name("amount"), Expr::int(0)))
                    .post(Expr::eq(
                        get_health(),
                        bin(BinaryOp::Sub, Expr::old(get_health()), Expr::name("amount")),
                    ))
                    .mutates(Expr::this()),
            ),
        )
        .method(
            void_method(
                "heal",
                vec![int_param("amount")],
                vec![Stmt::assign(
                    health(),
                    bin(
                        BinaryOp::Add,
                        bin(BinaryOp::Add, health(), Expr::name("amount")),
                        Expr::int(1),
                    ),
                )],
            )
            .with_spec(
                ContractSpecification::new()
                    .post(Expr::eq(
                        get_health(),
                        bin(BinaryOp::Add, Expr::old(get_health()), Expr::name("amount")),
                    ))
                    .mutates(Expr::this()),
            ),
        )])
}

#[test]
fn damage_within_contract_updates_health() {
    let p = compile(&game_character());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let hero = interp.instantiate("GameCharacter", vec![Value::Int(100)]).unwrap();
    interp
        .call_method(&hero, "takeDamage", vec![Value::Int(30)])
        .unwrap();
    let health = interp.call_method(&hero, "getHealth", vec![]).unwrap();
    assert_eq!(health.as_int(), Some(70));
    assert_eq!(interp.effects().depth(), 0);
}

#[test]
fn precondition_failure_leaves_state_untouched() {
    let p = compile(&game_character());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let hero = interp.instantiate("GameCharacter", vec![Value::Int(100)]).unwrap();
    let err = interp
        .call_method(&hero, "takeDamage", vec![Value::Int(-5)])
        .unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Precondition));
    assert_eq!(int_of(&interp, &hero, "health"), Some(100));
}

#[test]
fn constructor_precondition_is_checked() {
    let p = compile(&game_character());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let err = interp
        .instantiate("GameCharacter", vec![Value::Int(0)])
        .unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Precondition));
}

#[test]
fn invariant_is_rechecked_after_mutation() {
    let p = compile(&game_character());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let hero = interp.instantiate("GameCharacter", vec![Value::Int(100)]).unwrap();
    let err = interp
        .call_method(&hero, "takeDamage", vec![Value::Int(150)])
        .unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Invariant));
}

#[test]
fn postcondition_detects_wrong_update() {
    let p = compile(&game_character());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let hero = interp.instantiate("GameCharacter", vec![Value::Int(10)]).unwrap();
    let err = interp
        .call_method(&hero, "heal", vec![Value::Int(5)])
        .unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Postcondition));
    let uncaught = err.uncaught().unwrap();
    assert!(uncaught.is("Error"));
    assert!(uncaught.stack.iter().any(|frame| frame == "GameCharacter.heal"));
}

#[test]
fn disabled_assertions_skip_every_check() {
    let p = compile(&game_character());
    let config = InterpreterConfig {
        enable_assertions: false,
        ..InterpreterConfig::default()
    };
    let mut interp = interpreter(&p, config);
    let hero = interp.instantiate("GameCharacter", vec![Value::Int(10)]).unwrap();
    interp
        .call_method(&hero, "takeDamage", vec![Value::Int(-5)])
        .unwrap();
    interp
        .call_method(&hero, "heal", vec![Value::Int(5)])
        .unwrap();
    assert_eq!(int_of(&interp, &hero, "health"), Some(21));
}

#[test]
fn first_failing_precondition_is_reported() {
    let spec = ContractSpecification::new()
        .pre(bin(BinaryOp::Gt, Expr::name("a"), Expr::int(0)).at(Span::new(10, 15)))
        .pre(bin(BinaryOp::Gt, Expr::name("b"), Expr::int(0)).at(Span::new(20, 25)));
    let p = compile(&program(vec![ClassDecl::new("Calc").method(
        MethodDecl::method(
            "both",
            Modifiers::public().with_static(),
            vec![int_param("a"), int_param("b")],
            Type::Void,
            vec![],
        )
        .with_spec(spec),
    )]));
    let mut interp = interpreter(&p, InterpreterConfig::default());

    let err = interp
        .call_static("Calc", "both", vec![Value::Int(0), Value::Int(0)])
        .unwrap_err();
    assert_eq!(err.uncaught().map(|e| e.span), Some(Span::new(10, 15)));
    let err = interp
        .call_static("Calc", "both", vec![Value::Int(1), Value::Int(0)])
        .unwrap_err();
    assert_eq!(err.uncaught().map(|e| e.span), Some(Span::new(20, 25)));
    interp
        .call_static("Calc", "both", vec![Value::Int(1), Value::Int(1)])
        .unwrap();
}

#[test]
fn failed_old_capture_is_rethrown_only_when_read() {
    // post: v == 0 || old(100 / getD()) >= 0
    let post = Expr::or(
        Expr::eq(Expr::name("v"), Expr::int(0)),
        bin(
            BinaryOp::Ge,
            Expr::old(bin(
                BinaryOp::Div,
                Expr::int(100),
                Expr::call_self("getD", vec![]),
            )),
            Expr::int(0),
        ),
    );
    let p = compile(&program(vec![ClassDecl::new("Ratio")
        .field(FieldDecl::new("d", Type::Int, Modifiers::private()))
        .method(getter("getD", "d"))
        .method(
            void_method(
                "set",
                vec![int_param("v")],
                vec![Stmt::assign(Expr::name("d"), Expr::name("v"))],
            )
            .with_spec(ContractSpecification::new().post(post).mutates(Expr::this())),
        )]));
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let ratio = interp.instantiate("Ratio", vec![]).unwrap();

    // d == 0: the capture fails, but the clause never reads it.
    interp.call_method(&ratio, "set", vec![Value::Int(0)]).unwrap();
    // d == 0 again, and this time the clause needs the captured value.
    let err = interp
        .call_method(&ratio, "set", vec![Value::Int(5)])
        .unwrap_err();
    assert_eq!(thrown(&err), "ArithmeticException");
    assert_eq!(violation(&err), None);
    // The body ran before the postcondition did.
    assert_eq!(int_of(&interp, &ratio, "d"), Some(5));
    interp.call_method(&ratio, "set", vec![Value::Int(7)]).unwrap();
}

#[test]
fn inherited_invariants_are_checked_in_subclasses() {
    let p = compile(&program(vec![
        ClassDecl::new("Tank")
            .field(FieldDecl::new("level", Type::Int, Modifiers::protected()))
            .invariant(bin(BinaryOp::Ge, Expr::name("level"), Expr::int(0))),
        ClassDecl::new("LeakyTank").extends("Tank").method(void_method(
            "drain",
            vec![],
            vec![Stmt::assign(Expr::name("level"), Expr::int(-1))],
        )),
    ]));
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let tank = interp.instantiate("LeakyTank", vec![]).unwrap();
    let err = interp.call_method(&tank, "drain", vec![]).unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Invariant));
}

#[test]
fn invariants_may_only_call_private_helpers() {
    let helper = |name: &str, modifiers: Modifiers| {
        MethodDecl::method(
            name,
            modifiers,
            vec![],
            Type::Boolean,
            vec![Stmt::ret(Some(bin(
                BinaryOp::Ge,
                Expr::name("level"),
                Expr::int(0),
            )))],
        )
    };
    let p = compile(&program(vec![
        ClassDecl::new("OpenGauge")
            .field(FieldDecl::new("level", Type::Int, Modifiers::private()))
            .method(helper("isValid", Modifiers::public()))
            .invariant(Expr::call_self("isValid", vec![])),
        ClassDecl::new("ClosedGauge")
            .field(FieldDecl::new("level", Type::Int, Modifiers::private()))
            .method(helper("valid", Modifiers::private()))
            .invariant(Expr::call_self("valid", vec![])),
    ]));
    let mut interp = interpreter(&p, InterpreterConfig::default());

    let err = interp.instantiate("OpenGauge", vec![]).unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Invariant));
    assert_eq!(
        err.uncaught().and_then(|e| e.message.as_deref()),
        Some(INVARIANT_REENTRANCY)
    );
    interp.instantiate("ClosedGauge", vec![]).unwrap();
}

// ---------------------------------------------------------------------------
// Exception clauses
// ---------------------------------------------------------------------------

/// `check(x, mode)` throws according to `mode`, under
/// `@throws IllegalArgumentException | x == 1` and
/// `@throws ArithmeticException | x == 1`.
fn checker() -> Program {
    let x_is_one = || Expr::eq(Expr::name("x"), Expr::int(1));
    let throw_when = |mode: i64, class: &str| {
        Stmt::if_then(
            Expr::eq(Expr::name("mode"), Expr::int(mode)),
            vec![Stmt::throw(Expr::new_object(class, vec![Expr::string("boom")]))],
        )
    };
    let spec = ContractSpecification::new()
        .throws(ExceptionClause::new("IllegalArgumentException", x_is_one()))
        .throws(ExceptionClause::new("ArithmeticException", x_is_one()));
    program(vec![ClassDecl::new("Checker").method(
        MethodDecl::method(
            "check",
            Modifiers::public().with_static(),
            vec![int_param("x"), int_param("mode")],
            Type::Void,
            vec![
                throw_when(0, "ArithmeticException"),
                throw_when(1, "NullPointerException"),
                throw_when(2, "IllegalArgumentException"),
            ],
        )
        .with_spec(spec),
    )])
}

fn run_check(p: &Program, x: i64, mode: i64) -> (Result<Value, ExecError>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let mut interp = interpreter(p, InterpreterConfig::default());
    interp.register_logger(LOGGER_NAME, sink.clone());
    let result = interp.call_static("Checker", "check", vec![Value::Int(x), Value::Int(mode)]);
    (result, sink)
}

#[test]
fn any_matching_throws_clause_satisfies_the_guarantee() {
    let p = compile(&checker());
    let (result, sink) = run_check(&p, 1, 0);
    assert_eq!(thrown(&result.unwrap_err()), "ArithmeticException");
    let (result, _) = run_check(&p, 1, 2);
    assert_eq!(thrown(&result.unwrap_err()), "IllegalArgumentException");
    assert!(sink.records().is_empty());
}

#[test]
fn normal_return_breaks_a_holding_throws_clause() {
    let p = compile(&checker());
    let (result, _) = run_check(&p, 1, 3);
    let err = result.unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::UnsatisfiedThrows));
    assert!(err.uncaught().unwrap().cause.is_none());

    let (result, _) = run_check(&p, 0, 3);
    result.unwrap();
}

#[test]
fn wrong_exception_type_is_wrapped_and_reported() {
    let p = compile(&checker());
    let (result, sink) = run_check(&p, 1, 1);
    let err = result.unwrap_err();
    let uncaught = err.uncaught().unwrap();
    assert_eq!(uncaught.violation(), Some(ViolationKind::UnsatisfiedThrows));
    let cause = uncaught.cause.as_deref().expect("cause expected");
    assert_eq!(cause.class, "NullPointerException");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, EXCEPTION_NOT_SPECIFIED);
    assert!(records[0].stack.iter().any(|f| f.starts_with("Checker.")));
}

#[test]
fn unspecified_exception_is_rethrown_after_notice() {
    let p = compile(&checker());
    let (result, sink) = run_check(&p, 0, 0);
    assert_eq!(thrown(&result.unwrap_err()), "ArithmeticException");
    assert_eq!(sink.records().len(), 1);
}

#[test]
fn may_throw_never_raises_an_assertion() {
    let spec = ContractSpecification::new().may_throw(ExceptionClause::new(
        "IllegalStateException",
        bin(BinaryOp::Lt, Expr::name("x"), Expr::int(0)),
    ));
    let p = compile(&program(vec![ClassDecl::new("Door").method(
        MethodDecl::method(
            "open",
            Modifiers::public().with_static(),
            vec![int_param("x")],
            Type::Void,
            vec![Stmt::throw(Expr::new_object(
                "IllegalStateException",
                vec![Expr::string("locked")],
            ))],
        )
        .with_spec(spec),
    )]));
    let sink = Arc::new(RecordingSink::new());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    interp.register_logger(LOGGER_NAME, sink.clone());

    let err = interp
        .call_static("Door", "open", vec![Value::Int(-1)])
        .unwrap_err();
    assert_eq!(thrown(&err), "IllegalStateException");
    assert!(sink.records().is_empty());

    let err = interp
        .call_static("Door", "open", vec![Value::Int(1)])
        .unwrap_err();
    assert_eq!(thrown(&err), "IllegalStateException");
    assert_eq!(violation(&err), None);
    assert_eq!(sink.records().len(), 1);
}

#[test]
fn may_throw_condition_is_judged_before_the_body() {
    // The body negates x before throwing, so the condition no longer holds
    // when the exception reaches the dispatch.
    let spec = ContractSpecification::new().may_throw(ExceptionClause::new(
        "IllegalStateException",
        bin(BinaryOp::Lt, Expr::name("x"), Expr::int(0)),
    ));
    let p = compile(&program(vec![ClassDecl::new("Latch").method(
        MethodDecl::method(
            "release",
            Modifiers::public().with_static(),
            vec![int_param("x")],
            Type::Void,
            vec![
                Stmt::assign(
                    Expr::name("x"),
                    Expr::unary(UnaryOp::Neg, Expr::name("x")),
                ),
                Stmt::throw(Expr::new_object(
                    "IllegalStateException",
                    vec![Expr::string("stuck")],
                )),
            ],
        )
        .with_spec(spec),
    )]));
    let sink = Arc::new(RecordingSink::new());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    interp.register_logger(LOGGER_NAME, sink.clone());

    let err = interp
        .call_static("Latch", "release", vec![Value::Int(-3)])
        .unwrap_err();
    assert_eq!(thrown(&err), "IllegalStateException");
    assert!(sink.records().is_empty());
}

/// `turn(x, mode)` under `@may_throw IllegalStateException | x == 1` and
/// `@throws ArithmeticException | x == 1`; mode 0 throws the guaranteed
/// ArithmeticException, mode 1 a NullPointerException.
fn valve() -> Program {
    let x_is_one = || Expr::eq(Expr::name("x"), Expr::int(1));
    let throw_when = |mode: i64, class: &str| {
        Stmt::if_then(
            Expr::eq(Expr::name("mode"), Expr::int(mode)),
            vec![Stmt::throw(Expr::new_object(class, vec![Expr::string("jam")]))],
        )
    };
    let spec = ContractSpecification::new()
        .may_throw(ExceptionClause::new("IllegalStateException", x_is_one()))
        .throws(ExceptionClause::new("ArithmeticException", x_is_one()));
    program(vec![ClassDecl::new("Valve").method(
        MethodDecl::method(
            "turn",
            Modifiers::public().with_static(),
            vec![int_param("x"), int_param("mode")],
            Type::Void,
            vec![
                throw_when(0, "ArithmeticException"),
                throw_when(1, "NullPointerException"),
            ],
        )
        .with_spec(spec),
    )])
}

#[test]
fn holding_may_throw_of_another_type_logs_a_notice() {
    let p = compile(&valve());
    let sink = Arc::new(RecordingSink::new());
    let mut interp = interpreter(&p, InterpreterConfig::default());
    interp.register_logger(LOGGER_NAME, sink.clone());

    // The @throws guarantee is met, but the holding @may_throw names another type.
    let err = interp
        .call_static("Valve", "turn", vec![Value::Int(1), Value::Int(0)])
        .unwrap_err();
    assert_eq!(thrown(&err), "ArithmeticException");
    assert_eq!(violation(&err), None);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, EXCEPTION_NOT_SPECIFIED);

    // Matched by nothing: still a single notice, and the guarantee is broken.
    let err = interp
        .call_static("Valve", "turn", vec![Value::Int(1), Value::Int(1)])
        .unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::UnsatisfiedThrows));
    assert_eq!(sink.records().len(), 2);
}

// ---------------------------------------------------------------------------
// Effect clauses
// ---------------------------------------------------------------------------

fn account() -> ClassDecl {
    let balance = || Expr::name("balance");
    let deposit_into = |target: Expr| {
        Stmt::expr(Expr::call(target, "deposit", vec![Expr::name("n")]))
    };
    ClassDecl::new("Account")
        .field(FieldDecl::new("balance", Type::Int, Modifiers::private()))
        .method(
            void_method(
                "deposit",
                vec![int_param("n")],
                vec![Stmt::assign(
                    balance(),
                    bin(BinaryOp::Add, balance(), Expr::name("n")),
                )],
            )
            .with_spec(ContractSpecification::new().mutates(Expr::this())),
        )
        .method(
            void_method(
                "peek",
                vec![],
                vec![Stmt::assign(balance(), Expr::int(-1))],
            )
            .with_spec(ContractSpecification::new().inspects(Expr::this())),
        )
        .method(
            void_method(
                "pushTo",
                vec![Param::new("other", Type::class("Account")), int_param("n")],
                vec![deposit_into(Expr::name("other"))],
            )
            .with_spec(ContractSpecification::new().mutates(Expr::this())),
        )
        .method(
            void_method(
                "transferTo",
                vec![Param::new("other", Type::class("Account")), int_param("n")],
                vec![deposit_into(Expr::name("other"))],
            )
            .with_spec(
                ContractSpecification::new()
                    .mutates(Expr::this())
                    .mutates(Expr::name("other")),
            ),
        )
}

#[test]
fn inspecting_routine_cannot_write() {
    let p = compile(&program(vec![account()]));
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let a = interp.instantiate("Account", vec![]).unwrap();
    let err = interp.call_method(&a, "peek", vec![]).unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Permission));
    assert_eq!(int_of(&interp, &a, "balance"), Some(0));
    assert_eq!(interp.effects().depth(), 0);
}

#[test]
fn callee_effects_must_be_covered_by_the_caller() {
    let p = compile(&program(vec![account()]));
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let a = interp.instantiate("Account", vec![]).unwrap();
    let b = interp.instantiate("Account", vec![]).unwrap();

    let err = interp
        .call_method(&a, "pushTo", vec![b.clone(), Value::Int(5)])
        .unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Permission));
    assert_eq!(int_of(&interp, &b, "balance"), Some(0));

    interp
        .call_method(&a, "transferTo", vec![b.clone(), Value::Int(5)])
        .unwrap();
    assert_eq!(int_of(&interp, &b, "balance"), Some(5));
}

#[test]
fn effect_checks_can_be_switched_off() {
    let p = compile(&program(vec![account()]));
    let config = InterpreterConfig {
        check_effects: false,
        ..InterpreterConfig::default()
    };
    let mut interp = interpreter(&p, config);
    let a = interp.instantiate("Account", vec![]).unwrap();
    interp.call_method(&a, "peek", vec![]).unwrap();
    assert_eq!(int_of(&interp, &a, "balance"), Some(-1));
}

/// Two linked objects, optionally declared peers through `partner`.
fn linked(class: &str, peers: bool) -> ClassDecl {
    let mut decl = ClassDecl::new(class)
        .field(FieldDecl::new("partner", Type::class(class), Modifiers::public()))
        .field(FieldDecl::new("value", Type::Int, Modifiers::private()))
        .method(void_method(
            "link",
            vec![Param::new("p", Type::class(class))],
            vec![Stmt::assign(Expr::name("partner"), Expr::name("p"))],
        ))
        .method(
            void_method(
                "touch",
                vec![],
                vec![Stmt::assign(
                    Expr::field(Expr::name("partner"), "value"),
                    Expr::int(1),
                )],
            )
            .with_spec(ContractSpecification::new().mutates(Expr::this())),
        );
    if peers {
        decl = decl.peer_field("partner");
    }
    decl
}

#[test]
fn permission_extends_to_peers_across_cycles() {
    let p = compile(&program(vec![linked("Pair", true), linked("Stranger", false)]));
    let mut interp = interpreter(&p, InterpreterConfig::default());

    let a = interp.instantiate("Pair", vec![]).unwrap();
    let b = interp.instantiate("Pair", vec![]).unwrap();
    interp.call_method(&a, "link", vec![b.clone()]).unwrap();
    interp.call_method(&b, "link", vec![a.clone()]).unwrap();
    interp.call_method(&a, "touch", vec![]).unwrap();
    assert_eq!(int_of(&interp, &b, "value"), Some(1));

    let c = interp.instantiate("Stranger", vec![]).unwrap();
    let d = interp.instantiate("Stranger", vec![]).unwrap();
    interp.call_method(&c, "link", vec![d.clone()]).unwrap();
    let err = interp.call_method(&c, "touch", vec![]).unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Permission));
}

#[test]
fn spread_clause_covers_every_element() {
    let counters = || Param::new("cs", Type::array_of(Type::class("Counter")));
    let bump_each = || {
        Stmt::for_each(
            "c",
            Expr::name("cs"),
            vec![Stmt::expr(Expr::call(Expr::name("c"), "bump", vec![]))],
        )
    };
    let p = compile(&program(vec![
        ClassDecl::new("Counter")
            .field(FieldDecl::new("count", Type::Int, Modifiers::private()))
            .method(void_method(
                "bump",
                vec![],
                vec![Stmt::expr(Expr::inc_dec(Expr::name("count"), true, false))],
            )),
        ClassDecl::new("Group")
            .method(
                MethodDecl::method(
                    "bumpAll",
                    Modifiers::public().with_static(),
                    vec![counters()],
                    Type::Void,
                    vec![bump_each()],
                )
                .with_spec(ContractSpecification::new().mutates(Expr::spread(Expr::name("cs")))),
            )
            .method(
                MethodDecl::method(
                    "bumpExtra",
                    Modifiers::public().with_static(),
                    vec![counters(), Param::new("extra", Type::class("Counter"))],
                    Type::Void,
                    vec![Stmt::expr(Expr::call(Expr::name("extra"), "bump", vec![]))],
                )
                .with_spec(ContractSpecification::new().mutates(Expr::spread(Expr::name("cs")))),
            ),
    ]));
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let first = interp.instantiate("Counter", vec![]).unwrap();
    let second = interp.instantiate("Counter", vec![]).unwrap();
    let array = Value::Array(Arc::new(ArrayObject::new(
        Type::class("Counter"),
        vec![first.clone(), second.clone()],
    )));

    interp
        .call_static("Group", "bumpAll", vec![array.clone()])
        .unwrap();
    assert_eq!(int_of(&interp, &first, "count"), Some(1));
    assert_eq!(int_of(&interp, &second, "count"), Some(1));

    let outsider = interp.instantiate("Counter", vec![]).unwrap();
    let err = interp
        .call_static("Group", "bumpExtra", vec![array, outsider.clone()])
        .unwrap_err();
    assert_eq!(violation(&err), Some(ViolationKind::Permission));
    assert_eq!(int_of(&interp, &outsider, "count"), Some(0));
}

#[test]
fn spread_collection_rewritten_during_iteration() {
    // The loop overwrites cs[1] with cs[0] on its first pass; iteration still
    // visits the elements the array held when the loop started.
    let p = compile(&program(vec![
        ClassDecl::new("Counter")
            .field(FieldDecl::new("count", Type::Int, Modifiers::private()))
            .method(void_method(
                "bump",
                vec![],
                vec![Stmt::expr(Expr::inc_dec(Expr::name("count"), true, false))],
            )),
        ClassDecl::new("Group").method(
            MethodDecl::method(
                "collapse",
                Modifiers::public().with_static(),
                vec![Param::new("cs", Type::array_of(Type::class("Counter")))],
                Type::Void,
                vec![Stmt::for_each(
                    "c",
                    Expr::name("cs"),
                    vec![
                        Stmt::assign(
                            Expr::index(Expr::name("cs"), Expr::int(1)),
                            Expr::index(Expr::name("cs"), Expr::int(0)),
                        ),
                        Stmt::expr(Expr::call(Expr::name("c"), "bump", vec![])),
                    ],
                )],
            )
            .with_spec(ContractSpecification::new().mutates(Expr::spread(Expr::name("cs")))),
        ),
    ]));
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let first = interp.instantiate("Counter", vec![]).unwrap();
    let second = interp.instantiate("Counter", vec![]).unwrap();
    let array = Value::Array(Arc::new(ArrayObject::new(
        Type::class("Counter"),
        vec![first.clone(), second.clone()],
    )));

    interp.call_static("Group", "collapse", vec![array]).unwrap();
    assert_eq!(int_of(&interp, &first, "count"), Some(1));
    assert_eq!(int_of(&interp, &second, "count"), Some(1));
}

#[test]
fn objects_created_inside_a_frame_are_mutable_there() {
    // build() mutates nothing it was given, but may write the object it creates.
    let p = compile(&program(vec![
        ClassDecl::new("Cell")
            .field(FieldDecl::new("v", Type::Int, Modifiers::private()))
            .method(void_method(
                "set",
                vec![int_param("x")],
                vec![Stmt::assign(Expr::name("v"), Expr::name("x"))],
            )),
        ClassDecl::new("Factory").method(
            MethodDecl::method(
                "build",
                Modifiers::public(),
                vec![],
                Type::class("Cell"),
                vec![
                    Stmt::local("c", None, Some(Expr::new_object("Cell", vec![]))),
                    Stmt::expr(Expr::call(Expr::name("c"), "set", vec![Expr::int(9)])),
                    Stmt::ret(Some(Expr::name("c"))),
                ],
            )
            .with_spec(ContractSpecification::new().inspects(Expr::this())),
        ),
    ]));
    let mut interp = interpreter(&p, InterpreterConfig::default());
    let factory = interp.instantiate("Factory", vec![]).unwrap();
    let cell = interp.call_method(&factory, "build", vec![]).unwrap();
    assert_eq!(int_of(&interp, &cell, "v"), Some(9));
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

#[test]
fn clause_exposing_private_state_excludes_the_class() {
    let p = program(vec![ClassDecl::new("Vault")
        .field(FieldDecl::new("secret", Type::Int, Modifiers::private()))
        .method(
            void_method("open", vec![], vec![]).with_spec(
                ContractSpecification::new()
                    .pre(bin(BinaryOp::Gt, Expr::name("secret"), Expr::int(0))),
            ),
        )]);
    let result = ContractCompiler::default().compile(&p);
    assert!(!result.is_clean());
    assert!(result.program.class("Vault").is_none());
    assert!(result
        .errors()
        .any(|e| matches!(e, ContractError::FieldNotVisible { field, .. } if field == "secret")));
}

#[test]
fn options_without_invariants_skip_the_helper() {
    let compiler = ContractCompiler::new(CompileOptions {
        check_invariants: false,
        effect_frames: true,
    });
    let result = compiler.compile(&game_character());
    assert!(result.is_clean());
    let class = result.program.class("GameCharacter").unwrap();
    assert!(class.methods.iter().all(|m| !m.name.ends_with("$invariants")));

    let mut interp = interpreter(&result.program, InterpreterConfig::default());
    let hero = interp.instantiate("GameCharacter", vec![Value::Int(100)]).unwrap();
    interp
        .call_method(&hero, "takeDamage", vec![Value::Int(150)])
        .unwrap();
    assert_eq!(int_of(&interp, &hero, "health"), Some(-50));
}
