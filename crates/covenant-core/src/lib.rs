pub mod ast;
pub mod contract;
pub mod display;
pub mod error;
pub mod program;
pub mod span;
pub mod types;

// Re-export commonly used types
pub use ast::{
    BinaryOp, CatchClause, ConstructorTarget, Expr, ExprKind, Intrinsic, LambdaBody, Literal, Node,
    Param, ScopeKind, Stmt, StmtKind, UnaryOp,
};
pub use contract::{ContractSpecification, ExceptionClause};
pub use error::CoreError;
pub use program::{ClassDecl, FieldDecl, MethodDecl, Program, RoutineKind};
pub use span::Span;
pub use types::{Access, Modifiers, Type};
