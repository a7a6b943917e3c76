//! # Top-level error type (§7)
//!
//! `EngineError` is the error surfaced by [`crate::engine::FactEngine`]'s
//! public methods. It unifies every lower-layer error via `#[from]` and
//! mirrors §7's taxonomy exactly: `Unsat` never appears here (an
//! unsatisfiable pattern is a zero-row result, not an error — `engine.rs`
//! matches `CompileError` directly and maps `Unsat` to an empty result
//! before a `CompileError` could ever reach this type), and a
//! `TriggerFunctionError` raised inside dispatch is logged and isolated
//! rather than propagated — it has no variant in this enum.

use crate::eval::EvalError;
use crate::parser::SyntaxError;
use crate::solver::SolveError;
use crate::store::StoreError;
use crate::trigger::TriggerError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Solve(#[from] SolveError),
}

pub type EngineResult<T> = Result<T, EngineError>;
