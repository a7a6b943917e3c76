//! # Fact Graph Query Engine
//!
//! A graph-pattern query engine over a triple-style fact store, coupled
//! with a reactive trigger mechanism that re-derives facts when
//! dependent data arrives. Facts flow: `row → facts (external) → store →
//! triggered by fact → parse → compile → solve → evaluate → function
//! call → new facts → store`.
//!
//! ## Pipeline
//!
//! ```text
//! Cypher-subset query string
//!     ↓
//! [Parser]              → Cypher AST
//!     ↓
//! [CNF compiler]         → CnfProblem (pattern candidates + constraints)
//!     ↓
//! [SAT solver]           → one Projection per pattern match
//!     ↓
//! [Evaluator]            → WITH/WHERE/RETURN over the projection stream
//!     ↓
//! ProjectionList
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use factgraph::config::Config;
//! use factgraph::engine::FactEngine;
//! use factgraph::fact::Fact;
//! use factgraph::store::{kv::MemoryKvStore, FactStore};
//! use std::sync::Arc;
//!
//! let store = FactStore::new(Arc::new(MemoryKvStore::new()));
//! let engine = FactEngine::new(store, &Config::default());
//!
//! engine.insert_fact(Fact::NodeHasLabel { node_id: "n1".into(), label: "City".into() })?;
//! let rows = engine.execute_query("MATCH (c:City) RETURN c", Default::default())?;
//! # Ok::<(), factgraph::error::EngineError>(())
//! ```

pub mod ast;
pub mod cnf;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod fact;
pub mod logging;
pub mod parser;
pub mod queue;
pub mod solver;
pub mod store;
pub mod trigger;
pub mod value;

pub use config::Config;
pub use engine::FactEngine;
pub use error::{EngineError, EngineResult};
pub use fact::Fact;
pub use value::Scalar;
