//! The intermediate representation the engine consumes.
//!
//! This module models the inputs the surrounding compiler supplies: per-procedure control
//! flow graphs of typed instruction nodes, a program-level graph cache, and the method
//! filter bounding analysis scope. The engine itself only reads these structures; they
//! are built once by the host (or by tests) and then shared.
//!
//! # Arena Indexing
//!
//! Blocks and nodes are stored in flat vectors and referenced by integer-index newtypes
//! ([`BlockId`], [`NodeId`]), never by owning pointers. Abstract state lives in a side
//! table keyed by the same indices ([`StateMap`](crate::state::StateMap)), which avoids
//! ownership cycles between nodes, blocks, and analysis results entirely.
//!
//! # Modules
//!
//! - `node` - Node identity, operators, and the closed [`NodeKind`] vocabulary
//! - `block` - Basic blocks and control flow edge kinds
//! - `graph` - The per-procedure [`ProcedureGraph`] arena
//! - `program` - Procedure identity, graph cache, and [`MethodFilter`]

mod block;
mod graph;
mod node;
mod program;

pub use block::{BasicBlock, BlockEdge, BlockId, EdgeKind};
pub use graph::{Node, ProcedureGraph};
pub use node::{BinaryOp, CompareOp, NodeId, NodeKind, PhiOperand};
pub use program::{AnalyzeAll, MethodFilter, ProcedureId, Program};
