//! # absint Prelude
//!
//! A curated selection of the most frequently used types from across the library,
//! allowing for convenient glob imports when wiring up an analysis.
//!
//! # Example
//!
//! ```rust
//! use absint::prelude::*;
//!
//! let driver = Driver::new(Program::new(), IntervalAnalysis);
//! assert_eq!(driver.analyses_performed(), 0);
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all analysis operations
pub use crate::Error;

/// The result type used throughout the library
pub use crate::Result;

// ================================================================================================
// IR Construction
// ================================================================================================

/// Identifiers, instruction kinds, and the graph/program builders
pub use crate::ir::{
    AnalyzeAll, BasicBlock, BinaryOp, BlockEdge, BlockId, CompareOp, EdgeKind, MethodFilter,
    NodeId, NodeKind, PhiOperand, ProcedureGraph, ProcedureId, Program,
};

// ================================================================================================
// Domains
// ================================================================================================

/// The lattice trait every analysis domain implements
pub use crate::domain::AbstractDomain;

/// The provided interval and resource domains
pub use crate::domain::{Interval, ResourceFlags, ResourceModel, ResourceState};

// ================================================================================================
// Analysis Machinery
// ================================================================================================

/// Per-node abstract state storage
pub use crate::state::StateMap;

/// Weak topological ordering of control flow
pub use crate::wto::{WeakTopologicalOrder, WtoComponent, WtoCycle};

/// Node interpreters and the provided analyses
pub use crate::interp::{
    IntervalAnalysis, IntervalInterpreter, NodeInterpreter, ResourceAnalysis, ResourceInterpreter,
};

/// Fixpoint iteration
pub use crate::fixpoint::{FixpointConfig, FixpointIterator};

// ================================================================================================
// Interprocedural Driver
// ================================================================================================

/// Invoke handling, summaries, and the parallel driver
pub use crate::interproc::{
    Analysis, Driver, InvokeHandler, InvokePolicy, OpaqueInvokes, RootOutcome, Summary,
    SummaryCache,
};
