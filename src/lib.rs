// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # absint
//!
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](LICENSE-APACHE)
//!
//! An interprocedural abstract-interpretation engine: pluggable lattice domains, weak
//! topological ordering of control flow, fixpoint iteration with widening, branch
//! condition narrowing, and memoized procedure summaries.
//!
//! The engine consumes a host-supplied IR - procedures as reducible control flow graphs
//! of typed instruction nodes - and computes, for every node, a sound abstract pre- and
//! postcondition. Soundness and termination are the contract; precision is
//! best-effort.
//!
//! ## Features
//!
//! - **Pluggable domains** - any lattice implementing [`AbstractDomain`](domain::AbstractDomain)
//!   plugs in; [`Interval`](domain::Interval) and [`ResourceState`](domain::ResourceState)
//!   ship in the box
//! - **Bourdoncle ordering** - cyclic CFGs are linearized into a
//!   [`WeakTopologicalOrder`](wto::WeakTopologicalOrder) so only loop bodies are ever
//!   re-iterated
//! - **Guaranteed termination** - plain joins up to a configurable threshold, widening
//!   beyond it, and hard round/step budgets behind that
//! - **Branch narrowing** - conditional edges refine the flowing state with the branch
//!   condition or its logical inverse
//! - **Procedure summaries** - callees are analyzed once per argument generality and
//!   memoized in a concurrent cache; call sites subsumed by a cached summary reuse it
//!   without re-analysis
//! - **Parallel roots** - independent root procedures are dispatched on a rayon worker
//!   pool sharing only the summary cache
//!
//! ## Quick Start
//!
//! ```rust
//! use absint::prelude::*;
//!
//! // return 5 + 3;
//! let mut graph = ProcedureGraph::new();
//! let block = graph.add_block();
//! let five = graph.add_node(block, NodeKind::Constant(5));
//! let three = graph.add_node(block, NodeKind::Constant(3));
//! let sum = graph.add_node(block, NodeKind::Binary {
//!     op: BinaryOp::Add,
//!     lhs: five,
//!     rhs: three,
//! });
//! graph.add_node(block, NodeKind::Return { value: Some(sum) });
//!
//! let mut program = Program::new();
//! let main = program.register("main", graph);
//!
//! let driver = Driver::new(program, IntervalAnalysis);
//! let outcome = driver.analyze_root(main);
//! let summary = outcome.summary().expect("analysis completed");
//! assert_eq!(*summary.postcondition(), Interval::constant(8));
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - the arena-indexed IR the engine consumes and tests build
//! - [`domain`] - the [`AbstractDomain`](domain::AbstractDomain) trait and the provided
//!   interval and resource domains
//! - [`state`] - per-node abstract state storage for one procedure run
//! - [`wto`] - Bourdoncle's weak topological ordering with reducibility validation
//! - [`interp`] - node interpreters: one transfer rule per instruction kind
//! - [`fixpoint`] - the iterator driving a procedure's states to a fixpoint
//! - [`interproc`] - invoke handling, summaries, and the parallel driver
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Defects are separated
//! from expected gaps: an irreducible CFG, a domain without a usable termination
//! guarantee, or an exhausted budget is an [`Error`]; a callee without a body or a
//! recursive call cut-off is logged and analyzed opaquely, never an error.

pub(crate) mod error;

pub mod domain;
pub mod fixpoint;
pub mod interp;
pub mod interproc;
pub mod ir;
pub mod state;
pub mod wto;

/// Convenient re-exports of the most commonly used types and traits.
pub mod prelude;

pub use error::Error;

/// The result type used throughout this library.
pub type Result<T> = core::result::Result<T, Error>;
