//! The interprocedural analysis driver.
//!
//! [`Driver`] owns everything one multi-procedure run needs: the [`Program`] resolving
//! call targets, the [`MethodFilter`] bounding scope, the shared [`SummaryCache`], and
//! the fixpoint budget. Roots are independent and dispatched on a rayon worker pool;
//! the summary cache is the only shared mutable resource between them.
//!
//! # Call Handling
//!
//! Under [`InvokePolicy::Summarize`], an invoke first looks for a cached summary that
//! subsumes the actual arguments. On a miss the callee is analyzed recursively from its
//! own entry, with the call stack threaded explicitly down the recursion - each root
//! analysis owns its own stack, so parallel roots never contend on it. A callee already
//! on the stack is a recursive cycle: it is cut off with an opaque (top) result and
//! logged, a documented precision loss rather than an error. Callees without a body are
//! likewise opaque.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::domain::AbstractDomain;
use crate::fixpoint::{FixpointConfig, FixpointIterator};
use crate::interproc::{Analysis, InvokeHandler, OpaqueInvokes, Summary, SummaryCache};
use crate::ir::{AnalyzeAll, MethodFilter, NodeKind, ProcedureGraph, ProcedureId, Program};
use crate::state::StateMap;
use crate::wto::WeakTopologicalOrder;
use crate::{Error, Result};

/// How the driver interprets call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokePolicy {
    /// Every call returns top; no callee is ever entered.
    Opaque,
    /// Callees are analyzed and memoized through the summary cache.
    Summarize,
}

/// The result of analyzing one root procedure.
#[derive(Debug)]
pub enum RootOutcome<D: AbstractDomain> {
    /// The configured filter excluded this root.
    Skipped,
    /// The root has no body; not an error.
    NoBody,
    /// Analysis completed; the state map holds every node's final pre-/postcondition.
    Analyzed {
        /// Completed per-node states, for downstream checkers.
        states: StateMap<D>,
        /// The summary published for this root.
        summary: Arc<Summary<D>>,
    },
    /// Analysis failed; the error is recorded per root, other roots are unaffected.
    Failed(Error),
}

impl<D: AbstractDomain> RootOutcome<D> {
    /// The completed state map, if analysis succeeded.
    #[must_use]
    pub fn states(&self) -> Option<&StateMap<D>> {
        match self {
            Self::Analyzed { states, .. } => Some(states),
            _ => None,
        }
    }

    /// The published summary, if analysis succeeded.
    #[must_use]
    pub fn summary(&self) -> Option<&Arc<Summary<D>>> {
        match self {
            Self::Analyzed { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Returns `true` if analysis completed.
    #[must_use]
    pub fn is_analyzed(&self) -> bool {
        matches!(self, Self::Analyzed { .. })
    }
}

/// Drives an [`Analysis`] across a whole [`Program`].
pub struct Driver<A: Analysis, F: MethodFilter = AnalyzeAll> {
    program: Program,
    analysis: A,
    filter: F,
    cache: SummaryCache<A::Domain>,
    config: FixpointConfig,
    policy: InvokePolicy,
    /// Procedure analyses performed, roots included. Summary hits do not count.
    analyses: AtomicUsize,
}

impl<A: Analysis> Driver<A, AnalyzeAll> {
    /// Creates a driver analyzing every procedure, summarizing call sites, with the
    /// default fixpoint budget.
    #[must_use]
    pub fn new(program: Program, analysis: A) -> Self {
        Self {
            program,
            analysis,
            filter: AnalyzeAll,
            cache: SummaryCache::new(),
            config: FixpointConfig::default(),
            policy: InvokePolicy::Summarize,
            analyses: AtomicUsize::new(0),
        }
    }
}

impl<A: Analysis, F: MethodFilter> Driver<A, F> {
    /// Replaces the method filter.
    #[must_use]
    pub fn with_filter<G: MethodFilter>(self, filter: G) -> Driver<A, G> {
        Driver {
            program: self.program,
            analysis: self.analysis,
            filter,
            cache: self.cache,
            config: self.config,
            policy: self.policy,
            analyses: self.analyses,
        }
    }

    /// Replaces the fixpoint budget.
    #[must_use]
    pub fn with_config(mut self, config: FixpointConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the invoke policy.
    #[must_use]
    pub fn with_policy(mut self, policy: InvokePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The program under analysis.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The shared summary cache, queryable by downstream tooling.
    #[must_use]
    pub fn cache(&self) -> &SummaryCache<A::Domain> {
        &self.cache
    }

    /// The number of procedure analyses performed so far, roots included.
    ///
    /// A call site answered from the summary cache performs no analysis and does not
    /// count; the difference is how summary reuse is observed.
    #[must_use]
    pub fn analyses_performed(&self) -> usize {
        self.analyses.load(Ordering::Relaxed)
    }

    /// Analyzes one root procedure.
    ///
    /// Parameters of a root have no known call site and abstract to top. Failures are
    /// folded into the returned outcome rather than propagated, so one defective root
    /// cannot abort a batch.
    pub fn analyze_root(&self, root: ProcedureId) -> RootOutcome<A::Domain> {
        if self.filter.should_skip(root) {
            return RootOutcome::Skipped;
        }
        let Some(graph) = self.program.graph(root) else {
            log::info!("root {root} has no body, nothing to analyze");
            return RootOutcome::NoBody;
        };

        let arguments = vec![A::Domain::top(); graph.parameter_count()];
        let mut stack = vec![root];
        match self.analyze_procedure(root, graph, arguments, &mut stack) {
            Ok((states, summary)) => RootOutcome::Analyzed { states, summary },
            Err(error) => {
                log::warn!("analysis of root {root} failed: {error}");
                RootOutcome::Failed(error)
            }
        }
    }

    /// Analyzes every given root, dispatching independent roots in parallel.
    ///
    /// Outcomes are returned in the order of `roots`.
    pub fn analyze_all(&self, roots: &[ProcedureId]) -> Vec<(ProcedureId, RootOutcome<A::Domain>)> {
        roots
            .par_iter()
            .map(|&root| (root, self.analyze_root(root)))
            .collect()
    }

    /// Runs the fixpoint for one procedure and publishes its summary.
    fn analyze_procedure(
        &self,
        procedure: ProcedureId,
        graph: &ProcedureGraph,
        arguments: Vec<A::Domain>,
        stack: &mut Vec<ProcedureId>,
    ) -> Result<(StateMap<A::Domain>, Arc<Summary<A::Domain>>)> {
        self.analyses.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "analyzing {procedure} ({} blocks, {} nodes, depth {})",
            graph.block_count(),
            graph.node_count(),
            stack.len(),
        );

        let wto = WeakTopologicalOrder::build(graph)?;
        let mut states = StateMap::new(graph);
        let entry_state = self.analysis.entry_state(graph, &arguments);
        states.join_block_entry(graph.entry(), &entry_state);

        let mut opaque = OpaqueInvokes;
        let mut summarizing;
        let handler: &mut dyn InvokeHandler<A::Domain> = match self.policy {
            InvokePolicy::Opaque => &mut opaque,
            InvokePolicy::Summarize => {
                summarizing = SummarizingInvokes {
                    driver: self,
                    stack,
                };
                &mut summarizing
            }
        };

        let mut interpreter = self.analysis.interpreter(arguments.clone(), handler);
        let mut fixpoint = FixpointIterator::new(self.config)?;
        fixpoint.run(graph, &wto, &mut interpreter, &mut states)?;
        drop(interpreter);

        let mut postcondition = A::Domain::bottom();
        for node in graph.node_ids() {
            if matches!(graph.node_kind(node)?, NodeKind::Return { .. }) {
                postcondition = postcondition.join(states.post(node));
            }
        }

        let summary = Arc::new(Summary::new(arguments, entry_state, postcondition));
        self.cache.insert(procedure, Arc::clone(&summary));
        Ok((states, summary))
    }
}

/// The summarizing invoke handler for one procedure run.
///
/// Borrows the driver shared state and the run's call stack; recursive callee analyses
/// construct their own instance further down with the same stack.
struct SummarizingInvokes<'d, A: Analysis, F: MethodFilter> {
    driver: &'d Driver<A, F>,
    stack: &'d mut Vec<ProcedureId>,
}

impl<A: Analysis, F: MethodFilter> InvokeHandler<A::Domain> for SummarizingInvokes<'_, A, F> {
    fn invoke(&mut self, callee: ProcedureId, arguments: &[A::Domain]) -> Result<A::Domain> {
        if let Some(summary) = self.driver.cache.lookup(callee, arguments) {
            log::debug!("summary hit for {callee}");
            return Ok(summary.postcondition().clone());
        }
        if self.driver.filter.should_skip(callee) {
            return Ok(A::Domain::top());
        }
        if self.stack.contains(&callee) {
            log::info!("recursive call to {callee} cut off with an opaque result");
            return Ok(A::Domain::top());
        }
        let Some(graph) = self.driver.program.graph(callee) else {
            log::info!("no body for {callee}, treating invoke as opaque");
            return Ok(A::Domain::top());
        };

        self.stack.push(callee);
        let result = self
            .driver
            .analyze_procedure(callee, graph, arguments.to_vec(), self.stack);
        self.stack.pop();

        let (_, summary) = result?;
        Ok(summary.postcondition().clone())
    }
}
