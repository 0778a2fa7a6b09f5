//! Resource-pair state analysis.
//!
//! Threads a [`ResourceState`] through each procedure: constructor invokes raise the
//! open count, destructor invokes lower it, and every return checks whether a resource
//! is still open - either handed back to the caller (`RETURNS_RESOURCE`) or lost
//! (`MAY_LEAK`).
//!
//! Unlike the interval analysis this is a pure state analysis: most nodes pass the
//! state through unchanged and only invokes have an effect, so the interpreter
//! overrides [`flow_after`](NodeInterpreter::flow_after) to flow the *post*condition of
//! an invoke onward.
//!
//! Which values are resources is tracked syntactically: a constructor invoke produces a
//! resource value, a non-model callee whose summary says `RETURNS_RESOURCE` produces
//! one, and a phi over resource values is one.

use std::collections::HashSet;

use crate::domain::{AbstractDomain, ResourceFlags, ResourceModel, ResourceState};
use crate::interp::NodeInterpreter;
use crate::interproc::{Analysis, InvokeHandler};
use crate::ir::{BlockEdge, NodeId, NodeKind, ProcedureGraph};
use crate::state::StateMap;
use crate::Result;

/// Interprets one procedure over the [`ResourceState`] domain.
pub struct ResourceInterpreter<H> {
    model: ResourceModel,
    invokes: H,
    /// Nodes whose value carries a still-open resource.
    resource_values: HashSet<NodeId>,
}

impl<H: InvokeHandler<ResourceState>> ResourceInterpreter<H> {
    /// Creates an interpreter with the given constructor/destructor classification.
    pub fn new(model: ResourceModel, invokes: H) -> Self {
        Self {
            model,
            invokes,
            resource_values: HashSet::new(),
        }
    }
}

impl<H: InvokeHandler<ResourceState>> NodeInterpreter for ResourceInterpreter<H> {
    type Domain = ResourceState;

    fn transfer_node(
        &mut self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &mut StateMap<ResourceState>,
    ) -> Result<()> {
        if states.is_visited(node) {
            return Ok(());
        }
        states.mark_visited(node);

        let computed = match graph.node_kind(node)?.clone() {
            // Value computation has no resource effect; the state threads past.
            NodeKind::Constant(_)
            | NodeKind::Parameter(_)
            | NodeKind::Binary { .. }
            | NodeKind::Compare { .. }
            | NodeKind::FrameState
            | NodeKind::LoopBegin
            | NodeKind::Branch { .. } => *states.pre(node),
            NodeKind::Phi { operands } => {
                if operands
                    .iter()
                    .any(|operand| self.resource_values.contains(&operand.value))
                {
                    self.resource_values.insert(node);
                }
                *states.pre(node)
            }
            NodeKind::Invoke { callee, arguments } => {
                let pre = *states.pre(node);
                if self.model.is_constructor(callee) {
                    self.resource_values.insert(node);
                    pre.acquire()
                } else if self.model.is_destructor(callee) {
                    pre.release()
                } else {
                    let actuals: Vec<ResourceState> = arguments
                        .iter()
                        .map(|&argument| *states.post(argument))
                        .collect();
                    let effect = self.invokes.invoke(callee, &actuals)?;
                    let mut after = pre;
                    if effect.returns_resource() {
                        // The callee hands an open resource back: the caller now
                        // holds it, exactly as if it had invoked the constructor.
                        self.resource_values.insert(node);
                        after = after.acquire();
                    }
                    after.with_flags(effect.flags() & ResourceFlags::MAY_LEAK)
                }
            }
            NodeKind::Return { value } => {
                let pre = *states.pre(node);
                if !pre.may_hold_open() {
                    pre
                } else if value.is_some_and(|value| self.resource_values.contains(&value)) {
                    pre.with_flags(ResourceFlags::RETURNS_RESOURCE)
                } else {
                    pre.with_flags(ResourceFlags::MAY_LEAK)
                }
            }
            NodeKind::Opaque => {
                log::warn!("no resource transfer rule for opaque node {node}, passing state through");
                states.pre(node).join(states.post(node))
            }
        };

        let updated = states.post(node).join(&computed);
        states.set_post(node, updated);
        Ok(())
    }

    fn transfer_edge(
        &mut self,
        graph: &ProcedureGraph,
        edge: &BlockEdge,
        states: &mut StateMap<ResourceState>,
    ) -> Result<()> {
        // No comparison narrowing in this domain; every edge kind flows the same state.
        // A source block without nodes forwards its merged entry state unchanged.
        let source = graph.block(edge.source)?;
        let flow = match source.terminator_node() {
            Some(terminator) => self.flow_after(graph, terminator, states)?,
            None => *states.block_entry(edge.source),
        };
        states.join_block_entry(edge.destination, &flow);
        Ok(())
    }

    fn flow_after(
        &self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &StateMap<ResourceState>,
    ) -> Result<ResourceState> {
        // Invokes change the state; everything else passes it through.
        match graph.node_kind(node)? {
            NodeKind::Invoke { .. } => Ok(*states.post(node)),
            _ => Ok(*states.pre(node)),
        }
    }
}

/// The resource-pair analysis, pluggable into the interprocedural driver.
#[derive(Debug, Clone, Default)]
pub struct ResourceAnalysis {
    model: ResourceModel,
}

impl ResourceAnalysis {
    /// Creates the analysis with the given constructor/destructor classification.
    #[must_use]
    pub fn new(model: ResourceModel) -> Self {
        Self { model }
    }
}

impl Analysis for ResourceAnalysis {
    type Domain = ResourceState;
    type Interp<'h>
        = ResourceInterpreter<&'h mut dyn InvokeHandler<ResourceState>>
    where
        Self: 'h;

    fn interpreter<'h>(
        &'h self,
        _arguments: Vec<ResourceState>,
        invokes: &'h mut dyn InvokeHandler<ResourceState>,
    ) -> Self::Interp<'h> {
        ResourceInterpreter::new(self.model.clone(), invokes)
    }

    fn entry_state(&self, _graph: &ProcedureGraph, _arguments: &[ResourceState]) -> ResourceState {
        ResourceState::initial()
    }
}
