//! Resource-pair counting domain.
//!
//! Tracks how many resources a procedure currently holds open (constructor invoked,
//! matching destructor not yet invoked) as a non-negative count range, plus a small flag
//! set describing effects that matter to callers - most importantly whether a resource
//! is handed back through the return value.
//!
//! Which callees count as constructors or destructors is supplied externally through a
//! [`ResourceModel`]; the domain itself is agnostic of procedure identity.
//!
//! # Lattice Structure
//!
//! The open count is an [`Interval`] restricted to `[0, +∞]`, so the domain inherits the
//! interval domain's unbounded ascending chains and its widening operator (a loop that
//! acquires on every iteration widens to an unbounded open count). Flags join by union
//! and meet by intersection.

use std::collections::HashSet;
use std::fmt;

use bitflags::bitflags;

use crate::domain::{AbstractDomain, Interval};
use crate::ir::ProcedureId;

bitflags! {
    /// Effect flags accumulated alongside the open count.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceFlags: u8 {
        /// The procedure may return a still-open resource to its caller.
        const RETURNS_RESOURCE = 0x01;
        /// A path exists on which the open count at a return exceeds zero without the
        /// resource being returned.
        const MAY_LEAK = 0x02;
    }
}

/// Classification of callees as resource constructors or destructors.
///
/// Owned by the host; the resource interpreter consults it on every invoke.
#[derive(Debug, Clone, Default)]
pub struct ResourceModel {
    constructors: HashSet<ProcedureId>,
    destructors: HashSet<ProcedureId>,
}

impl ResourceModel {
    /// Creates an empty model: no callee acquires or releases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a callee as a resource constructor.
    pub fn add_constructor(&mut self, procedure: ProcedureId) {
        self.constructors.insert(procedure);
    }

    /// Marks a callee as a resource destructor.
    pub fn add_destructor(&mut self, procedure: ProcedureId) {
        self.destructors.insert(procedure);
    }

    /// Returns `true` if the callee acquires a resource.
    #[must_use]
    pub fn is_constructor(&self, procedure: ProcedureId) -> bool {
        self.constructors.contains(&procedure)
    }

    /// Returns `true` if the callee releases a resource.
    #[must_use]
    pub fn is_destructor(&self, procedure: ProcedureId) -> bool {
        self.destructors.contains(&procedure)
    }
}

/// The abstract state of the resource-pair domain: an open-count range and effect flags.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ResourceState {
    open: Interval,
    flags: ResourceFlags,
}

impl ResourceState {
    /// The state at procedure entry: nothing open, no effects.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            open: Interval::constant(0),
            flags: ResourceFlags::empty(),
        }
    }

    /// The range of resources currently held open.
    #[must_use]
    pub const fn open(&self) -> Interval {
        self.open
    }

    /// The accumulated effect flags.
    #[must_use]
    pub const fn flags(&self) -> ResourceFlags {
        self.flags
    }

    /// Returns the state after a constructor invoke: open count incremented.
    #[must_use]
    pub fn acquire(&self) -> Self {
        Self {
            open: self.open.add(&Interval::constant(1)),
            flags: self.flags,
        }
    }

    /// Returns the state after a destructor invoke: open count decremented, floored at
    /// zero (releasing more than was acquired is the host's bug, not an underflow here).
    #[must_use]
    pub fn release(&self) -> Self {
        let lo = self.open.lo().saturating_sub(1).max(0);
        let hi = if self.open.hi() == i64::MAX {
            i64::MAX
        } else {
            self.open.hi().saturating_sub(1).max(0)
        };
        Self {
            open: Interval::new(lo, hi),
            flags: self.flags,
        }
    }

    /// Returns the state with the given flags additionally set.
    #[must_use]
    pub fn with_flags(&self, flags: ResourceFlags) -> Self {
        Self {
            open: self.open,
            flags: self.flags | flags,
        }
    }

    /// Returns `true` if any path reaches this point with a resource still open.
    #[must_use]
    pub fn may_hold_open(&self) -> bool {
        !self.open.is_empty() && self.open.hi() > 0
    }

    /// Returns `true` if the procedure may return a still-open resource.
    #[must_use]
    pub const fn returns_resource(&self) -> bool {
        self.flags.contains(ResourceFlags::RETURNS_RESOURCE)
    }
}

impl AbstractDomain for ResourceState {
    // Open counts grow without bound in acquiring loops.
    const FINITE_HEIGHT: bool = false;
    const HAS_WIDENING: bool = true;

    fn bottom() -> Self {
        Self {
            open: Interval::BOTTOM,
            flags: ResourceFlags::empty(),
        }
    }

    fn top() -> Self {
        Self {
            open: Interval::at_least(0),
            flags: ResourceFlags::all(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        if self.open.is_empty() && self.flags.is_empty() {
            return *other;
        }
        if other.open.is_empty() && other.flags.is_empty() {
            return *self;
        }
        Self {
            open: self.open.join(&other.open),
            flags: self.flags | other.flags,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self {
            open: self.open.meet(&other.open),
            flags: self.flags & other.flags,
        }
    }

    fn widen(&self, next: &Self) -> Self {
        Self {
            open: self.open.widen(&next.open),
            flags: self.flags | next.flags,
        }
    }

    fn is_bottom(&self) -> bool {
        self.open.is_empty() && self.flags.is_empty()
    }
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::bottom()
    }
}

impl fmt::Debug for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceState(open={}, flags={:?})", self.open, self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_laws() {
        let a = ResourceState::initial().acquire();
        let b = ResourceState::initial().with_flags(ResourceFlags::RETURNS_RESOURCE);

        assert_eq!(a.join(&b), b.join(&a));
        assert_eq!(a.join(&a), a);
        assert_eq!(ResourceState::bottom().join(&a), a);
    }

    #[test]
    fn test_acquire_release_counting() {
        let state = ResourceState::initial().acquire().acquire();
        assert_eq!(state.open(), Interval::constant(2));

        let state = state.release();
        assert_eq!(state.open(), Interval::constant(1));
        assert!(state.may_hold_open());

        // Releasing below zero floors rather than underflows.
        let drained = state.release().release();
        assert_eq!(drained.open(), Interval::constant(0));
        assert!(!drained.may_hold_open());
    }

    #[test]
    fn test_join_merges_counts_and_flags() {
        let acquired = ResourceState::initial().acquire();
        let clean = ResourceState::initial();
        let merged = acquired.join(&clean);

        assert_eq!(merged.open(), Interval::new(0, 1));
        assert!(merged.may_hold_open());

        let flagged = clean.with_flags(ResourceFlags::RETURNS_RESOURCE);
        assert!(merged.join(&flagged).returns_resource());
    }

    #[test]
    fn test_widen_unbounded_acquire() {
        let mut state = ResourceState::initial();
        let mut widened = state;
        for _ in 0..3 {
            state = state.join(&state.acquire());
            widened = widened.widen(&state);
        }
        assert_eq!(widened.open().hi(), i64::MAX);
        assert_eq!(widened.open().lo(), 0);
        assert_eq!(widened.widen(&widened), widened);
    }

    #[test]
    fn test_resource_model() {
        let ctor = ProcedureId::new(1);
        let dtor = ProcedureId::new(2);
        let mut model = ResourceModel::new();
        model.add_constructor(ctor);
        model.add_destructor(dtor);

        assert!(model.is_constructor(ctor));
        assert!(!model.is_constructor(dtor));
        assert!(model.is_destructor(dtor));
    }
}
