//! Abstract domains: the lattice types analyses compute over.
//!
//! An abstract domain is a lattice of approximate program-state values. The fixpoint
//! iterator merges values at control flow joins with [`AbstractDomain::join`], narrows
//! them across branch edges with [`AbstractDomain::meet`], and forces convergence on
//! infinite-height domains with [`AbstractDomain::widen`].
//!
//! # Lattice Laws
//!
//! Soundness of the whole engine rests on the lattice laws holding for every domain:
//!
//! - **Idempotent**: `x.join(x) = x`
//! - **Commutative**: `x.join(y) = y.join(x)`
//! - **Associative**: `x.join(y.join(z)) = (x.join(y)).join(z)`
//! - **Identity**: `bottom.join(x) = x`
//!
//! and symmetrically for `meet` with `top` as its identity. These are exercised by the
//! unit tests of each domain in this module.
//!
//! # Termination Contract
//!
//! A domain with finitely many strictly-ascending steps ([`AbstractDomain::FINITE_HEIGHT`])
//! terminates under plain joins. A domain without that property **must** supply a widening
//! operator and declare it via [`AbstractDomain::HAS_WIDENING`]; the fixpoint iterator
//! rejects the combination `FINITE_HEIGHT == false, HAS_WIDENING == false` at construction
//! time with [`Error::DomainContract`](crate::Error::DomainContract) instead of looping
//! forever.
//!
//! # Provided Domains
//!
//! - [`interval`] - Integer intervals with saturating arithmetic and branch narrowing
//! - [`resource`] - Resource-pair counting with open-count ranges and summary flags

use std::fmt::Debug;

pub mod interval;
pub mod resource;

pub use interval::Interval;
pub use resource::{ResourceFlags, ResourceModel, ResourceState};

/// A lattice element usable as the value type of an analysis.
///
/// Implementations must uphold the lattice laws documented at the module level; `join`
/// and `meet` must additionally be monotone in both arguments.
pub trait AbstractDomain: Clone + Debug + PartialEq + Send + Sync {
    /// Whether every ascending chain in this domain is finite.
    ///
    /// When `false`, [`HAS_WIDENING`](Self::HAS_WIDENING) must be `true`.
    const FINITE_HEIGHT: bool;

    /// Whether [`widen`](Self::widen) guarantees stabilization of ascending chains.
    ///
    /// The default `widen` implementation is a plain join, which is only sound to rely
    /// on for finite-height domains; implementations overriding `widen` with a real
    /// extrapolation set this to `true`.
    const HAS_WIDENING: bool;

    /// The least element: the join identity, representing "unreachable / no value yet".
    #[must_use]
    fn bottom() -> Self;

    /// The greatest element: the meet identity, representing "no information".
    #[must_use]
    fn top() -> Self;

    /// Least upper bound: the least specific value covering both inputs.
    ///
    /// Used to merge predecessor states at control flow joins and loop back edges.
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound: the most specific value implied by both inputs.
    ///
    /// Used for branch condition narrowing and precondition intersection.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;

    /// Extrapolates from `self` (the previous round) towards `next` (the current round)
    /// such that repeated application stabilizes in finitely many steps.
    ///
    /// The default is a plain join; infinite-height domains must override this and set
    /// [`HAS_WIDENING`](Self::HAS_WIDENING).
    #[must_use]
    fn widen(&self, next: &Self) -> Self {
        self.join(next)
    }

    /// Returns `true` if this is the bottom element.
    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }

    /// Returns `true` if this is the top element.
    fn is_top(&self) -> bool {
        *self == Self::top()
    }

    /// The lattice partial order: `self ≤ other` iff `self.join(other) == other`.
    ///
    /// Summary subsumption and the monotone-convergence property are both phrased in
    /// terms of this relation.
    fn le(&self, other: &Self) -> bool {
        &self.join(other) == other
    }
}
