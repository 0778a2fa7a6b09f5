//! Integer interval domain.
//!
//! The reference numeric domain: each value is approximated by a closed interval
//! `[lo, hi]` over `i64`, with `i64::MIN` / `i64::MAX` doubling as the -∞ / +∞
//! sentinels. Arithmetic saturates at the sentinels rather than overflowing, so a bound
//! that leaves the representable range degrades to "unbounded" instead of wrapping.
//!
//! # Lattice Structure
//!
//! - Bottom is the empty interval (no value reaches this point).
//! - Top is `[-∞, +∞]`.
//! - Join takes the enclosing hull, meet the overlap.
//! - The domain has unbounded ascending chains (`[0,0] ⊏ [0,1] ⊏ [0,2] ⊏ …`), so it
//!   supplies a widening operator: any bound that grew since the previous round jumps
//!   straight to its sentinel.
//!
//! # Branch Narrowing
//!
//! [`Interval::constraint`] converts a comparison against a bounded interval into the
//! refinement implied for the other operand: `x < [10,10]` yields `[-∞, 9]`. Only the
//! statically bounded side is used to narrow the unbounded side; the bounded side itself
//! is left unchanged, which avoids losing precision when one operand is a runtime value
//! and the other a constant.

use std::fmt;

use crate::domain::AbstractDomain;
use crate::ir::CompareOp;

/// Sentinel for an interval bound of negative infinity.
const NEG_INF: i64 = i64::MIN;
/// Sentinel for an interval bound of positive infinity.
const POS_INF: i64 = i64::MAX;

/// A closed integer interval `[lo, hi]`, the canonical numeric abstract value.
///
/// The empty interval (bottom) is represented canonically with `lo > hi` so that
/// `PartialEq` doubles as domain equality.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    lo: i64,
    hi: i64,
}

impl Interval {
    /// The interval containing every value.
    pub const TOP: Self = Self {
        lo: NEG_INF,
        hi: POS_INF,
    };

    /// The empty interval.
    pub const BOTTOM: Self = Self {
        lo: POS_INF,
        hi: NEG_INF,
    };

    /// Creates the interval `[lo, hi]`, normalizing an empty range to bottom.
    #[must_use]
    pub const fn new(lo: i64, hi: i64) -> Self {
        if lo > hi {
            Self::BOTTOM
        } else {
            Self { lo, hi }
        }
    }

    /// The exact representation of a single literal: `[value, value]`.
    #[must_use]
    pub const fn constant(value: i64) -> Self {
        Self {
            lo: value,
            hi: value,
        }
    }

    /// The interval of all values at least `lo`.
    #[must_use]
    pub const fn at_least(lo: i64) -> Self {
        Self { lo, hi: POS_INF }
    }

    /// The interval of all values at most `hi`.
    #[must_use]
    pub const fn at_most(hi: i64) -> Self {
        Self { lo: NEG_INF, hi }
    }

    /// The lower bound; `i64::MIN` encodes -∞.
    #[must_use]
    pub const fn lo(&self) -> i64 {
        self.lo
    }

    /// The upper bound; `i64::MAX` encodes +∞.
    #[must_use]
    pub const fn hi(&self) -> i64 {
        self.hi
    }

    /// Returns `true` if both bounds are finite (neither is a sentinel).
    ///
    /// This is the "statically bounded" test used by the comparison narrowing policy.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        !self.is_empty() && self.lo != NEG_INF && self.hi != POS_INF
    }

    /// Returns `true` if this is the empty interval.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    /// Returns `true` if the interval contains the given value.
    #[must_use]
    pub const fn contains(&self, value: i64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Interval addition: `[a,b] + [c,d] = [a+c, b+d]`, saturating at the sentinels.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        Self {
            lo: add_lo(self.lo, other.lo),
            hi: add_hi(self.hi, other.hi),
        }
    }

    /// Interval subtraction: `[a,b] - [c,d] = [a-d, b-c]`, saturating at the sentinels.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        Self {
            lo: sub_lo(self.lo, other.hi),
            hi: sub_hi(self.hi, other.lo),
        }
    }

    /// Interval multiplication over the bound products.
    ///
    /// Any unbounded operand degrades the result to top; the precision matters far less
    /// than for addition (loop counters), and the sentinel bookkeeping for signed
    /// infinite products is not worth carrying.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        if !self.is_bounded() || !other.is_bounded() {
            return Self::TOP;
        }
        let products = [
            self.lo.saturating_mul(other.lo),
            self.lo.saturating_mul(other.hi),
            self.hi.saturating_mul(other.lo),
            self.hi.saturating_mul(other.hi),
        ];
        let lo = products.iter().copied().min().unwrap_or(NEG_INF);
        let hi = products.iter().copied().max().unwrap_or(POS_INF);
        Self { lo, hi }
    }

    /// The refinement a comparison against `bound` implies for the other operand.
    ///
    /// For a comparison `x op bound` that is known to hold, returns the interval `x`
    /// must lie in. `bound` is the statically bounded operand; the caller leaves it
    /// unchanged and meets the returned constraint into the unbounded side.
    ///
    /// `Ne` carries no interval-representable information and yields top.
    #[must_use]
    pub fn constraint(op: CompareOp, bound: &Self) -> Self {
        if bound.is_empty() {
            return Self::BOTTOM;
        }
        match op {
            CompareOp::Lt => Self::at_most(dec_saturating(bound.hi)),
            CompareOp::Le => Self::at_most(bound.hi),
            CompareOp::Gt => Self::at_least(inc_saturating(bound.lo)),
            CompareOp::Ge => Self::at_least(bound.lo),
            CompareOp::Eq => *bound,
            CompareOp::Ne => Self::TOP,
        }
    }
}

impl AbstractDomain for Interval {
    const FINITE_HEIGHT: bool = false;
    const HAS_WIDENING: bool = true;

    fn bottom() -> Self {
        Self::BOTTOM
    }

    fn top() -> Self {
        Self::TOP
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self::new(self.lo.max(other.lo), self.hi.min(other.hi))
    }

    fn widen(&self, next: &Self) -> Self {
        if self.is_empty() {
            return *next;
        }
        if next.is_empty() {
            return *self;
        }
        // A bound that moved since the last round jumps straight to its sentinel, so
        // every ascending chain stabilizes after one widening application per bound.
        Self {
            lo: if next.lo < self.lo { NEG_INF } else { self.lo },
            hi: if next.hi > self.hi { POS_INF } else { self.hi },
        }
    }

    fn is_bottom(&self) -> bool {
        self.is_empty()
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::BOTTOM
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interval({self})")
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty");
        }
        match (self.lo, self.hi) {
            (NEG_INF, POS_INF) => write!(f, "[-inf, +inf]"),
            (NEG_INF, hi) => write!(f, "[-inf, {hi}]"),
            (lo, POS_INF) => write!(f, "[{lo}, +inf]"),
            (lo, hi) => write!(f, "[{lo}, {hi}]"),
        }
    }
}

fn add_lo(a: i64, b: i64) -> i64 {
    if a == NEG_INF || b == NEG_INF {
        NEG_INF
    } else {
        a.saturating_add(b)
    }
}

fn add_hi(a: i64, b: i64) -> i64 {
    if a == POS_INF || b == POS_INF {
        POS_INF
    } else {
        a.saturating_add(b)
    }
}

fn sub_lo(a: i64, b: i64) -> i64 {
    if a == NEG_INF || b == POS_INF {
        NEG_INF
    } else {
        a.saturating_sub(b)
    }
}

fn sub_hi(a: i64, b: i64) -> i64 {
    if a == POS_INF || b == NEG_INF {
        POS_INF
    } else {
        a.saturating_sub(b)
    }
}

const fn dec_saturating(bound: i64) -> i64 {
    if bound == POS_INF || bound == NEG_INF {
        bound
    } else {
        bound - 1
    }
}

const fn inc_saturating(bound: i64) -> i64 {
    if bound == POS_INF || bound == NEG_INF {
        bound
    } else {
        bound + 1
    }
}
