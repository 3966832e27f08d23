//! Clock-period divisibility, the planner's multi-rate compatibility check.
//!
//! Modeled on `timely`'s [`PartialOrder`]-style trait: a small, dedicated
//! trait for a single comparison, rather than inlining the check wherever
//! it's needed. Periods are `f64` seconds, so divisibility is checked up to
//! a relative tolerance rather than by exact integer remainder.

/// Relative tolerance used when checking that one period divides another.
///
/// Clock periods arrive as `f64` seconds (e.g. `1.0 / 60.0`), so an exact
/// `%` check would reject legitimate ratios to floating-point rounding.
const RATIO_EPSILON: f64 = 1e-9;

/// A pair of periods where one evenly divides the other (spec.md §3
/// invariant 3: `A.T mod B.T == 0` or `B.T mod A.T == 0`).
pub trait Divides<Rhs = Self> {
    /// `true` if `self` and `other` are compatible clock periods: one is an
    /// integer multiple of the other, within [`RATIO_EPSILON`].
    fn divides(&self, other: &Rhs) -> bool;
}

impl Divides for f64 {
    fn divides(&self, other: &f64) -> bool {
        period_ratio_is_integral(*self, *other) || period_ratio_is_integral(*other, *self)
    }
}

/// `true` if `big / small` is within [`RATIO_EPSILON`] of a positive integer.
fn period_ratio_is_integral(big: f64, small: f64) -> bool {
    if small <= 0.0 || big <= 0.0 {
        return false;
    }
    let ratio = big / small;
    let nearest = ratio.round();
    nearest >= 1.0 && (ratio - nearest).abs() <= RATIO_EPSILON * nearest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_and_twenty_five_hz_divide() {
        let a = 1.0 / 100.0;
        let b = 1.0 / 25.0;
        assert!(a.divides(&b));
        assert!(b.divides(&a));
    }

    #[test]
    fn sixty_and_twenty_five_hz_do_not_divide() {
        let a = 1.0 / 60.0;
        let b = 1.0 / 25.0;
        assert!(!a.divides(&b));
        assert!(!b.divides(&a));
    }

    #[test]
    fn equal_periods_divide() {
        let a = 0.01;
        let b = 0.01;
        assert!(a.divides(&b));
    }

    #[test]
    fn tolerates_floating_point_rounding() {
        let a: f64 = 1.0 / 3.0;
        let b: f64 = a * 3.0;
        assert!(a.divides(&b));
    }
}
