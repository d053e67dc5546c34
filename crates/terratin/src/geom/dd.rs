//! Double-double arithmetic kernel for the extended-precision predicates.
//!
//! A value is an unevaluated sum `hi + lo` with `|lo| <= ulp(hi)/2`, giving
//! roughly 106 bits of significand. Only the operations the predicates
//! need are provided: exact differences of doubles, and addition /
//! subtraction / multiplication of pairs (Dekker/Knuth error-free
//! transforms).

/// Splitting constant 2^27 + 1 for Dekker's product decomposition.
const SPLIT: f64 = 134_217_729.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Dd {
    hi: f64,
    lo: f64,
}

/// Exact sum of two doubles (Knuth two-sum).
#[inline]
fn two_sum(a: f64, b: f64) -> Dd {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    Dd { hi: s, lo: err }
}

/// Exact difference of two doubles.
#[inline]
pub(crate) fn two_diff(a: f64, b: f64) -> Dd {
    let s = a - b;
    let bb = s - a;
    let err = (a - (s - bb)) - (b + bb);
    Dd { hi: s, lo: err }
}

/// Exact product of two doubles via Dekker splitting.
#[inline]
fn two_prod(a: f64, b: f64) -> Dd {
    let p = a * b;
    let (ahi, alo) = split(a);
    let (bhi, blo) = split(b);
    let err = ((ahi * bhi - p) + ahi * blo + alo * bhi) + alo * blo;
    Dd { hi: p, lo: err }
}

#[inline]
fn split(a: f64) -> (f64, f64) {
    let c = SPLIT * a;
    let hi = c - (c - a);
    (hi, a - hi)
}

impl Dd {
    #[inline]
    pub(crate) fn from_f64(a: f64) -> Self {
        Dd { hi: a, lo: 0.0 }
    }

    #[inline]
    pub(crate) fn value(self) -> f64 {
        self.hi + self.lo
    }

    pub(crate) fn add(self, other: Dd) -> Dd {
        let s = two_sum(self.hi, other.hi);
        let e = self.lo + other.lo + s.lo;
        let r = two_sum(s.hi, e);
        Dd { hi: r.hi, lo: r.lo }
    }

    pub(crate) fn sub(self, other: Dd) -> Dd {
        self.add(other.neg())
    }

    pub(crate) fn mul(self, other: Dd) -> Dd {
        let p = two_prod(self.hi, other.hi);
        let e = self.hi * other.lo + self.lo * other.hi + p.lo;
        let r = two_sum(p.hi, e);
        Dd { hi: r.hi, lo: r.lo }
    }

    #[inline]
    pub(crate) fn neg(self) -> Dd {
        Dd {
            hi: -self.hi,
            lo: -self.lo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_difference_captures_roundoff() {
        // 1 + 2^-60 is not representable; the error limb recovers it.
        let a = 1.0f64;
        let b = -(2.0f64.powi(-60));
        let d = two_diff(a, b);
        assert_eq!(d.hi, 1.0);
        assert_eq!(d.lo, 2.0f64.powi(-60));
    }

    #[test]
    fn product_error_term_is_exact_for_small_ints() {
        let p = two_prod(3.0, 7.0);
        assert_eq!(p.hi, 21.0);
        assert_eq!(p.lo, 0.0);
    }

    #[test]
    fn add_mul_roundtrip() {
        let a = Dd::from_f64(1.0e16).add(Dd::from_f64(1.0));
        let b = a.sub(Dd::from_f64(1.0e16));
        assert_eq!(b.value(), 1.0);

        // 3 * fl(1/3) = 1 - 2^-54 exactly; the limbs must hold it exactly
        // even though collapsing to a single double rounds back to 1.
        let c = Dd::from_f64(1.0 / 3.0);
        let d = c.mul(Dd::from_f64(3.0));
        assert_eq!(d.hi, 1.0);
        assert_eq!(d.lo, -(2.0f64.powi(-54)));
    }
}
