//! Floor-division helpers for wide wei arithmetic.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use stakenet_types::{Ratio, Wei, RATIO_UNIT};

/// Compute `a * b / den` with floor division.
///
/// Products that overflow 128 bits are routed through `BigUint`; the final
/// quotient always fits back into a `Wei` for any input this ledger produces
/// (the quotient is bounded by `max(a, b)` whenever `den >= min(a, b)`).
pub(crate) fn mul_div(a: Wei, b: Wei, den: Wei) -> Wei {
    if den == 0 {
        return 0;
    }
    match a.checked_mul(b) {
        Some(product) => product / den,
        None => {
            let product = BigUint::from(a) * BigUint::from(b);
            (product / BigUint::from(den)).to_u128().unwrap_or(Wei::MAX)
        }
    }
}

/// Scale `amount` by a parts-per-[`RATIO_UNIT`] ratio, flooring.
pub(crate) fn apply_ratio(amount: Wei, ratio: Ratio) -> Wei {
    mul_div(amount, ratio as Wei, RATIO_UNIT as Wei)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_floors() {
        assert_eq!(mul_div(10, 1, 3), 3);
        assert_eq!(mul_div(1_000_000_000_000, 16, 19), 842_105_263_157);
        assert_eq!(mul_div(7, 0, 5), 0);
        assert_eq!(mul_div(7, 5, 0), 0);
    }

    #[test]
    fn mul_div_survives_wide_products() {
        // 2^127 * 4 / 8 overflows u128 in the product but not the quotient.
        let a = 1u128 << 127;
        assert_eq!(mul_div(a, 4, 8), a / 2);
    }

    #[test]
    fn apply_ratio_matches_fixture_math() {
        // 30% of a full delegation epoch reward, as in the lockup split.
        assert_eq!(apply_ratio(70_833_333_333, 300_000), 21_249_999_999);
        assert_eq!(apply_ratio(171_052_631_578, 300_000), 51_315_789_473);
        assert_eq!(apply_ratio(100, RATIO_UNIT), 100);
        assert_eq!(apply_ratio(100, 0), 0);
    }
}
