//! Fixed-point price and amount arithmetic.
//!
//! ## Overview
//!
//! All amounts use fixed-point representation: u64 scaled by 10^8. All
//! intermediate products widen to u128, and every operation that can
//! overflow is checked. Floating point never appears in an engine path --
//! it would break determinism across hosts.
//!
//! ## Price Comparison
//!
//! Offers are ranked by their ask-equivalent price without ever dividing:
//! `priced_le` cross-multiplies the two amount pairs in u128. This is exact
//! where a quotient comparison would have to pick a rounding direction.
//!
//! ## Examples
//!
//! ```
//! use otcbook::types::price::{to_fixed, from_fixed};
//!
//! let amount = to_fixed("100.5").unwrap();
//! assert_eq!(amount, 10_050_000_000);
//! assert_eq!(from_fixed(amount), "100.50000000");
//! ```

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Scaling factor for fixed-point arithmetic: 10^8
pub const SCALE: u64 = 100_000_000;

/// Fee rates are expressed in basis points out of this denominator.
pub const BPS_DENOM: u64 = 10_000;

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert a decimal string to a fixed-point u64.
///
/// Returns `None` on parse failure, negative input, or out-of-range values.
///
/// ```
/// use otcbook::types::price::to_fixed;
///
/// assert_eq!(to_fixed("1.0"), Some(100_000_000));
/// assert_eq!(to_fixed("0.00000001"), Some(1));
/// assert_eq!(to_fixed("-1"), None);
/// ```
pub fn to_fixed(s: &str) -> Option<u64> {
    let decimal = Decimal::from_str(s).ok()?;
    if decimal.is_sign_negative() {
        return None;
    }
    let scaled = decimal.checked_mul(Decimal::from(SCALE))?;
    scaled.round_dp(0).to_u64()
}

/// Convert a fixed-point u64 to a string with 8 decimal places.
///
/// ```
/// use otcbook::types::price::from_fixed;
///
/// assert_eq!(from_fixed(150_000_000), "1.50000000");
/// ```
pub fn from_fixed(value: u64) -> String {
    let decimal = Decimal::from(value) / Decimal::from(SCALE);
    format!("{:.8}", decimal)
}

// ============================================================================
// Checked Arithmetic
// ============================================================================

/// Checked addition
#[inline]
pub fn checked_add(a: u64, b: u64) -> Option<u64> {
    a.checked_add(b)
}

/// Checked subtraction
#[inline]
pub fn checked_sub(a: u64, b: u64) -> Option<u64> {
    a.checked_sub(b)
}

/// Compute `a * b / c` with a u128 intermediate, rounding down.
///
/// Returns `None` if `c` is zero or the result exceeds u64.
#[inline]
pub fn mul_div(a: u64, b: u64, c: u64) -> Option<u64> {
    if c == 0 {
        return None;
    }
    let wide = (a as u128).checked_mul(b as u128)? / (c as u128);
    u64::try_from(wide).ok()
}

// ============================================================================
// Price Comparison
// ============================================================================

/// Return true when the `lo` offer is priced less than or equal to the `hi`
/// offer, i.e. `lo` gives the taker at most as good a rate.
///
/// Cross-multiplied form of `buy_lo / sell_lo >= buy_hi / sell_hi`, exact in
/// u128 with no division.
#[inline]
pub fn priced_le(lo_buy: u64, lo_sell: u64, hi_buy: u64, hi_sell: u64) -> bool {
    (lo_buy as u128) * (hi_sell as u128) >= (hi_buy as u128) * (lo_sell as u128)
}

// ============================================================================
// Integer Square Root
// ============================================================================

/// Integer square root by Newton's method.
///
/// The initial guess is `2^ceil(bits/2)`, an upper bound on the root, and
/// seven iterations converge for any u128 input since each step doubles the
/// correct bit count. The final `min` guards the one-off case where the
/// iteration lands on `root + 1`.
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << ((bits + 1) / 2);
    for _ in 0..7 {
        x = (x + n / x) / 2;
    }
    x.min(n / x)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_constant() {
        assert_eq!(SCALE, 100_000_000);
    }

    #[test]
    fn test_to_fixed_basic() {
        assert_eq!(to_fixed("1.0"), Some(100_000_000));
        assert_eq!(to_fixed("1"), Some(100_000_000));
        assert_eq!(to_fixed("0.5"), Some(50_000_000));
        assert_eq!(to_fixed("0.00000001"), Some(1));
        assert_eq!(to_fixed("50000.12345678"), Some(5_000_012_345_678));
    }

    #[test]
    fn test_to_fixed_edge_cases() {
        assert_eq!(to_fixed("0"), Some(0));
        assert_eq!(to_fixed("-1.0"), None);
        assert_eq!(to_fixed("abc"), None);
        assert_eq!(to_fixed(""), None);
    }

    #[test]
    fn test_from_fixed() {
        assert_eq!(from_fixed(100_000_000), "1.00000000");
        assert_eq!(from_fixed(1), "0.00000001");
        assert_eq!(from_fixed(0), "0.00000000");
    }

    #[test]
    fn test_mul_div() {
        // 50 * 100 / 200 = 25
        assert_eq!(mul_div(50, 100, 200), Some(25));
        // Rounds down
        assert_eq!(mul_div(1, 2, 3), Some(0));
        // Division by zero
        assert_eq!(mul_div(1, 1, 0), None);
        // u128 intermediate avoids premature overflow
        assert_eq!(mul_div(u64::MAX, u64::MAX, u64::MAX), Some(u64::MAX));
    }

    #[test]
    fn test_checked_add_sub() {
        assert_eq!(checked_add(1, 2), Some(3));
        assert_eq!(checked_add(u64::MAX, 1), None);
        assert_eq!(checked_sub(3, 2), Some(1));
        assert_eq!(checked_sub(0, 1), None);
    }

    #[test]
    fn test_priced_le() {
        // A sells 100 for 200 (asks 2.0 per unit); B sells 100 for 300 (asks 3.0).
        // A is the better offer for a taker, so B <= A but not A <= B.
        assert!(!priced_le(200, 100, 300, 100));
        assert!(priced_le(300, 100, 200, 100));
        // Equal prices compare true in both directions
        assert!(priced_le(200, 100, 400, 200));
        assert!(priced_le(400, 200, 200, 100));
    }

    #[test]
    fn test_priced_le_no_overflow() {
        // Products near u64::MAX^2 must not overflow
        assert!(priced_le(u64::MAX, 1, u64::MAX, 1));
        assert!(priced_le(u64::MAX, u64::MAX, 1, 1));
    }

    #[test]
    fn test_isqrt_exact() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(144), 12);
        assert_eq!(isqrt(1 << 100), 1 << 50);
    }

    #[test]
    fn test_isqrt_rounds_down() {
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(8), 2);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(u128::MAX), (1u128 << 64) - 1);
    }

    #[test]
    fn test_isqrt_exhaustive_small() {
        for n in 0u128..10_000 {
            let r = isqrt(n);
            assert!(r * r <= n, "isqrt({}) = {} overshoots", n, r);
            assert!((r + 1) * (r + 1) > n, "isqrt({}) = {} undershoots", n, r);
        }
    }
}
