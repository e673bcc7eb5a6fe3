//! Constant product pricing and claim arithmetic (x·y=k)

use crate::{FeeRate, MathError, Result, SCALE};

pub use wide::U256;

// Kept apart from the crate `Result` alias, which the macro's impls would pick up
mod wide {
    use uint::construct_uint;

    construct_uint! {
        /// 256-bit unsigned integer for intermediate products
        pub struct U256(4);
    }
}

#[inline]
fn widen(x: u128) -> U256 {
    U256::from(x)
}

#[inline]
fn narrow(x: U256) -> Result<u128> {
    if x > widen(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(x.low_u128())
}

/// floor(a * b / c) with a 256-bit intermediate product
///
/// The product of two `u128` values always fits in 256 bits, so the only
/// failure modes are a zero divisor and a quotient wider than 128 bits.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    narrow(widen(a) * widen(b) / widen(c))
}

/// Integer square root (Babylonian), floored
pub fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let two = U256::from(2u8);
    let mut x = n;
    // ceil(n / 2) avoids the n + 1 overflow at U256::MAX
    let mut y = n / two + n % two;
    while y < x {
        x = y;
        y = (x + n / x) / two;
    }
    x
}

/// Claims minted for the very first deposit
///
/// claims = floor(sqrt(amount_a · amount_b / SCALE))
///
/// The first provider fixes the initial price at `amount_b / amount_a`.
pub fn initial_claims(amount_a: u128, amount_b: u128) -> Result<u128> {
    if amount_a == 0 || amount_b == 0 {
        return Err(MathError::InvalidAmount);
    }
    let product = widen(amount_a) * widen(amount_b) / widen(SCALE);
    narrow(isqrt(product))
}

/// Claims minted for a deposit into a pool that already has liquidity
///
/// claims = min(floor(amount_a · T / reserve_a), floor(amount_b · T / reserve_b))
///
/// Taking the minimum charges an off-ratio depositor for the over-supplied
/// side instead of diluting existing holders.
///
/// # Arguments
/// * `amount_a`, `amount_b` - Deposit amounts
/// * `reserve_a`, `reserve_b` - Current reserves (must be non-zero)
/// * `total_claims` - Outstanding claims before the deposit
pub fn proportional_claims(
    amount_a: u128,
    amount_b: u128,
    reserve_a: u128,
    reserve_b: u128,
    total_claims: u128,
) -> Result<u128> {
    if amount_a == 0 || amount_b == 0 {
        return Err(MathError::InvalidAmount);
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(MathError::DivisionByZero);
    }
    let t = widen(total_claims);
    let share_a = widen(amount_a) * t / widen(reserve_a);
    let share_b = widen(amount_b) * t / widen(reserve_b);
    narrow(share_a.min(share_b))
}

/// Portion of `reserve` owed to `claims` out of `total_claims`, floored
pub fn pro_rata_share(claims: u128, reserve: u128, total_claims: u128) -> Result<u128> {
    mul_div(claims, reserve, total_claims)
}

/// Output amount for a swap of `amount_in` against the given reserves
///
/// With fee on input:
/// - Δin_eff = floor(Δin · (den - num) / den)
/// - Δout = floor(Δin_eff · y / (x + Δin_eff))
///
/// The fee portion never enters the output calculation but still lands in
/// the input reserve, so `(x + Δin) · (y - Δout) >= x · y`.
///
/// # Arguments
/// * `amount_in` - Gross input amount (must be > 0)
/// * `reserve_in` - Reserve of the asset being sold
/// * `reserve_out` - Reserve of the asset being bought
/// * `fee` - Fee retained from the input
pub fn quote_output(
    amount_in: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee: FeeRate,
) -> Result<u128> {
    if amount_in == 0 {
        return Err(MathError::InvalidAmount);
    }
    let in_with_fee = mul_div(amount_in, fee.retained_complement(), fee.denominator)?;
    let denominator = widen(reserve_in) + widen(in_with_fee);
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    narrow(widen(in_with_fee) * widen(reserve_out) / denominator)
}

/// Price of one unit of A in units of B, scaled by SCALE
pub fn spot_price(reserve_a: u128, reserve_b: u128) -> Result<u128> {
    mul_div(reserve_b, SCALE, reserve_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_FEE;

    const TEST_SCALE: u128 = SCALE;

    #[test]
    fn test_u256_text_parsing() {
        let past_u128 = U256::from_dec_str("340282366920938463463374607431768211456").unwrap();
        assert_eq!(past_u128, U256::from(u128::MAX) + U256::one());
        assert_eq!("ff".parse::<U256>().unwrap(), U256::from(255u32));
        assert_eq!(narrow(past_u128), Err(MathError::Overflow));
    }

    #[test]
    fn test_isqrt_small_values() {
        let expected = [0u64, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(isqrt(U256::from(n)), U256::from(*want), "isqrt({})", n);
        }
    }

    #[test]
    fn test_isqrt_perfect_squares_and_neighbours() {
        let root = U256::from(u128::MAX);
        let square = root * root;
        assert_eq!(isqrt(square), root);
        assert_eq!(isqrt(square - U256::one()), root - U256::one());
        assert_eq!(isqrt(U256::MAX), root);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // (2^127 * 4) / 8 would overflow u128 if multiplied first in 128 bits
        let a = 1u128 << 127;
        assert_eq!(mul_div(a, 4, 8).unwrap(), a / 2);
        assert_eq!(mul_div(7, 3, 2).unwrap(), 10);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, u128::MAX, 1), Err(MathError::Overflow));
    }

    #[test]
    fn test_initial_claims_reference_deposit() {
        // sqrt(100e18 · 200e18 / 1e18) = sqrt(2e22)
        let claims = initial_claims(100 * TEST_SCALE, 200 * TEST_SCALE).unwrap();
        assert_eq!(claims, 141_421_356_237);
    }

    #[test]
    fn test_initial_claims_rejects_zero() {
        assert_eq!(initial_claims(0, TEST_SCALE), Err(MathError::InvalidAmount));
        assert_eq!(initial_claims(TEST_SCALE, 0), Err(MathError::InvalidAmount));
    }

    #[test]
    fn test_proportional_claims_takes_minimum() {
        let total = 141_421_356_237;
        let ra = 100 * TEST_SCALE;
        let rb = 200 * TEST_SCALE;

        // On-ratio deposit of half the pool
        let on_ratio = proportional_claims(50 * TEST_SCALE, 100 * TEST_SCALE, ra, rb, total).unwrap();
        assert_eq!(on_ratio, 70_710_678_118);

        // Over-supplying B earns nothing extra
        let heavy_b = proportional_claims(50 * TEST_SCALE, 500 * TEST_SCALE, ra, rb, total).unwrap();
        assert_eq!(heavy_b, on_ratio);
    }

    #[test]
    fn test_proportional_claims_can_floor_to_zero() {
        let claims = proportional_claims(1, 1, 1_000 * TEST_SCALE, 1_000 * TEST_SCALE, 1_000).unwrap();
        assert_eq!(claims, 0);
    }

    #[test]
    fn test_quote_output_reference_swap() {
        let out = quote_output(10 * TEST_SCALE, 100 * TEST_SCALE, 200 * TEST_SCALE, DEFAULT_FEE).unwrap();
        assert_eq!(out, 18_132_217_877_602_982_631);
    }

    #[test]
    fn test_quote_output_zero_input() {
        let result = quote_output(0, TEST_SCALE, TEST_SCALE, DEFAULT_FEE);
        assert_eq!(result, Err(MathError::InvalidAmount));
    }

    #[test]
    fn test_quote_output_fee_costs_trader() {
        let no_fee = FeeRate { numerator: 0, denominator: 1_000 };
        let x = 1_000 * TEST_SCALE;
        let y = 3_000 * TEST_SCALE;

        let with_fee = quote_output(TEST_SCALE, x, y, DEFAULT_FEE).unwrap();
        let without = quote_output(TEST_SCALE, x, y, no_fee).unwrap();
        assert!(with_fee < without);
    }

    #[test]
    fn test_invariant_increases_with_fees() {
        let x0 = 1_000 * TEST_SCALE;
        let y0 = 60_000 * TEST_SCALE;
        let dx = 50 * TEST_SCALE;

        let dy = quote_output(dx, x0, y0, DEFAULT_FEE).unwrap();

        let k0 = U256::from(x0) * U256::from(y0);
        let k1 = U256::from(x0 + dx) * U256::from(y0 - dy);
        assert!(k1 > k0, "Invariant should increase due to fees");
    }

    #[test]
    fn test_quote_output_never_drains_reserve() {
        let out = quote_output(u128::MAX / 2, TEST_SCALE, TEST_SCALE, DEFAULT_FEE).unwrap();
        assert!(out < TEST_SCALE);
    }

    #[test]
    fn test_spot_price() {
        assert_eq!(spot_price(100 * TEST_SCALE, 200 * TEST_SCALE).unwrap(), 2 * TEST_SCALE);
        assert_eq!(spot_price(0, TEST_SCALE), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_round_trip_loses_to_fees() {
        let x = 1_000 * TEST_SCALE;
        let y = 1_000 * TEST_SCALE;
        let amount = 10 * TEST_SCALE;

        let bought = quote_output(amount, x, y, DEFAULT_FEE).unwrap();
        let sold_back = quote_output(bought, y - bought, x + amount, DEFAULT_FEE).unwrap();

        assert!(sold_back < amount, "Round-trip should lose to fees");
    }
}
