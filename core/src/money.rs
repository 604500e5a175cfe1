use ethers::types::U256;

/// Basis-point denominator: 10_000 bps == 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Convert a fractional multiplier (e.g. `1.20`) into basis points (`12_000`),
/// rounding to the nearest integer. Computed once when settings are loaded,
/// never per-request, so the float arithmetic here never touches wei-scale
/// values directly.
pub fn multiplier_to_bps(multiplier: f64) -> u32 {
    (multiplier * BPS_DENOMINATOR as f64).round() as u32
}

/// Apply a basis-points multiplier to a wei amount using only integer
/// arithmetic, per the "decimal/fractional multipliers" design note: avoids
/// floating-point drift on wei-scale integers.
pub fn apply_bps(amount: U256, bps: u32) -> U256 {
    amount.saturating_mul(U256::from(bps)) / U256::from(BPS_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_matches_spec_example() {
        // gas.price_multiplier = 1.20 on base_cost = 1000 wei => padded_cost = 1200 wei
        let bps = multiplier_to_bps(1.20);
        assert_eq!(bps, 12_000);
        assert_eq!(apply_bps(U256::from(1000u64), bps), U256::from(1200u64));
    }

    #[test]
    fn buffered_gas_limit_uses_integer_120_percent() {
        let expected = U256::from(130_000u64);
        let ceiling = expected.saturating_mul(U256::from(120u64)) / U256::from(100u64);
        assert_eq!(ceiling, U256::from(156_000u64));
    }

    #[test]
    fn fallback_fee_is_five_percent() {
        let bps = multiplier_to_bps(0.05);
        assert_eq!(bps, 500);
        assert_eq!(apply_bps(U256::from(3_000_000_000_000_000u64), bps), U256::from(150_000_000_000_000u64));
    }
}
