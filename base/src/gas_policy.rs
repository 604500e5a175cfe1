use std::time::Duration;

use ethers::types::{Address, U256};
use gas_relay_core::money::apply_bps;
use gas_relay_core::{money, ChainClient, DecodedTx, FundingDecision, GasPayerContract, RelayError};

use crate::settings::GasSettings;

/// Number of polls and the interval between them for the balance-wait step
/// (spec §4.E(iii)): 15 polls at 2s = 30s total budget.
const BALANCE_WAIT_POLLS: u32 = 15;
const BALANCE_WAIT_INTERVAL: Duration = Duration::from_secs(2);

/// Fixed fallback used when `calculate_fee` fails (spec §4.B, §7
/// `FeeEstimateUnavailable`).
const FALLBACK_FEE_MULTIPLIER: f64 = 0.05;

/// Validate a decoded transaction against the configured ceilings (spec
/// §4.E(i)). `expected_gas_limit` is zero when the caller (a plugin route)
/// declared none; in that case the policy additionally enforces
/// `max_total_cost_wei`.
pub fn validate(
    decoded: &DecodedTx,
    network_gas_price: U256,
    expected_gas_limit: U256,
    settings: &GasSettings,
) -> Result<(), RelayError> {
    let gas_limit_ceiling = if expected_gas_limit > U256::zero() {
        expected_gas_limit.saturating_mul(U256::from(120u64)) / U256::from(100u64)
    } else {
        U256::from(settings.max_gas_limit)
    };
    if decoded.gas_limit > gas_limit_ceiling {
        return Err(RelayError::ValidationLimit {
            actual: decoded.gas_limit,
            ceiling: gas_limit_ceiling,
        });
    }

    let price_bps = money::multiplier_to_bps(settings.max_gas_price_multiplier);
    let gas_price_ceiling = apply_bps(network_gas_price, price_bps);
    if decoded.effective_gas_price > gas_price_ceiling {
        return Err(RelayError::ValidationPrice {
            actual: decoded.effective_gas_price,
            ceiling: gas_price_ceiling,
        });
    }

    if expected_gas_limit.is_zero() {
        let total_cost = decoded.gas_limit.saturating_mul(decoded.effective_gas_price);
        let cost_ceiling = U256::from(settings.max_total_cost_wei);
        if total_cost > cost_ceiling {
            return Err(RelayError::ValidationCost {
                actual: total_cost,
                ceiling: cost_ceiling,
            });
        }
    }

    Ok(())
}

/// Compute the funding decision for a decoded transaction (spec §4.E(ii)).
pub async fn decide_funding(
    decoded: &DecodedTx,
    chain_client: &dyn ChainClient,
    gas_payer: &dyn GasPayerContract,
    settings: &GasSettings,
) -> Result<FundingDecision, RelayError> {
    let price_bps = money::multiplier_to_bps(settings.price_multiplier);
    let base_cost = decoded.gas_limit.saturating_mul(decoded.effective_gas_price);
    let padded_cost = apply_bps(base_cost, price_bps);
    let needed = padded_cost.saturating_add(decoded.value);

    let balance = chain_client.balance(decoded.sender).await?;
    if balance >= needed {
        return Ok(FundingDecision::Skip);
    }

    let deficit = needed - balance;
    let fee = match gas_payer.calculate_fee(deficit).await {
        Ok(fee) => fee,
        Err(e) => {
            tracing::warn!(error = %e, "fee estimate unavailable, falling back to 5%");
            apply_bps(deficit, money::multiplier_to_bps(FALLBACK_FEE_MULTIPLIER))
        }
    };

    Ok(FundingDecision::Transfer {
        amount: deficit,
        fee,
        needed,
    })
}

/// Poll `sender`'s balance until it reaches `needed` or the budget elapses
/// (spec §4.E(iii)).
pub async fn wait_for_balance(
    chain_client: &dyn ChainClient,
    sender: Address,
    needed: U256,
) -> Result<(), RelayError> {
    let mut last_seen = U256::zero();
    for _ in 0..BALANCE_WAIT_POLLS {
        last_seen = chain_client.balance(sender).await?;
        if last_seen >= needed {
            return Ok(());
        }
        tokio::time::sleep(BALANCE_WAIT_INTERVAL).await;
    }
    Err(RelayError::FundingTimeout { needed, last_seen })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gas_relay_core::TxKind;

    fn decoded(gas_limit: u64, gas_price: u64, value: u64) -> DecodedTx {
        DecodedTx {
            sender: Address::zero(),
            to: Some(Address::zero()),
            value: U256::from(value),
            data: Default::default(),
            gas_limit: U256::from(gas_limit),
            effective_gas_price: U256::from(gas_price),
            tx_type: TxKind::Legacy,
            raw_hex: "0x".into(),
        }
    }

    #[test]
    fn rejects_gas_limit_over_buffered_ceiling() {
        let tx = decoded(200_000, 25_000_000_000, 0);
        let settings = GasSettings::default();
        let err = validate(&tx, U256::from(25_000_000_000u64), U256::from(130_000u64), &settings)
            .unwrap_err();
        assert!(matches!(err, RelayError::ValidationLimit { .. }));
    }

    #[test]
    fn accepts_gas_limit_within_buffered_ceiling() {
        let tx = decoded(100_000, 25_000_000_000, 0);
        let settings = GasSettings::default();
        assert!(validate(&tx, U256::from(25_000_000_000u64), U256::from(130_000u64), &settings).is_ok());
    }

    #[test]
    fn zero_expected_gas_limit_falls_back_to_configured_ceilings() {
        let tx = decoded(2_000_000, 1, 0);
        let settings = GasSettings::default();
        let err = validate(&tx, U256::from(1u64), U256::zero(), &settings).unwrap_err();
        assert!(matches!(err, RelayError::ValidationLimit { .. }));
    }
}
