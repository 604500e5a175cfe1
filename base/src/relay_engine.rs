use std::sync::Arc;
use std::time::Duration;

use ethers::types::{Address, U256};
use gas_relay_core::traits::ReceiptStatus;
use gas_relay_core::{ChainClient, FundingDecision, GasPayerContract, PriceOracle, RelayOutcome, TenantContext};

use crate::gas_policy;
use crate::metrics::CoreMetrics;
use crate::settings::GasSettings;

/// Bounded poll budget for awaiting the forwarded transaction's receipt
/// (spec §4.I step 8): 30 attempts at 2s = 60s.
const RECEIPT_POLL_ATTEMPTS: u32 = 30;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Orchestrates decode → validate → fund (if needed) → forward → await
/// receipt (spec §4.I). This is the one place the nine-step sequence is
/// allowed to run; every step is a suspension point but the steps themselves
/// are never reordered or parallelized (spec §9).
pub struct RelayEngine {
    chain_client: Arc<dyn ChainClient>,
    gas_payer: Arc<dyn GasPayerContract>,
    price_oracle: Option<Arc<dyn PriceOracle>>,
    gas_settings: GasSettings,
    decode: fn(&str) -> Result<gas_relay_core::DecodedTx, gas_relay_core::RelayError>,
    metrics: Arc<CoreMetrics>,
}

impl RelayEngine {
    pub fn new(
        chain_client: Arc<dyn ChainClient>,
        gas_payer: Arc<dyn GasPayerContract>,
        price_oracle: Option<Arc<dyn PriceOracle>>,
        gas_settings: GasSettings,
        decode: fn(&str) -> Result<gas_relay_core::DecodedTx, gas_relay_core::RelayError>,
        metrics: Arc<CoreMetrics>,
    ) -> Self {
        Self {
            chain_client,
            gas_payer,
            price_oracle,
            gas_settings,
            decode,
            metrics,
        }
    }

    /// Run the full relay pipeline for one request, recording the outcome
    /// (and, if a funding call happened, its amount) on `self.metrics`.
    pub async fn process(
        &self,
        tenant: &TenantContext,
        user_wallet_hint: Option<Address>,
        signed_hex: &str,
        operation_name: &str,
        expected_gas_limit: U256,
    ) -> RelayOutcome {
        let outcome = self
            .process_inner(tenant, user_wallet_hint, signed_hex, operation_name, expected_gas_limit)
            .await;
        self.metrics
            .record_request(operation_name, if outcome.success { "success" } else { "failure" });
        outcome
    }

    #[tracing::instrument(skip(self, tenant, signed_hex), fields(operation_name))]
    async fn process_inner(
        &self,
        tenant: &TenantContext,
        _user_wallet_hint: Option<Address>,
        signed_hex: &str,
        operation_name: &str,
        expected_gas_limit: U256,
    ) -> RelayOutcome {
        // Step 1: decode.
        let decoded = match (self.decode)(signed_hex) {
            Ok(tx) => tx,
            Err(e) => return RelayOutcome::failed(e.to_string()),
        };

        // Step 2: the signature-recovered sender is authoritative; the
        // client-supplied hint is never trusted for funding or forwarding.
        let actual_sender = decoded.sender;

        // Step 3: validate.
        let network_gas_price = match self.chain_client.network_gas_price().await {
            Ok(price) => price,
            Err(e) => return RelayOutcome::failed(e.to_string()),
        };
        if let Err(e) = gas_policy::validate(&decoded, network_gas_price, expected_gas_limit, &self.gas_settings) {
            return RelayOutcome {
                success: false,
                tx_hash: None,
                contract_address: e.contract_address_hint(decoded.to),
                error: Some(e.to_string()),
            };
        }

        // Step 4: funding decision.
        let decision = match gas_policy::decide_funding(
            &decoded,
            self.chain_client.as_ref(),
            self.gas_payer.as_ref(),
            &self.gas_settings,
        )
        .await
        {
            Ok(decision) => decision,
            Err(e) => return RelayOutcome::failed(e.to_string()),
        };

        if let FundingDecision::Transfer { amount, fee, needed } = decision {
            let Some(wallet) = tenant.wallet_binding.as_ref() else {
                return RelayOutcome::failed(
                    gas_relay_core::RelayError::NoTenantWallet { deficit: amount }.to_string(),
                );
            };

            // Step 5: fund.
            let transfer_value = amount.saturating_add(fee);
            if let Err(e) = self
                .gas_payer
                .fund_and_relay(wallet, actual_sender, amount, transfer_value)
                .await
            {
                self.metrics.record_funding_call("failure", operation_name, 0.0);
                return RelayOutcome::failed(e.to_string());
            }
            self.metrics
                .record_funding_call("success", operation_name, amount.as_u128() as f64);

            // Step 6: wait for balance — poll for the same padded `needed`
            // the funding amount was sized against (gas_policy::decide_funding),
            // not a recomputed unpadded cost.
            if let Err(e) = gas_policy::wait_for_balance(self.chain_client.as_ref(), actual_sender, needed).await {
                return RelayOutcome::failed(e.to_string());
            }

            self.log_funding_amount(amount).await;
        }

        // Step 7: forward, byte-identical.
        let tx_hash = match self.chain_client.send_raw(&decoded.raw_hex).await {
            Ok(hash) => hash,
            Err(e) => {
                return RelayOutcome {
                    success: false,
                    tx_hash: None,
                    contract_address: decoded.to,
                    error: Some(e.to_string()),
                }
            }
        };

        // Step 8: await receipt.
        let receipt = self.await_receipt(tx_hash).await;
        match receipt {
            Some(r) if r.status == ReceiptStatus::Ok => RelayOutcome {
                success: true,
                tx_hash: Some(tx_hash),
                contract_address: decoded.to,
                error: None,
            },
            Some(_) => RelayOutcome {
                success: false,
                tx_hash: Some(tx_hash),
                contract_address: decoded.to,
                error: Some("Transaction failed on blockchain".into()),
            },
            None => RelayOutcome {
                success: false,
                tx_hash: Some(tx_hash),
                contract_address: decoded.to,
                error: Some("timed out waiting for transaction receipt".into()),
            },
        }
    }

    async fn await_receipt(&self, tx_hash: ethers::types::H256) -> Option<gas_relay_core::traits::TxReceipt> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            if let Ok(Some(receipt)) = self.chain_client.receipt(tx_hash).await {
                return Some(receipt);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
        None
    }

    async fn log_funding_amount(&self, amount: U256) {
        match &self.price_oracle {
            Some(oracle) => {
                let chain_id = self.chain_client.chain_id().await.unwrap_or(0);
                let quote = oracle.quote(chain_id, amount).await;
                match quote {
                    gas_relay_core::PriceQuote::Known { symbol, native_decimal, usd_decimal } => {
                        tracing::info!(%amount, %symbol, %native_decimal, %usd_decimal, "funded tenant wallet");
                    }
                    gas_relay_core::PriceQuote::Unknown => {
                        tracing::info!(%amount, "funded tenant wallet (price unavailable, amount in wei)");
                    }
                }
            }
            None => tracing::info!(%amount, "funded tenant wallet (amount in wei)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ethers::types::{Bytes, H256};
    use gas_relay_core::traits::TxReceipt;
    use gas_relay_core::{DecodedTx, RelayError, TxKind, WalletBinding};
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

    const SENDER_HEX: &str = "0x1111111111111111111111111111111111111111";
    const TO_HEX: &str = "0x2222222222222222222222222222222222222222";

    fn sender() -> Address {
        SENDER_HEX.parse().unwrap()
    }

    fn decode_for(hex: &str) -> Result<DecodedTx, RelayError> {
        match hex {
            "0xwithin-buffer" | "0xsufficient-balance" | "0xneeds-funding" => Ok(DecodedTx {
                sender: sender(),
                to: Some(TO_HEX.parse().unwrap()),
                value: U256::zero(),
                data: Bytes::default(),
                gas_limit: U256::from(100_000u64),
                effective_gas_price: U256::from(25_000_000_000u64),
                tx_type: TxKind::Legacy,
                raw_hex: hex.to_string(),
            }),
            "0xover-buffer" => Ok(DecodedTx {
                sender: sender(),
                to: Some(TO_HEX.parse().unwrap()),
                value: U256::zero(),
                data: Bytes::default(),
                gas_limit: U256::from(200_000u64),
                effective_gas_price: U256::from(25_000_000_000u64),
                tx_type: TxKind::Legacy,
                raw_hex: hex.to_string(),
            }),
            _ => Err(RelayError::Decode("unrecognized fixture".into())),
        }
    }

    struct FakeChainClient {
        balance: AtomicU64,
        gas_price: u64,
        send_raw_calls: AtomicU32,
    }

    impl FakeChainClient {
        fn new(balance: u64) -> Self {
            Self {
                balance: AtomicU64::new(balance),
                gas_price: 25_000_000_000,
                send_raw_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainClient for FakeChainClient {
        async fn balance(&self, _addr: Address) -> Result<U256, RelayError> {
            Ok(U256::from(self.balance.load(Ordering::SeqCst)))
        }

        async fn send_raw(&self, _raw_hex: &str) -> Result<H256, RelayError> {
            self.send_raw_calls.fetch_add(1, Ordering::SeqCst);
            Ok(H256::repeat_byte(0xAB))
        }

        async fn receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, RelayError> {
            Ok(Some(TxReceipt {
                tx_hash,
                status: ReceiptStatus::Ok,
            }))
        }

        async fn network_gas_price(&self) -> Result<U256, RelayError> {
            Ok(U256::from(self.gas_price))
        }

        async fn chain_id(&self) -> Result<u64, RelayError> {
            Ok(1)
        }

        async fn estimate_gas(&self, _to: Address, _data: Bytes, _value: U256) -> Result<U256, RelayError> {
            Ok(U256::from(21_000u64))
        }
    }

    struct FakeGasPayerContract {
        fund_calls: AtomicU32,
        chain_client: Arc<FakeChainClient>,
        top_up_to: u64,
    }

    #[async_trait]
    impl GasPayerContract for FakeGasPayerContract {
        async fn calculate_fee(&self, amount: U256) -> Result<U256, RelayError> {
            Ok(amount / U256::from(20u64)) // 5%
        }

        async fn fund_and_relay(
            &self,
            _wallet: &WalletBinding,
            _user_addr: Address,
            _gas_amount: U256,
            _value: U256,
        ) -> Result<TxReceipt, RelayError> {
            self.fund_calls.fetch_add(1, Ordering::SeqCst);
            self.chain_client.balance.store(self.top_up_to, Ordering::SeqCst);
            Ok(TxReceipt {
                tx_hash: H256::repeat_byte(0xCD),
                status: ReceiptStatus::Ok,
            })
        }
    }

    fn test_tenant(with_wallet: bool) -> TenantContext {
        TenantContext {
            api_key_name: "test".into(),
            client_ip: "127.0.0.1".into(),
            wallet_binding: with_wallet.then(|| WalletBinding {
                private_key: "0x0000000000000000000000000000000000000000000000000000000000000001".into(),
                address: None,
            }),
        }
    }

    fn metrics() -> Arc<CoreMetrics> {
        Arc::new(CoreMetrics::new("test", prometheus::Registry::new()).unwrap())
    }

    #[tokio::test]
    async fn happy_path_sufficient_balance_skips_funding() {
        let chain = Arc::new(FakeChainClient::new(10u64.pow(18)));
        let gas_payer = Arc::new(FakeGasPayerContract {
            fund_calls: AtomicU32::new(0),
            chain_client: chain.clone(),
            top_up_to: 0,
        });
        let engine = RelayEngine::new(
            chain.clone(),
            gas_payer.clone(),
            None,
            GasSettings::default(),
            decode_for,
            metrics(),
        );

        let outcome = engine
            .process(
                &test_tenant(false),
                None,
                "0xsufficient-balance",
                "mint",
                U256::from(130_000u64),
            )
            .await;

        assert!(outcome.success);
        assert_eq!(gas_payer.fund_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.send_raw_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn conditional_funding_tops_up_then_forwards() {
        let chain = Arc::new(FakeChainClient::new(0));
        let gas_payer = Arc::new(FakeGasPayerContract {
            fund_calls: AtomicU32::new(0),
            chain_client: chain.clone(),
            top_up_to: 10u64.pow(18),
        });
        let engine = RelayEngine::new(
            chain.clone(),
            gas_payer.clone(),
            None,
            GasSettings::default(),
            decode_for,
            metrics(),
        );

        let outcome = engine
            .process(&test_tenant(true), None, "0xneeds-funding", "mint", U256::from(130_000u64))
            .await;

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(gas_payer.fund_calls.load(Ordering::SeqCst), 1);
        assert_eq!(chain.send_raw_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn funding_required_without_wallet_fails_fast() {
        let chain = Arc::new(FakeChainClient::new(0));
        let gas_payer = Arc::new(FakeGasPayerContract {
            fund_calls: AtomicU32::new(0),
            chain_client: chain.clone(),
            top_up_to: 10u64.pow(18),
        });
        let engine = RelayEngine::new(
            chain.clone(),
            gas_payer.clone(),
            None,
            GasSettings::default(),
            decode_for,
            metrics(),
        );

        let outcome = engine
            .process(&test_tenant(false), None, "0xneeds-funding", "mint", U256::from(130_000u64))
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("no bound wallet"));
        assert_eq!(gas_payer.fund_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.send_raw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validation_rejection_never_reaches_funding_or_forwarding() {
        let chain = Arc::new(FakeChainClient::new(10u64.pow(18)));
        let gas_payer = Arc::new(FakeGasPayerContract {
            fund_calls: AtomicU32::new(0),
            chain_client: chain.clone(),
            top_up_to: 0,
        });
        let engine = RelayEngine::new(
            chain.clone(),
            gas_payer.clone(),
            None,
            GasSettings::default(),
            decode_for,
            metrics(),
        );

        let outcome = engine
            .process(&test_tenant(true), None, "0xover-buffer", "mint", U256::from(130_000u64))
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("exceeds ceiling"));
        assert_eq!(outcome.contract_address, Some(TO_HEX.parse().unwrap()));
        assert_eq!(gas_payer.fund_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.send_raw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decode_failure_terminates_before_any_chain_call() {
        let chain = Arc::new(FakeChainClient::new(10u64.pow(18)));
        let gas_payer = Arc::new(FakeGasPayerContract {
            fund_calls: AtomicU32::new(0),
            chain_client: chain.clone(),
            top_up_to: 0,
        });
        let engine = RelayEngine::new(
            chain.clone(),
            gas_payer.clone(),
            None,
            GasSettings::default(),
            decode_for,
            metrics(),
        );

        let outcome = engine
            .process(&test_tenant(true), None, "0xnot-a-real-tx", "mint", U256::from(130_000u64))
            .await;

        assert!(!outcome.success);
        assert_eq!(chain.send_raw_calls.load(Ordering::SeqCst), 0);
    }
}
