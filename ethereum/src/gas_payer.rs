use std::sync::Arc;

use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use gas_relay_core::{GasPayerContract as GasPayerContractTrait, ReceiptStatus, RelayError, TxReceipt, WalletBinding};

abigen!(
    GasPayerContractBinding,
    r#"[
        function calculateFee(uint256 amount) external view returns (uint256)
        function fundAndRelay(address userAddr, uint256 gasAmount) external payable
    ]"#
);

/// Adapter over the on-chain Gas Payer Contract (spec §4.B).
///
/// A fresh instance is built per funding call so the correct tenant
/// `WalletBinding` signs `fundAndRelay` — instances are never shared or
/// pooled across tenants (spec §5).
pub struct EthereumGasPayerContract {
    provider: Arc<Provider<Http>>,
    contract_address: Address,
}

impl EthereumGasPayerContract {
    pub fn new(provider: Arc<Provider<Http>>, contract_address: Address) -> Self {
        Self {
            provider,
            contract_address,
        }
    }

    fn rpc_err(e: impl std::fmt::Display) -> RelayError {
        RelayError::ChainRpcError {
            message: e.to_string(),
        }
    }

    fn signer_for(&self, wallet: &WalletBinding) -> Result<LocalWallet, RelayError> {
        wallet
            .private_key
            .parse::<LocalWallet>()
            .map_err(|e| RelayError::FundingFailed(format!("invalid wallet private key: {e}")))
    }
}

#[async_trait]
impl GasPayerContractTrait for EthereumGasPayerContract {
    async fn calculate_fee(&self, amount: U256) -> Result<U256, RelayError> {
        let contract = GasPayerContractBinding::new(self.contract_address, self.provider.clone());
        contract
            .calculate_fee(amount)
            .call()
            .await
            .map_err(Self::rpc_err)
    }

    async fn fund_and_relay(
        &self,
        wallet: &WalletBinding,
        user_addr: Address,
        gas_amount: U256,
        value: U256,
    ) -> Result<TxReceipt, RelayError> {
        let local_wallet = self.signer_for(wallet)?;
        let chain_id = self.provider.get_chainid().await.map_err(Self::rpc_err)?.as_u64();
        let signer = SignerMiddleware::new(self.provider.clone(), local_wallet.with_chain_id(chain_id));
        let contract = GasPayerContractBinding::new(self.contract_address, Arc::new(signer));

        let call = contract.fund_and_relay(user_addr, gas_amount).value(value);
        let pending = call
            .send()
            .await
            .map_err(|e| RelayError::FundingFailed(e.to_string()))?;
        let receipt = pending
            .await
            .map_err(|e| RelayError::FundingFailed(e.to_string()))?
            .ok_or_else(|| RelayError::FundingFailed("no receipt returned".into()))?;

        let status = match receipt.status.map(|s| s.as_u64()) {
            Some(1) => ReceiptStatus::Ok,
            _ => ReceiptStatus::Failed,
        };
        if status != ReceiptStatus::Ok {
            return Err(RelayError::FundingFailed(format!(
                "fundAndRelay reverted, tx {:#x}",
                receipt.transaction_hash
            )));
        }

        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            status,
        })
    }
}
