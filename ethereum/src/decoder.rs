use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::utils::rlp::Rlp;
use gas_relay_core::{DecodedTx, RelayError, TxKind};

/// Parse a single hex-encoded, RLP-signed EVM transaction. Accepts both
/// 0x-prefixed and bare hex; accepts legacy and EIP-1559 (and EIP-2930,
/// treated as legacy-priced) encodings.
///
/// Pure and side-effect-free: the same `raw_hex` always yields an equal
/// `DecodedTx`. `raw_hex` is stored verbatim on the result so the caller can
/// forward it unchanged — this function never re-encodes what it parses.
pub fn decode(raw_hex: &str) -> Result<DecodedTx, RelayError> {
    let trimmed = raw_hex.strip_prefix("0x").unwrap_or(raw_hex);
    let bytes = hex::decode(trimmed).map_err(|e| RelayError::Decode(format!("invalid hex: {e}")))?;
    if bytes.is_empty() {
        return Err(RelayError::Decode("empty transaction".into()));
    }

    let rlp = Rlp::new(&bytes);
    let (typed_tx, signature) = TypedTransaction::decode_signed(&rlp)
        .map_err(|e| RelayError::Decode(format!("rlp decode failed: {e}")))?;

    let sighash = typed_tx.sighash();
    let sender = signature
        .recover(sighash)
        .map_err(|e| RelayError::Decode(format!("sender recovery failed: {e}")))?;

    let (tx_type, effective_gas_price) = match &typed_tx {
        TypedTransaction::Legacy(tx) => (TxKind::Legacy, tx.gas_price.unwrap_or_default()),
        TypedTransaction::Eip2930(req) => (TxKind::Legacy, req.tx.gas_price.unwrap_or_default()),
        TypedTransaction::Eip1559(tx) => (TxKind::Eip1559, tx.max_fee_per_gas.unwrap_or_default()),
    };

    Ok(DecodedTx {
        sender,
        to: typed_tx.to().and_then(|nv| nv.as_address().copied()),
        value: typed_tx.value().copied().unwrap_or_default(),
        data: typed_tx.data().cloned().unwrap_or_default(),
        gas_limit: typed_tx.gas().copied().unwrap_or_default(),
        effective_gas_price,
        tx_type,
        raw_hex: raw_hex.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::{LocalWallet, Signer};
    use ethers::types::transaction::eip1559::Eip1559TransactionRequest;
    use ethers::types::{Address, U256};

    async fn legacy_signed_hex() -> String {
        let wallet: LocalWallet = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".parse().unwrap();
        let tx = ethers::types::TransactionRequest::new()
            .to(Address::zero())
            .value(U256::zero())
            .gas(100_000u64)
            .gas_price(25_000_000_000u64)
            .nonce(0u64)
            .chain_id(1u64);
        let typed: TypedTransaction = tx.into();
        let sig = wallet.sign_transaction_sync(&typed).unwrap();
        format!("0x{}", hex::encode(typed.rlp_signed(&sig)))
    }

    async fn eip1559_signed_hex() -> String {
        let wallet: LocalWallet = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".parse().unwrap();
        let tx = Eip1559TransactionRequest::new()
            .to(Address::zero())
            .value(U256::zero())
            .gas(100_000u64)
            .max_fee_per_gas(30_000_000_000u64)
            .max_priority_fee_per_gas(1_000_000_000u64)
            .nonce(0u64)
            .chain_id(1u64);
        let typed: TypedTransaction = tx.into();
        let sig = wallet.sign_transaction_sync(&typed).unwrap();
        format!("0x{}", hex::encode(typed.rlp_signed(&sig)))
    }

    #[tokio::test]
    async fn decodes_legacy_and_recovers_sender() {
        let wallet: LocalWallet = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".parse().unwrap();
        let hex_tx = legacy_signed_hex().await;
        let decoded = decode(&hex_tx).unwrap();
        assert_eq!(decoded.tx_type, TxKind::Legacy);
        assert_eq!(decoded.sender, wallet.address());
        assert_eq!(decoded.raw_hex, hex_tx);
    }

    #[tokio::test]
    async fn decodes_eip1559_effective_price_is_max_fee() {
        let hex_tx = eip1559_signed_hex().await;
        let decoded = decode(&hex_tx).unwrap();
        assert_eq!(decoded.tx_type, TxKind::Eip1559);
        assert_eq!(decoded.effective_gas_price, U256::from(30_000_000_000u64));
    }

    #[tokio::test]
    async fn decoding_twice_is_idempotent() {
        let hex_tx = legacy_signed_hex().await;
        let a = decode(&hex_tx).unwrap();
        let b = decode(&hex_tx).unwrap();
        assert_eq!(a.sender, b.sender);
        assert_eq!(a.gas_limit, b.gas_limit);
        assert_eq!(a.effective_gas_price, b.effective_gas_price);
    }

    #[test]
    fn rejects_garbage_hex() {
        assert!(decode("0xnot_hex").is_err());
        assert!(decode("0x").is_err());
    }
}
