//! EVM-concrete adapters: a `ChainClient`/`GasPayerContract` pair backed by
//! `ethers`, and the signed-transaction decoder they share.

#![forbid(unsafe_code)]

pub mod chain_client;
pub mod decoder;
pub mod gas_payer;

pub use chain_client::EthereumChainClient;
pub use decoder::decode;
pub use gas_payer::EthereumGasPayerContract;
