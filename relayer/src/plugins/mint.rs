use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::U256;
use gas_relay_base::{GasOperation, GasPlugin, RelayEngine};

/// Demonstration plugin exercising the Plugin Registry contract: a single
/// `mint` operation with a fixed gas budget, routed under `/mint`.
pub struct MintPlugin {
    operations: Vec<GasOperation>,
}

impl MintPlugin {
    pub fn new() -> Self {
        Self {
            operations: vec![GasOperation {
                op_name: "mint".into(),
                function_tag: "mint(address,uint256)".into(),
                gas_limit: U256::from(130_000u64),
            }],
        }
    }
}

impl Default for MintPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GasPlugin for MintPlugin {
    fn name(&self) -> &str {
        "mint"
    }

    fn api_prefix(&self) -> &str {
        "/mint"
    }

    fn openapi_tags(&self) -> &[&str] {
        &["minting"]
    }

    fn gas_operations(&self) -> &[GasOperation] {
        &self.operations
    }

    async fn initialize(&self, _relay_engine: Arc<RelayEngine>) -> eyre::Result<()> {
        Ok(())
    }
}
