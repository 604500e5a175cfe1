use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::U256;
use gas_relay_core::OperationBudget;

use crate::relay_engine::RelayEngine;

/// A business-specific operation a plugin exposes: its name and the gas
/// budget the Gas Policy should enforce for it (spec §4.H).
#[derive(Debug, Clone)]
pub struct GasOperation {
    pub op_name: String,
    pub function_tag: String,
    pub gas_limit: U256,
}

/// A declared plugin (spec §4.H). `initialize` runs once, in registration
/// order, at startup; any failure there aborts startup.
#[async_trait]
pub trait GasPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn api_prefix(&self) -> &str;
    fn openapi_tags(&self) -> &[&str];
    fn gas_operations(&self) -> &[GasOperation];
    async fn initialize(&self, relay_engine: Arc<RelayEngine>) -> eyre::Result<()>;
}

/// Immutable once built at startup (spec §5): holds every registered plugin
/// and exposes the aggregate operation list for the `/gas-costs` endpoint.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn GasPlugin>>,
}

impl PluginRegistry {
    /// Register and initialize every plugin, in order. Aborts on the first
    /// initialization failure (spec §4.H).
    pub async fn build(
        plugins: Vec<Arc<dyn GasPlugin>>,
        relay_engine: Arc<RelayEngine>,
    ) -> eyre::Result<Self> {
        for plugin in &plugins {
            plugin.initialize(relay_engine.clone()).await?;
        }
        Ok(Self { plugins })
    }

    pub fn active_plugins(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn all_gas_operations(&self) -> Vec<(&str, &GasOperation)> {
        self.plugins
            .iter()
            .flat_map(|p| p.gas_operations().iter().map(move |op| (p.name(), op)))
            .collect()
    }

    pub fn find_operation_budget(&self, operation_name: &str) -> Option<OperationBudget> {
        self.all_gas_operations()
            .into_iter()
            .find(|(_, op)| op.op_name == operation_name)
            .map(|(_, op)| OperationBudget {
                operation_name: op.op_name.clone(),
                gas_limit: op.gas_limit,
                function_tag: op.function_tag.clone(),
            })
    }

    pub fn plugins(&self) -> &[Arc<dyn GasPlugin>] {
        &self.plugins
    }
}
