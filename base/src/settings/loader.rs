use std::env;

use config::{Config, Environment, File};
use serde::Deserialize;

/// Load a settings object from the config locations.
///
/// Configs are loaded in the following precedence order:
///
/// 1. The file at `config/<RUN_ENV>/relayer.json` (`RUN_ENV` defaults to
///    `default`), if present.
/// 2. Environment variables prefixed `GASRELAY_`, nested keys separated by
///    `_` (e.g. `GASRELAY_GAS_PRICE_MULTIPLIER`).
///
/// Deserialization goes through `serde_path_to_error` so a misconfigured
/// field names its exact path instead of an opaque serde error.
pub(crate) fn load_settings_object<'de, T: Deserialize<'de>>() -> eyre::Result<T> {
    let env = env::var("RUN_ENV").unwrap_or_else(|_| "default".into());

    let config_deserializer = Config::builder()
        .add_source(File::with_name(&format!("./config/{env}/relayer")).required(false))
        .add_source(Environment::with_prefix("GASRELAY").separator("_"))
        .build()?;

    Ok(serde_path_to_error::deserialize(config_deserializer)?)
}
