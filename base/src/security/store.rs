use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use gas_relay_core::{ApiKeyRecord, SecurityConfig, SecuritySettings};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::ip_match::CompiledPatterns;

/// Debounce window absorbing partial writes to the config file (spec §9).
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// On-disk shape of the security config file (spec §6). Deserializes
/// straight into the domain types; the only translation this layer performs
/// is rebuilding the `api_keys` index to contain only enabled records.
#[derive(Debug, Deserialize, Serialize)]
struct SecurityConfigFile {
    #[serde(rename = "apiKeys")]
    api_keys: Vec<ApiKeyRecord>,
    #[serde(rename = "globalIpWhitelist", default)]
    global_ip_whitelist: Vec<String>,
    #[serde(default)]
    settings: SecuritySettingsFile,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct SecuritySettingsFile {
    require_api_key: bool,
    enforce_ip_whitelist: bool,
    log_failed_attempts: bool,
    rate_limit_enabled: bool,
    rate_limit_requests_per_minute: u32,
}

impl Default for SecuritySettingsFile {
    fn default() -> Self {
        let d = SecuritySettings::default();
        Self {
            require_api_key: d.require_api_key,
            enforce_ip_whitelist: d.enforce_ip_whitelist,
            log_failed_attempts: d.log_failed_attempts,
            rate_limit_enabled: d.rate_limit_enabled,
            rate_limit_requests_per_minute: d.rate_limit_requests_per_minute,
        }
    }
}

impl From<SecuritySettingsFile> for SecuritySettings {
    fn from(f: SecuritySettingsFile) -> Self {
        Self {
            require_api_key: f.require_api_key,
            enforce_ip_whitelist: f.enforce_ip_whitelist,
            log_failed_attempts: f.log_failed_attempts,
            rate_limit_enabled: f.rate_limit_enabled,
            rate_limit_requests_per_minute: f.rate_limit_requests_per_minute,
        }
    }
}

impl SecurityConfigFile {
    fn default_with_example_key() -> Self {
        let example_key: ApiKeyRecord = serde_json::from_value(serde_json::json!({
            "key": "example-api-key-replace-me",
            "name": "example",
            "enabled": true,
            "allowedIps": [],
            "description": "Auto-generated default key. Replace before production use."
        }))
        .expect("example key matches ApiKeyRecord wire shape");

        Self {
            api_keys: vec![example_key],
            global_ip_whitelist: vec!["127.0.0.1".into(), "::1".into()],
            settings: SecuritySettingsFile::default(),
        }
    }

    fn into_snapshot(self) -> SecurityConfig {
        let api_keys = self
            .api_keys
            .into_iter()
            .filter(|rec| rec.enabled)
            .map(|rec| (rec.key.clone(), rec))
            .collect::<HashMap<_, _>>();
        SecurityConfig {
            api_keys,
            global_ip_whitelist: self.global_ip_whitelist,
            settings: self.settings.into(),
            loaded_at: Instant::now(),
        }
    }
}

/// A `SecurityConfig` plus every IP allow-list pattern it contains,
/// pre-compiled (spec §4.F). Published as a single unit so a reader never
/// observes a `SecurityConfig` whose patterns haven't been compiled yet, or
/// a pattern cache built against a since-replaced config.
pub struct SecuritySnapshot {
    pub config: SecurityConfig,
    pub ip_patterns: CompiledPatterns,
}

impl SecuritySnapshot {
    fn build(config: SecurityConfig) -> Self {
        let ip_patterns = CompiledPatterns::build(&config);
        Self { config, ip_patterns }
    }
}

/// Hot-reloadable security configuration (spec §4.F).
///
/// The current snapshot is published through an `ArcSwap`: readers `load()`
/// it once per request, the file-watcher task swaps it wholesale on change.
/// No lock is ever held across request handling, so a snapshot in use by an
/// in-flight request is never mutated out from under it (invariant: no torn
/// reads, spec §5/§8 hot-reload atomicity).
pub struct SecurityStore {
    path: PathBuf,
    current: ArcSwap<SecuritySnapshot>,
}

impl SecurityStore {
    /// Load (creating a default file if missing) and start watching.
    pub async fn load(path: impl Into<PathBuf>) -> eyre::Result<Arc<Self>> {
        let path = path.into();
        let file = Self::read_or_init(&path).await?;
        let store = Arc::new(Self {
            path: path.clone(),
            current: ArcSwap::from_pointee(SecuritySnapshot::build(file.into_snapshot())),
        });
        store.clone().spawn_watcher()?;
        Ok(store)
    }

    async fn read_or_init(path: &Path) -> eyre::Result<SecurityConfigFile> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(serde_path_to_error::deserialize(
                &mut serde_json::Deserializer::from_str(&contents),
            )?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let default_config = SecurityConfigFile::default_with_example_key();
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let pretty = serde_json::to_string_pretty(&default_config)?;
                tokio::fs::write(path, pretty).await?;
                tracing::warn!(path = %path.display(), "security config missing, wrote default file");
                Ok(default_config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current snapshot. Cheap: an `Arc` clone of the published config and
    /// its precompiled IP patterns.
    pub fn snapshot(&self) -> Arc<SecuritySnapshot> {
        self.current.load_full()
    }

    fn spawn_watcher(self: Arc<Self>) -> eyre::Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watch_path = self.path.clone();
        let parent = watch_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res| {
                let _ = tx.send(res);
            })?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            // Keep the watcher alive for the task's lifetime.
            let _watcher = watcher;
            let mut pending = false;
            loop {
                let event = match tokio::time::timeout(Duration::from_secs(3600), rx.recv()).await {
                    Ok(Some(Ok(event))) => Some(event),
                    Ok(Some(Err(e))) => {
                        tracing::warn!(error = %e, "security config watcher error");
                        None
                    }
                    Ok(None) => break,
                    Err(_) => None,
                };

                let touches_target = event
                    .map(|e| matches!(e.kind, EventKind::Modify(_) | EventKind::Create(_)) && e.paths.iter().any(|p| p == &watch_path))
                    .unwrap_or(false);

                if touches_target {
                    pending = true;
                }

                if pending {
                    tokio::time::sleep(RELOAD_DEBOUNCE).await;
                    pending = false;
                    match Self::read_or_init(&watch_path).await {
                        Ok(file) => {
                            self.current
                                .store(Arc::new(SecuritySnapshot::build(file.into_snapshot())));
                            tracing::info!(path = %watch_path.display(), "reloaded security config");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to reload security config, keeping previous snapshot");
                        }
                    }
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_gets_default_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security-config.json");
        let store = SecurityStore::load(&path).await.unwrap();
        assert!(path.exists());
        let snap = store.snapshot();
        assert_eq!(snap.config.api_keys.len(), 1);
        assert!(snap.config.global_ip_whitelist.contains(&"127.0.0.1".to_string()));
    }

    #[tokio::test]
    async fn disabled_keys_are_not_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security-config.json");
        let json = serde_json::json!({
            "apiKeys": [
                {"key": "a", "name": "a", "enabled": true, "allowedIps": []},
                {"key": "b", "name": "b", "enabled": false, "allowedIps": []}
            ],
            "globalIpWhitelist": [],
            "settings": {
                "requireApiKey": true, "enforceIpWhitelist": true,
                "logFailedAttempts": true, "rateLimitEnabled": false,
                "rateLimitRequestsPerMinute": 60
            }
        });
        tokio::fs::write(&path, serde_json::to_vec(&json).unwrap()).await.unwrap();
        let store = SecurityStore::load(&path).await.unwrap();
        let snap = store.snapshot();
        assert!(snap.config.lookup("a").is_some());
        assert!(snap.config.lookup("b").is_none());
    }
}
