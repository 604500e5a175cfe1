use std::collections::HashMap;
use std::net::{IpAddr, ToSocketAddrs};

use ipnetwork::IpNetwork;
use regex::Regex;

use gas_relay_core::{ApiKeyRecord, SecurityConfig};

/// One allow-list entry, compiled once when the Security Store builds or
/// reloads its snapshot (spec §4.F: "glob with `*` wildcard (compile once
/// per pattern)") rather than on every request.
pub struct CompiledPattern {
    raw: String,
    network: Option<IpNetwork>,
    glob: Option<Regex>,
}

impl CompiledPattern {
    pub fn compile(pattern: &str) -> Self {
        Self {
            network: pattern.parse::<IpNetwork>().ok(),
            glob: if pattern.contains('*') { glob_to_regex(pattern) } else { None },
            raw: pattern.to_string(),
        }
    }

    /// Does `ip` match this already-compiled pattern? Supports all four
    /// pattern kinds from spec §4.F; order of trial is immaterial to the
    /// result. Hostname resolution failures are treated as a non-match,
    /// never an error — IP matching must never block or fail the request on
    /// a soft DNS problem.
    pub fn matches(&self, ip: &str) -> bool {
        if ip == self.raw {
            return true;
        }
        if let Some(network) = &self.network {
            if let Ok(addr) = ip.parse::<IpAddr>() {
                if network.contains(addr) {
                    return true;
                }
            }
        }
        if let Some(re) = &self.glob {
            if re.is_match(ip) {
                return true;
            }
        }
        hostname_matches(ip, &self.raw)
    }
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    Regex::new(&format!("^{escaped}$")).ok()
}

/// Resolve `pattern` as a hostname and compare to `ip`. Reverse-resolving
/// `ip` (the spec's optional half of this branch) is skipped: DNS PTR lookup
/// isn't exposed by `ToSocketAddrs`, and the forward direction already covers
/// the common "allow this hostname" case. Any forward match is treated as
/// success — the permissive resolution this spec calls for (§9 open
/// question).
fn hostname_matches(ip: &str, pattern: &str) -> bool {
    if let Ok(addrs) = (pattern, 0u16).to_socket_addrs() {
        if addrs.map(|a| a.ip().to_string()).any(|resolved| resolved == ip) {
            return true;
        }
    }
    false
}

/// Every allow-list pattern appearing anywhere in a `SecurityConfig`
/// (the global whitelist plus every key's `allowedIps`), compiled exactly
/// once per snapshot build/reload and keyed by the raw pattern string so
/// `is_allowed` never recompiles a glob on the request path.
pub struct CompiledPatterns(HashMap<String, CompiledPattern>);

impl CompiledPatterns {
    pub fn build(config: &SecurityConfig) -> Self {
        let mut compiled = HashMap::new();
        for pattern in &config.global_ip_whitelist {
            compiled
                .entry(pattern.clone())
                .or_insert_with(|| CompiledPattern::compile(pattern));
        }
        for record in config.api_keys.values() {
            for pattern in &record.allowed_ips {
                compiled
                    .entry(pattern.clone())
                    .or_insert_with(|| CompiledPattern::compile(pattern));
            }
        }
        Self(compiled)
    }

    fn matches(&self, ip: &str, pattern: &str) -> bool {
        match self.0.get(pattern) {
            Some(compiled) => compiled.matches(ip),
            None => CompiledPattern::compile(pattern).matches(ip),
        }
    }
}

/// `is_allowed(ip, record?)` per spec §4.F: true when the IP is in the
/// global whitelist, the record declares no restriction, or the IP matches
/// one of the record's entries. `compiled` supplies the precompiled pattern
/// for every string in `config`; it must have been built from the same
/// `config` snapshot.
pub fn is_allowed(
    compiled: &CompiledPatterns,
    config: &SecurityConfig,
    ip: &str,
    record: Option<&ApiKeyRecord>,
) -> bool {
    if config
        .global_ip_whitelist
        .iter()
        .any(|pattern| compiled.matches(ip, pattern))
    {
        return true;
    }
    match record {
        None => false,
        Some(rec) if rec.allowed_ips.is_empty() => true,
        Some(rec) => rec.allowed_ips.iter().any(|pattern| compiled.matches(ip, pattern)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_matches(ip: &str, pattern: &str) -> bool {
        CompiledPattern::compile(pattern).matches(ip)
    }

    #[test]
    fn exact_match() {
        assert!(pattern_matches("10.0.0.1", "10.0.0.1"));
        assert!(!pattern_matches("10.0.0.1", "10.0.0.2"));
    }

    #[test]
    fn cidr_match() {
        assert!(pattern_matches("10.0.0.5", "10.0.0.0/24"));
        assert!(!pattern_matches("10.0.1.5", "10.0.0.0/24"));
    }

    #[test]
    fn glob_match() {
        assert!(pattern_matches("10.0.0.5", "10.0.0.*"));
        assert!(!pattern_matches("10.0.1.5", "10.0.0.*"));
    }

    #[test]
    fn match_is_deterministic() {
        for _ in 0..5 {
            assert!(pattern_matches("10.0.0.5", "10.0.0.0/24"));
        }
    }

    #[test]
    fn compiled_patterns_reused_across_matches() {
        let mut config = SecurityConfig {
            api_keys: HashMap::new(),
            global_ip_whitelist: vec!["10.0.0.*".to_string()],
            settings: gas_relay_core::SecuritySettings::default(),
            loaded_at: std::time::Instant::now(),
        };
        config.api_keys.insert(
            "k".into(),
            ApiKeyRecord {
                key: "k".into(),
                name: "k".into(),
                enabled: true,
                allowed_ips: vec!["192.168.0.0/24".to_string()],
                wallet: None,
                description: None,
            },
        );
        let compiled = CompiledPatterns::build(&config);
        assert!(is_allowed(&compiled, &config, "10.0.0.5", None));
        assert!(is_allowed(
            &compiled,
            &config,
            "192.168.0.9",
            config.api_keys.get("k")
        ));
        assert!(!is_allowed(
            &compiled,
            &config,
            "172.16.0.1",
            config.api_keys.get("k")
        ));
    }
}
