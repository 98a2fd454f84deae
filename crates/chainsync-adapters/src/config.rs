use std::str::FromStr;

use chainsync_core::DEFAULT_COMPACT_BREAKPOINT;

/// Production refuses to fall back to the in-memory wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

impl RuntimeProfile {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainSyncConfig {
    pub runtime_profile: RuntimeProfile,
    pub eip1193_proxy_url: Option<String>,
    pub provider_timeout_ms: u64,
    pub event_poll_interval_ms: u64,
    pub compact_breakpoint_px: f32,
}

impl Default for ChainSyncConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            eip1193_proxy_url: None,
            provider_timeout_ms: 15_000,
            event_poll_interval_ms: 1_000,
            compact_breakpoint_px: DEFAULT_COMPACT_BREAKPOINT,
        }
    }
}

impl ChainSyncConfig {
    /// Defaults overridden by `CHAINSYNC_*` environment variables.
    ///
    /// Unparseable values are logged and ignored. On wasm32 there is no
    /// process environment, so this is the default config.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("CHAINSYNC_PROFILE") {
            match RuntimeProfile::parse(&raw) {
                Some(profile) => cfg.runtime_profile = profile,
                None => tracing::warn!(value = %raw, "ignoring unknown CHAINSYNC_PROFILE"),
            }
        }
        if let Some(url) = lookup("CHAINSYNC_EIP1193_PROXY_URL") {
            let url = url.trim();
            if !url.is_empty() {
                cfg.eip1193_proxy_url = Some(url.to_owned());
            }
        }
        if let Some(ms) = parse_var(&lookup, "CHAINSYNC_PROVIDER_TIMEOUT_MS") {
            cfg.provider_timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "CHAINSYNC_EVENT_POLL_INTERVAL_MS") {
            cfg.event_poll_interval_ms = ms;
        }
        if let Some(px) = parse_var::<f32>(&lookup, "CHAINSYNC_COMPACT_BREAKPOINT_PX") {
            if px.is_finite() && px > 0.0 {
                cfg.compact_breakpoint_px = px;
            }
        }
        cfg
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
