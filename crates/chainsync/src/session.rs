//! Bridge between the egui shell and the wallet synchronization crates.
//! The shell talks to the wallet only through this type.

use std::sync::Arc;
use std::time::Duration;

use chainsync_adapters::{AccountAdapter, ChainSyncConfig, Eip1193Adapter};
use chainsync_core::{
    ChainDescriptor, ChainRegistry, ChainSelector, PortError, SwitchOutcome, SyncSignal,
    WalletSnapshot, WalletSynchronizer,
};

/// One wallet session. A chain change discards it and builds a new one.
pub struct WalletSession {
    provider: Arc<Eip1193Adapter>,
    accounts: Arc<AccountAdapter>,
    sync: WalletSynchronizer<Eip1193Adapter, AccountAdapter>,
    selector: ChainSelector<Eip1193Adapter>,
    config: ChainSyncConfig,
}

impl WalletSession {
    /// Builds a session around `adapter`. The adapter is shared host state:
    /// sessions come and go, the wallet behind it stays.
    pub fn with_provider(adapter: Eip1193Adapter, config: ChainSyncConfig) -> Self {
        if let Some(reason) = adapter.disabled_reason() {
            tracing::warn!(reason, "wallet provider unavailable");
        }
        let provider = Arc::new(adapter);
        let available = provider.is_available().then(|| Arc::clone(&provider));
        let accounts = Arc::new(AccountAdapter::default());
        let sync = WalletSynchronizer::new(available.clone(), Arc::clone(&accounts));
        let selector = ChainSelector::new(available, sync.reader(), ChainRegistry::builtin())
            .with_compact_breakpoint(config.compact_breakpoint_px);
        tracing::info!(provider = provider.mode_label(), "wallet session created");
        Self {
            provider,
            accounts,
            sync,
            selector,
            config,
        }
    }

    pub fn provider_label(&self) -> &'static str {
        self.provider.mode_label()
    }

    pub fn provider_available(&self) -> bool {
        self.sync.provider().is_some()
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        self.sync.current_snapshot()
    }

    pub fn selector(&self) -> &ChainSelector<Eip1193Adapter> {
        &self.selector
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.event_poll_interval_ms)
    }

    /// Picks up an existing authorization, registers listeners and reads
    /// the active chain.
    pub async fn mount(&self, viewport_width: f32) -> WalletSnapshot {
        if let Some(provider) = self.sync.provider() {
            if let Err(e) = self.accounts.restore(provider.as_ref()).await {
                tracing::warn!(error = %e, "could not restore wallet accounts");
            }
        }
        let snapshot = self.sync.mount().await;
        self.selector.mount(viewport_width);
        self.selector.refresh_active_chain().await;
        snapshot
    }

    pub fn unmount(&self) {
        self.selector.unmount();
        self.sync.unmount();
    }

    pub async fn connect(&self) -> Result<WalletSnapshot, PortError> {
        let provider = self.sync.provider().ok_or_else(|| {
            PortError::Policy(
                self.provider
                    .disabled_reason()
                    .unwrap_or("wallet provider unavailable")
                    .to_owned(),
            )
        })?;
        self.accounts.connect(provider.as_ref()).await?;
        let snapshot = self.sync.rebuild().await;
        self.selector.refresh_active_chain().await;
        Ok(snapshot)
    }

    pub async fn disconnect(&self) -> WalletSnapshot {
        self.accounts.disconnect();
        self.sync.rebuild().await
    }

    pub async fn select_chain(&self, chain: &ChainDescriptor) -> SwitchOutcome {
        self.selector.select_chain(chain).await
    }

    /// Collects provider events and applies them; optionally refreshes the
    /// balance afterwards.
    pub async fn pump(&self, refresh_balance: bool) -> SyncSignal {
        let Some(provider) = self.sync.provider() else {
            return SyncSignal::Continue;
        };
        #[cfg(not(target_arch = "wasm32"))]
        if let Err(e) = provider.poll_events().await {
            tracing::warn!(error = %e, "provider poll failed");
        }
        let was_connected = self.sync.current_snapshot().connected;
        let signal = self.sync.process_events().await;
        if signal != SyncSignal::Continue {
            return signal;
        }
        // Authorizing from the wallet side connects without going through
        // `connect`, so the active chain has not been read yet.
        if !was_connected && self.sync.current_snapshot().connected {
            self.selector.refresh_active_chain().await;
        }
        if !refresh_balance {
            return signal;
        }
        match self.accounts.refresh_balance(provider.as_ref()).await {
            Ok(Some((address, balance))) => {
                self.sync.apply_balance(address, &balance.to_string());
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "balance refresh failed"),
        }
        signal
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use chainsync_adapters::RuntimeProfile;
    use chainsync_core::{rpc, supported_chains};

    use super::*;

    fn deterministic_session() -> WalletSession {
        WalletSession::with_provider(Eip1193Adapter::deterministic(), ChainSyncConfig::default())
    }

    #[tokio::test]
    async fn connect_then_disconnect() {
        let session = deterministic_session();
        assert!(!session.mount(1024.0).await.connected);

        let snapshot = session.connect().await.expect("connect");
        assert!(snapshot.connected);
        assert_eq!(snapshot.balance.as_deref(), Some("1.5"));
        assert!(session.selector().view().is_some());

        assert!(!session.disconnect().await.connected);
        assert!(session.selector().view().is_none());
    }

    #[tokio::test]
    async fn chain_switch_surfaces_as_reload() {
        let session = deterministic_session();
        session.mount(1024.0).await;
        session.connect().await.expect("connect");
        assert_eq!(session.pump(false).await, SyncSignal::Continue);

        let outcome = session.select_chain(&supported_chains()[2]).await;
        assert_eq!(outcome, SwitchOutcome::Added);
        assert_eq!(
            session.pump(false).await,
            SyncSignal::ReloadRequired { chain_id: 656476 }
        );
    }

    #[tokio::test]
    async fn reload_keeps_wallet_state_of_shared_provider() {
        let adapter = Eip1193Adapter::deterministic();
        let first = WalletSession::with_provider(adapter.clone(), ChainSyncConfig::default());
        first.mount(1024.0).await;
        let address = first
            .connect()
            .await
            .expect("connect")
            .address
            .expect("address");
        assert_eq!(first.pump(false).await, SyncSignal::Continue);

        let educhain = &supported_chains()[2];
        assert_eq!(first.select_chain(educhain).await, SwitchOutcome::Added);
        assert_eq!(
            first.pump(false).await,
            SyncSignal::ReloadRequired { chain_id: educhain.id }
        );
        first.unmount();

        let second = WalletSession::with_provider(adapter, ChainSyncConfig::default());
        let snapshot = second.mount(1024.0).await;
        assert!(snapshot.connected);
        assert_eq!(snapshot.address, Some(address));
        assert_eq!(second.selector().ui_state().active_chain_id, Some(educhain.id));
        let view = second.selector().view().expect("connected view");
        assert_eq!(view.current.id, educhain.id);
        assert_eq!(second.pump(false).await, SyncSignal::Continue);
    }

    #[tokio::test]
    async fn wallet_side_authorization_reads_active_chain() {
        let adapter = Eip1193Adapter::deterministic();
        let telos = &supported_chains()[4];
        adapter
            .debug_inject_chain_changed(telos.id)
            .expect("move wallet to telos");
        let session = WalletSession::with_provider(adapter.clone(), ChainSyncConfig::default());
        assert!(!session.mount(1024.0).await.connected);
        assert_eq!(session.selector().ui_state().active_chain_id, None);

        rpc::request_accounts(&adapter)
            .await
            .expect("authorize in wallet");
        assert_eq!(session.pump(false).await, SyncSignal::Continue);

        assert!(session.snapshot().connected);
        let view = session.selector().view().expect("connected view");
        assert_eq!(view.current.id, telos.id);
        let active: Vec<u64> = view
            .entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.chain.id)
            .collect();
        assert_eq!(active, vec![telos.id]);
    }

    #[tokio::test]
    async fn pump_refreshes_balance() {
        let session = deterministic_session();
        session.mount(1024.0).await;
        let snapshot = session.connect().await.expect("connect");
        let address = snapshot.address.expect("address");
        assert_eq!(session.pump(false).await, SyncSignal::Continue);
        session
            .provider
            .debug_set_balance(address, U256::from(3_000_000_000_000_000_000u128))
            .expect("set balance");

        assert_eq!(session.pump(false).await, SyncSignal::Continue);
        assert_eq!(session.snapshot().balance.as_deref(), Some("1.5"));
        session.pump(true).await;
        assert_eq!(session.snapshot().balance.as_deref(), Some("3.0"));
    }

    #[tokio::test]
    async fn disabled_provider_leaves_session_inert() {
        let config = ChainSyncConfig {
            runtime_profile: RuntimeProfile::Production,
            ..ChainSyncConfig::default()
        };
        let session =
            WalletSession::with_provider(Eip1193Adapter::with_config(config.clone()), config);
        assert!(!session.provider_available());
        assert!(!session.mount(1024.0).await.connected);
        assert!(matches!(
            session.connect().await,
            Err(PortError::Policy(_))
        ));
        assert_eq!(session.pump(true).await, SyncSignal::Continue);
    }
}
