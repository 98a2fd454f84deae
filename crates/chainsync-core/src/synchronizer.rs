//! Keeps the local wallet snapshot in step with the external wallet.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use alloy::primitives::Address;

use crate::balance;
use crate::domain::{
    ProviderEvent, ProviderEventKind, SyncSignal, WalletSnapshot, NATIVE_CURRENCY_DECIMALS,
};
use crate::ports::{AccountPort, PortError, ProviderPort};
use crate::rpc;
use crate::subscription::Subscription;

/// Read-only handle on the shared snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReader {
    inner: Arc<RwLock<WalletSnapshot>>,
}

impl SnapshotReader {
    pub fn current(&self) -> WalletSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .connected
    }

    fn replace(&self, next: WalletSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

pub struct WalletSynchronizer<P: ProviderPort, A: AccountPort> {
    provider: Option<Arc<P>>,
    accounts: Arc<A>,
    snapshot: SnapshotReader,
    subscriptions: Mutex<Option<Vec<Subscription<P>>>>,
}

impl<P: ProviderPort, A: AccountPort> WalletSynchronizer<P, A> {
    pub fn new(provider: Option<Arc<P>>, accounts: Arc<A>) -> Self {
        Self {
            provider,
            accounts,
            snapshot: SnapshotReader::default(),
            subscriptions: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> Option<&Arc<P>> {
        self.provider.as_ref()
    }

    pub fn reader(&self) -> SnapshotReader {
        self.snapshot.clone()
    }

    pub fn current_snapshot(&self) -> WalletSnapshot {
        self.snapshot.current()
    }

    pub fn is_mounted(&self) -> bool {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Registers provider listeners and loads the initial snapshot.
    pub async fn mount(&self) -> WalletSnapshot {
        let subscriptions = match &self.provider {
            Some(provider) => {
                let mut subs = Vec::with_capacity(2);
                for kind in [ProviderEventKind::AccountsChanged, ProviderEventKind::ChainChanged] {
                    match Subscription::acquire(provider, kind) {
                        Ok(sub) => subs.push(sub),
                        Err(e) => tracing::warn!(
                            event = kind.event_name(),
                            error = %e,
                            "provider listener registration failed"
                        ),
                    }
                }
                subs
            }
            None => Vec::new(),
        };
        // Remounting releases the previous listeners.
        *self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscriptions);
        self.rebuild().await
    }

    /// Releases provider listeners and forgets the snapshot.
    pub fn unmount(&self) {
        let released = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(released);
        self.snapshot.replace(WalletSnapshot::disconnected());
    }

    /// Re-reads account and balance and replaces the snapshot.
    pub async fn rebuild(&self) -> WalletSnapshot {
        let address = self.accounts.active_account();
        let next = match (&self.provider, address) {
            (Some(provider), Some(address)) => {
                match self.load_connected(provider.as_ref(), address).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        tracing::error!(%address, error = %e, "wallet initialization failed");
                        WalletSnapshot::disconnected()
                    }
                }
            }
            (_, None) => WalletSnapshot::disconnected(),
            (None, Some(_)) => return self.snapshot.current(),
        };
        self.snapshot.replace(next.clone());
        next
    }

    async fn load_connected(
        &self,
        provider: &P,
        address: Address,
    ) -> Result<WalletSnapshot, PortError> {
        let raw = match self.accounts.known_balance(address) {
            Some(raw) => raw,
            None => rpc::balance(provider, address).await?,
        };
        let balance = balance::format_units(raw, NATIVE_CURRENCY_DECIMALS)?;
        Ok(WalletSnapshot::connected(address, balance))
    }

    /// Applies a refreshed smallest-unit balance from the account layer.
    ///
    /// Returns false when nothing changed; a value that fails to format
    /// leaves the previous balance in place.
    pub fn apply_balance(&self, address: Address, raw: &str) -> bool {
        let current = self.snapshot.current();
        if !current.connected || current.address != Some(address) {
            return false;
        }
        if self.accounts.active_account() != Some(address) {
            return false;
        }
        match balance::format_ether(raw) {
            Ok(formatted) => {
                self.snapshot.replace(current.with_balance(formatted));
                true
            }
            Err(e) => {
                tracing::warn!(%address, error = %e, "error formatting balance");
                false
            }
        }
    }

    /// Every event delivered to the live listeners, in provider order.
    pub fn drain_events(&self) -> Vec<ProviderEvent> {
        let mut guard = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut events: Vec<ProviderEvent> = guard
            .iter_mut()
            .flatten()
            .flat_map(Subscription::drain)
            .collect();
        events.sort_by_key(ProviderEvent::sequence);
        events
    }

    pub async fn handle_event(&self, event: ProviderEvent) -> SyncSignal {
        match event {
            ProviderEvent::AccountsChanged { accounts, sequence } => {
                tracing::debug!(sequence, count = accounts.len(), "accounts changed");
                self.accounts.observe_accounts(&accounts);
                self.rebuild().await;
                SyncSignal::Continue
            }
            ProviderEvent::ChainChanged { chain_id, sequence } => {
                tracing::info!(sequence, chain_id, "chain changed, reload required");
                SyncSignal::ReloadRequired { chain_id }
            }
        }
    }

    /// Handles pending events; stops at the first chain change.
    pub async fn process_events(&self) -> SyncSignal {
        for event in self.drain_events() {
            let signal = self.handle_event(event).await;
            if signal != SyncSignal::Continue {
                return signal;
            }
        }
        SyncSignal::Continue
    }
}
