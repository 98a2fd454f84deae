use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, U256};

use chainsync_core::rpc;
use chainsync_core::{AccountPort, PortError, ProviderPort};

/// Account layer: which account the wallet exposes and the balances
/// fetched for it.
#[derive(Debug, Default)]
pub struct AccountAdapter {
    state: Mutex<AccountState>,
}

#[derive(Debug, Default)]
struct AccountState {
    active: Option<Address>,
    balances: HashMap<Address, U256>,
}

impl AccountAdapter {
    /// Prompts the wallet for access (`eth_requestAccounts`).
    pub async fn connect<P: ProviderPort>(&self, provider: &P) -> Result<Option<Address>, PortError> {
        let accounts = rpc::request_accounts(provider).await?;
        self.observe_accounts(&accounts);
        Ok(self.active_account())
    }

    /// Picks up an existing authorization without prompting (`eth_accounts`).
    pub async fn restore<P: ProviderPort>(&self, provider: &P) -> Result<Option<Address>, PortError> {
        let accounts = rpc::accounts(provider).await?;
        self.observe_accounts(&accounts);
        Ok(self.active_account())
    }

    /// Forgets the account locally. EIP-1193 has no call that revokes access.
    pub fn disconnect(&self) {
        *self.lock() = AccountState::default();
    }

    pub fn record_balance(&self, address: Address, balance: U256) {
        self.lock().balances.insert(address, balance);
    }

    /// Fetches the active account's balance and caches it.
    pub async fn refresh_balance<P: ProviderPort>(
        &self,
        provider: &P,
    ) -> Result<Option<(Address, U256)>, PortError> {
        let Some(address) = self.active_account() else {
            return Ok(None);
        };
        let balance = rpc::balance(provider, address).await?;
        if self.active_account() != Some(address) {
            tracing::debug!(%address, "account changed during balance refresh");
            return Ok(None);
        }
        self.record_balance(address, balance);
        Ok(Some((address, balance)))
    }

    fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccountPort for AccountAdapter {
    fn active_account(&self) -> Option<Address> {
        self.lock().active
    }

    fn known_balance(&self, address: Address) -> Option<U256> {
        let g = self.lock();
        if g.active != Some(address) {
            return None;
        }
        g.balances.get(&address).copied()
    }

    fn observe_accounts(&self, accounts: &[Address]) {
        let mut g = self.lock();
        let next = accounts.first().copied();
        if g.active != next {
            g.balances.clear();
        }
        g.active = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::from(bytes)
    }

    #[test]
    fn first_account_becomes_active() {
        let adapter = AccountAdapter::default();
        adapter.observe_accounts(&[addr(1), addr(2)]);
        assert_eq!(adapter.active_account(), Some(addr(1)));
        adapter.observe_accounts(&[]);
        assert_eq!(adapter.active_account(), None);
    }

    #[test]
    fn balance_is_only_known_for_the_active_account() {
        let adapter = AccountAdapter::default();
        adapter.observe_accounts(&[addr(1)]);
        adapter.record_balance(addr(1), U256::from(5u64));
        assert_eq!(adapter.known_balance(addr(1)), Some(U256::from(5u64)));
        assert_eq!(adapter.known_balance(addr(2)), None);

        adapter.observe_accounts(&[addr(2)]);
        assert_eq!(adapter.known_balance(addr(2)), None);
        adapter.observe_accounts(&[addr(1)]);
        assert_eq!(adapter.known_balance(addr(1)), None);
    }

    #[test]
    fn disconnect_clears_everything() {
        let adapter = AccountAdapter::default();
        adapter.observe_accounts(&[addr(1)]);
        adapter.record_balance(addr(1), U256::from(1u64));
        adapter.disconnect();
        assert_eq!(adapter.active_account(), None);
        assert_eq!(adapter.known_balance(addr(1)), None);
    }
}
