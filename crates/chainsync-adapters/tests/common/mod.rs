#![allow(dead_code)]

use std::sync::Arc;

use alloy::primitives::Address;

use chainsync_adapters::{AccountAdapter, Eip1193Adapter};
use chainsync_core::{ChainRegistry, ChainSelector, WalletSynchronizer};

pub struct Session {
    pub provider: Arc<Eip1193Adapter>,
    pub accounts: Arc<AccountAdapter>,
    pub sync: WalletSynchronizer<Eip1193Adapter, AccountAdapter>,
    pub selector: ChainSelector<Eip1193Adapter>,
}

pub fn session(adapter: Eip1193Adapter) -> Session {
    let provider = Arc::new(adapter);
    let accounts = Arc::new(AccountAdapter::default());
    let sync = WalletSynchronizer::new(Some(Arc::clone(&provider)), Arc::clone(&accounts));
    let selector = ChainSelector::new(
        Some(Arc::clone(&provider)),
        sync.reader(),
        ChainRegistry::builtin(),
    );
    Session {
        provider,
        accounts,
        sync,
        selector,
    }
}

pub fn deterministic_account() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid deterministic account")
}

pub fn other_account() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid other account")
}
