#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use chainsync_core::{
    AccountPort, ChainRegistry, ChainSelector, PortError, ProviderErrorCode, ProviderEvent,
    ProviderEventKind, ProviderPort, SubscriptionId, WalletSynchronizer,
};

/// Provider double that records requests and replays scripted replies.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    calls: Mutex<Vec<(String, Value)>>,
    replies: Mutex<HashMap<String, VecDeque<Result<Value, PortError>>>>,
    listeners: Mutex<HashMap<SubscriptionId, (ProviderEventKind, UnboundedSender<ProviderEvent>)>>,
    next_id: AtomicU64,
    sequence: AtomicU64,
    yield_before_reply: bool,
}

impl ScriptedProvider {
    /// Suspends once inside every request, so concurrent callers interleave.
    pub fn suspending() -> Self {
        Self {
            yield_before_reply: true,
            ..Self::default()
        }
    }

    pub fn reply(&self, method: &str, result: Result<Value, PortError>) {
        self.replies
            .lock()
            .expect("replies lock")
            .entry(method.to_owned())
            .or_default()
            .push_back(result);
    }

    pub fn reject(&self, method: &str, code: i64) {
        self.reply(
            method,
            Err(PortError::Rpc {
                code,
                message: format!("{method} rejected"),
            }),
        );
    }

    pub fn reject_unrecognized_chain(&self) {
        self.reply(
            "wallet_switchEthereumChain",
            Err(ProviderErrorCode::UnrecognizedChain.into_error("Unrecognized chain ID")),
        );
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().expect("listeners lock").len()
    }

    pub fn emit_accounts_changed(&self, accounts: Vec<Address>) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(ProviderEvent::AccountsChanged { sequence, accounts });
    }

    pub fn emit_chain_changed(&self, chain_id: u64) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(ProviderEvent::ChainChanged { sequence, chain_id });
    }

    fn emit(&self, event: ProviderEvent) {
        let listeners = self.listeners.lock().expect("listeners lock");
        for (kind, sink) in listeners.values() {
            if *kind == event.kind() {
                let _ = sink.send(event.clone());
            }
        }
    }
}

impl ProviderPort for ScriptedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((method.to_owned(), params));
        if self.yield_before_reply {
            tokio::task::yield_now().await;
        }
        self.replies
            .lock()
            .expect("replies lock")
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(Value::Null))
    }

    fn subscribe(
        &self,
        kind: ProviderEventKind,
        sink: UnboundedSender<ProviderEvent>,
    ) -> Result<SubscriptionId, PortError> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .lock()
            .expect("listeners lock")
            .insert(id, (kind, sink));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().expect("listeners lock").remove(&id);
    }
}

/// Account layer double.
#[derive(Debug, Default)]
pub struct StaticAccounts {
    address: Mutex<Option<Address>>,
    balance: Mutex<Option<U256>>,
}

impl StaticAccounts {
    pub fn connected(address: Address, balance: Option<U256>) -> Self {
        Self {
            address: Mutex::new(Some(address)),
            balance: Mutex::new(balance),
        }
    }

    pub fn set_balance(&self, balance: Option<U256>) {
        *self.balance.lock().expect("balance lock") = balance;
    }
}

impl AccountPort for StaticAccounts {
    fn active_account(&self) -> Option<Address> {
        *self.address.lock().expect("address lock")
    }

    fn known_balance(&self, address: Address) -> Option<U256> {
        if self.active_account() != Some(address) {
            return None;
        }
        *self.balance.lock().expect("balance lock")
    }

    fn observe_accounts(&self, accounts: &[Address]) {
        *self.address.lock().expect("address lock") = accounts.first().copied();
        *self.balance.lock().expect("balance lock") = None;
    }
}

pub fn account_a() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("account a")
}

pub fn account_b() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("account b")
}

pub fn one_ether() -> U256 {
    U256::from(1_000_000_000_000_000_000u128)
}

pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub accounts: Arc<StaticAccounts>,
    pub sync: WalletSynchronizer<ScriptedProvider, StaticAccounts>,
    pub selector: ChainSelector<ScriptedProvider>,
}

pub fn harness(provider: ScriptedProvider, accounts: StaticAccounts) -> Harness {
    let provider = Arc::new(provider);
    let accounts = Arc::new(accounts);
    let sync = WalletSynchronizer::new(Some(Arc::clone(&provider)), Arc::clone(&accounts));
    let selector = ChainSelector::new(
        Some(Arc::clone(&provider)),
        sync.reader(),
        ChainRegistry::builtin(),
    );
    Harness {
        provider,
        accounts,
        sync,
        selector,
    }
}

/// Mounted harness with `account_a` connected and one ether known.
pub async fn connected_harness(provider: ScriptedProvider) -> Harness {
    let h = harness(
        provider,
        StaticAccounts::connected(account_a(), Some(one_ether())),
    );
    h.sync.mount().await;
    h.selector.mount(1280.0);
    h
}
